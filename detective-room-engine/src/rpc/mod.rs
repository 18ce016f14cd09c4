//! Page bridge for the embedded room: JSON-RPC 2.0 over `postMessage`, plus the
//! `window.__TT_*__` probes read by automated perf runs.
//!
//! Incoming strings are queued by a JS `message` listener and parsed inside the
//! schedule. Requests carrying an `id` get exactly one response; messages
//! without one are treated as notifications and answered with nothing.
//! Messages that are not valid JSON-RPC are answered with `-32700` or `-32600`.
//!
//! | Method | Params | Result |
//! |---|---|---|
//! | `get_perf` | none | perf snapshot (`avgFps`, `maxFrameTime`, `drawCalls`, `geometries`, `textures`, `sampleCount`) |
//! | `get_texture_loading` | none | `{ pending, inFlight, queued }` |
//! | `set_quality` | `{ level: "low" \| "medium" \| "high" \| 0 \| 1 \| 2 }` | `{ success, quality, previous }` |
//! | `enable_perf_mode` | none | `{ success }` |
//! | `get_game_state` | none | `{ puzzles: [{ id, title, status }], containers: { id: status } }` |
//! | `submit_answer` | `{ puzzle, answer }` | `{ puzzle, outcome: "solved" \| "already_solved" \| "incorrect" }` |
//! | `pin_puzzle` | `{ puzzle }` | `{ puzzle, outcome: "pinned" \| "already_pinned" \| "unavailable" }` |
//!
//! Unknown puzzle ids and malformed params are `-32602`.
//!
//! Notifications pushed to the page: `perf_update` every snapshot refresh,
//! `puzzle_solved` with `{ puzzle, answer }`, and `inspect_changed` with the
//! open inspection summary (or `null` on close).
//!
//! Quality changes from either side only enqueue a `TuneCommand`; the
//! schedule applies them on the next frame.

/// Global `window.__TT_*__` probes (web) and function-key tuning (native).
pub mod debug_hooks;

/// JSON-RPC 2.0 request handling and page notifications.
pub mod web_rpc;
