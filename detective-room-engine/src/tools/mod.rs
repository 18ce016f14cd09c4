//! Room interaction: picking, the magnifier, inspection and puzzles.
//!
//! Every left press goes through [`click::ClickTracker`]; a press that
//! travels further than the drag threshold is a look drag and never counts as
//! a click. Consumers run in a fixed order and the first one to claim the
//! click wins:
//!
//! ```text
//! track_pointer
//!   └─> magnifier_input     pick up / put down the magnifier
//!       └─> inspect_on_click  open an inspection or toggle a container
//!           └─> answer_keyboard_system / handle_panel_buttons
//! ```
//!
//! While an inspection is open the room camera ignores drag and scroll, the
//! room is pixelated and drag rotates the inspected proxy instead.

/// Typing, submitting and pinning puzzle answers from the keyboard.
pub mod answer_input;

/// Click versus drag classification of left presses.
pub mod click;

/// Drawer and box lid animation driven by the container state.
pub mod container;

/// Inspection overlay: framed images and outlined proxies over the pixelated room.
pub mod inspect;

/// Plugin scheduling the interaction systems in claim order.
pub mod interaction;

/// Magnifier pickup, held pose and the published lens mask.
pub mod magnifier;

/// bevy_ui panel, case board and onboarding hint.
pub mod overlay;

/// Puzzle availability, answers, pins and container state.
///
/// Answers are normalised before comparison; regex answers are compiled once at load.
pub mod puzzle;

/// Cursor rays and oriented box picking.
pub mod ray;
