//! Runtime diagnostics and quality control.
//!
//! Frame time sampling for the perf snapshot, plus the quality tier that
//! debug hooks and RPC can switch at runtime.

/// Rolling frame time sampler and the published perf snapshot.
///
/// Sends `perf_update` notifications to the page and updates the native FPS overlay.
pub mod perf;

/// Render quality tiers and the queued tune commands that switch them.
pub mod quality;
