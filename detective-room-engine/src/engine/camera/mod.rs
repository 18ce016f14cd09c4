//! Room camera: drag free-look, damped move-to-target and scroll zoom.
//!
//! Free-look and the mover share one [`orientation::OrientationTarget`]; the
//! controller systems are chained so the writer always runs before the
//! motion system reads the target in the same frame.

/// Bevy plugin and systems driving the room camera from input and move requests.
pub mod controller;

/// Drag-to-look yaw/pitch accumulation with pitch clamping.
pub mod free_look;

/// Damped move-to-target animator with exactly-once arrival detection.
pub mod move_to;

/// Shared orientation target and damping/look-at helpers.
pub mod orientation;

/// Scroll-wheel zoom by field of view or forward dolly.
pub mod zoom;
