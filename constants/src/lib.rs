//! Shared tunables for the detective room engine.
//!
//! Kept in a separate crate so shaders, tools and tests agree on the same
//! thresholds without pulling in the engine.

pub mod camera;
pub mod interaction;
pub mod render_settings;
pub mod room;
pub mod texture;
