//! Scene construction from the loaded room config.

/// Prop spawning, main camera, id camera and room lighting.
pub mod room;
