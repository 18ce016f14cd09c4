//! Rendering: outlines, pixelation and the lens reveal material.
//!
//! Each outlined view owns an id camera drawing flat per-object ids into an
//! off-screen buffer; a fullscreen composite pass after tonemapping draws
//! edges from that buffer and the view's normal prepass.

/// Off-screen id buffer, id cameras and per-mesh id proxies.
pub mod id_pass;

/// Reveal material for hidden clues, drawn only inside the magnifier lens.
pub mod lens_material;

/// CPU reference of the edge test and the outline colour registry.
pub mod outline;

/// Fullscreen outline composite node after tonemapping.
///
/// Samples the view's normal prepass and its id buffer to draw coloured edges.
pub mod outline_post_processing;

/// Fullscreen pixelation node run after the outline composite.
pub mod pixelate_post_processing;
