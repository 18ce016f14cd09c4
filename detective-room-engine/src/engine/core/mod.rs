//! Core application setup and state management.
//!
//! Handles application lifecycle, window configuration, state transitions,
//! and plugin initialisation for both native and WASM targets.

/// Application setup and plugin configuration for the Bevy engine.
///
/// Creates the main app with the outline and pixelate passes, room loading
/// and the interaction plugins.
pub mod app_setup;

/// Application state machine and the loading to running transition.
pub mod app_state;

/// One-time onboarding hint persisted in local storage on the web.
pub mod hint;

/// Platform-specific window configuration for native and WASM builds.
///
/// Configures canvas integration for web targets and vsync settings.
pub mod window_config;
