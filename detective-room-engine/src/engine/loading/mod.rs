//! Asset loading for the detective room.
//!
//! The room config is loaded and validated first; textures stream in through
//! the shared cache afterwards and never block the transition to running.

/// Room config loading and validation into the game state.
pub mod config_loader;

/// Loading milestones resource for state transitions.
pub mod progress;

/// Reference-counted, request-coalescing texture cache with bounded concurrency.
///
/// Engine-agnostic: the image loader is abstracted behind `TextureSource`.
pub mod texture_cache;

/// Bevy adapter for the texture cache backed by the asset server.
///
/// Pumps the cache each frame, emits completion events and applies textures to prop materials.
pub mod texture_loader;
