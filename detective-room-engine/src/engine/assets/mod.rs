//! Asset types for the detective room.

/// Room description (camera, props, groups, puzzles) loaded from JSON.
///
/// Validated on load; cross-references between puzzles, props and groups are checked here.
pub mod room_config;
