use bevy::math::Vec3;

/// Maximum pointer travel between press and release that still counts as a click.
pub const CLICK_DRAG_THRESHOLD_PX: f32 = 6.0;

/// Held magnifier position relative to the camera (camera space).
pub const MAGNIFIER_HELD_OFFSET: Vec3 = Vec3::new(0.16, -0.12, -0.55);

/// Held magnifier tilt around the camera's local X axis, radians.
pub const MAGNIFIER_HELD_TILT: f32 = 1.35;

/// Lens centre in the magnifier's local space.
pub const MAGNIFIER_LENS_LOCAL_OFFSET: Vec3 = Vec3::new(0.0, 0.006, 0.0);

/// Radians of inspected-object rotation per pixel of drag.
pub const INSPECT_ROTATE_SENSITIVITY: f32 = 0.008;

/// Distance from the overlay camera at which inspected proxies are shown.
pub const INSPECT_PROXY_DISTANCE: f32 = 1.2;
