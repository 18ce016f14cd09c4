/// Radians of yaw/pitch per pixel of drag.
pub const FREE_LOOK_SENSITIVITY: f32 = 0.0035;

/// Pitch is clamped to ±(90° - this margin) to keep the view off the poles.
pub const PITCH_LIMIT_EPSILON: f32 = 0.01;

/// Exponential damping rate for free-look orientation smoothing.
pub const FREE_LOOK_DAMPING: f32 = 10.0;

/// Exponential damping rate for move-to position.
pub const MOVE_POSITION_DAMPING: f32 = 4.0;

/// Exponential damping rate for move-to orientation.
pub const MOVE_ROTATION_DAMPING: f32 = 5.0;

/// Position error below which a move has arrived (world units).
pub const ARRIVAL_POSITION_EPSILON: f32 = 0.02;

/// Angular error below which a move has arrived (degrees).
pub const ARRIVAL_ANGLE_EPSILON_DEG: f32 = 1.0;

/// Default zoom FOV band in degrees.
pub const DEFAULT_FOV_DEG: f32 = 55.0;
pub const DEFAULT_FOV_MIN_DEG: f32 = 25.0;
pub const DEFAULT_FOV_MAX_DEG: f32 = 70.0;

/// Degrees of FOV per scroll line.
pub const ZOOM_FOV_STEP_DEG: f32 = 2.5;

/// World units per scroll line in dolly mode.
pub const ZOOM_DOLLY_STEP: f32 = 0.25;

/// Scroll pixels that count as one line.
pub const SCROLL_PIXELS_PER_LINE: f32 = 20.0;

/// Furthest the camera may dolly forward from its configured position.
pub const DOLLY_MAX_DISTANCE: f32 = 1.5;
