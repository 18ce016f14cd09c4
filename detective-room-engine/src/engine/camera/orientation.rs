use bevy::prelude::*;

/// Rotation the camera is easing toward.
///
/// Written by exactly one behaviour per frame: the mover while a move is
/// active, free-look otherwise. The camera motion system reads it after both.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct OrientationTarget(pub Quat);

impl Default for OrientationTarget {
    fn default() -> Self {
        Self(Quat::IDENTITY)
    }
}

/// Frame-rate independent interpolation factor for exponential damping.
pub fn damping_factor(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

/// Angle in radians between two orientations.
pub fn angle_between(a: Quat, b: Quat) -> f32 {
    2.0 * a.dot(b).abs().min(1.0).acos()
}

/// Rotation looking from `eye` at `target`.
///
/// When the two coincide the camera keeps `fallback_forward` so no NaN
/// direction ever reaches the transform.
pub fn look_rotation(eye: Vec3, target: Vec3, fallback_forward: Vec3) -> Quat {
    let direction = (target - eye)
        .try_normalize()
        .unwrap_or_else(|| fallback_forward.normalize_or(Vec3::NEG_Z));

    // Straight up or down has no usable yaw reference against +Y.
    let up = if direction.cross(Vec3::Y).length_squared() < 1e-8 {
        Vec3::Z
    } else {
        Vec3::Y
    };

    Transform::default().looking_to(direction, up).rotation
}
