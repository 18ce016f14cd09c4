use crate::engine::camera::orientation::damping_factor;
use bevy::math::EulerRot;
use bevy::prelude::*;
use constants::camera::{FREE_LOOK_SENSITIVITY, PITCH_LIMIT_EPSILON};
use std::f32::consts::FRAC_PI_2;

/// Drag-to-look yaw/pitch accumulator.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct FreeLook {
    pub yaw: f32,
    pub pitch: f32,
}

impl FreeLook {
    /// Re-derive yaw/pitch so the next drag continues from `rotation` without a snap.
    pub fn sync_from(&mut self, rotation: Quat) {
        let (yaw, pitch, _) = rotation.to_euler(EulerRot::YXZ);
        self.yaw = yaw;
        self.pitch = clamp_pitch(pitch);
    }

    /// Accumulate a mouse delta and return the new target rotation.
    pub fn apply_drag(&mut self, delta: Vec2) -> Quat {
        self.yaw -= delta.x * FREE_LOOK_SENSITIVITY;
        self.pitch = clamp_pitch(self.pitch - delta.y * FREE_LOOK_SENSITIVITY);
        self.rotation()
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }
}

pub fn clamp_pitch(pitch: f32) -> f32 {
    let limit = FRAC_PI_2 - PITCH_LIMIT_EPSILON;
    pitch.clamp(-limit, limit)
}

pub fn smooth_rotation(current: Quat, target: Quat, rate: f32, dt: f32) -> Quat {
    current.slerp(target, damping_factor(rate, dt)).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_is_clamped_short_of_the_poles() {
        let mut look = FreeLook::default();
        look.apply_drag(Vec2::new(0.0, -100_000.0));
        assert!(look.pitch < FRAC_PI_2);
        assert!((look.pitch - (FRAC_PI_2 - PITCH_LIMIT_EPSILON)).abs() < 1e-6);

        look.apply_drag(Vec2::new(0.0, 200_000.0));
        assert!((look.pitch + (FRAC_PI_2 - PITCH_LIMIT_EPSILON)).abs() < 1e-6);
    }

    #[test]
    fn dragging_right_turns_right() {
        let mut look = FreeLook::default();
        let rotation = look.apply_drag(Vec2::new(100.0, 0.0));
        let forward = rotation * Vec3::NEG_Z;
        assert!(forward.x > 0.0);
    }

    #[test]
    fn sync_round_trips_rotation() {
        let source = Quat::from_euler(EulerRot::YXZ, 0.8, -0.4, 0.0);
        let mut look = FreeLook::default();
        look.sync_from(source);
        assert!((look.yaw - 0.8).abs() < 1e-4);
        assert!((look.pitch + 0.4).abs() < 1e-4);
        assert!(look.rotation().angle_between(source) < 1e-3);
    }

    #[test]
    fn smoothing_converges() {
        let target = Quat::from_rotation_y(1.2);
        let mut current = Quat::IDENTITY;
        for _ in 0..120 {
            current = smooth_rotation(current, target, 10.0, 1.0 / 60.0);
        }
        assert!(current.angle_between(target) < 1e-3);
    }
}
