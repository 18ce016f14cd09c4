use crate::engine::camera::orientation::{
    OrientationTarget, angle_between, damping_factor, look_rotation,
};
use bevy::prelude::*;
use constants::camera::{
    ARRIVAL_ANGLE_EPSILON_DEG, ARRIVAL_POSITION_EPSILON, MOVE_POSITION_DAMPING,
    MOVE_ROTATION_DAMPING,
};

/// Move the camera to `camera` while turning to face `look_at`.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct MoveRequest {
    pub camera: Vec3,
    pub look_at: Vec3,
}

/// Fired once when the active move settles.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct CameraArrived {
    pub request: MoveRequest,
}

#[derive(Debug, Clone, Copy)]
struct MoveGoal {
    request: MoveRequest,
    rotation: Quat,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveStep {
    Idle,
    Moving,
    Arrived(MoveRequest),
}

/// Damped move-to-target animator with exactly-once arrival.
#[derive(Resource, Debug, Default)]
pub struct CameraMover {
    goal: Option<MoveGoal>,
}

impl CameraMover {
    /// Replace any active goal. The superseded move never reports arrival.
    pub fn request(&mut self, request: MoveRequest, current: &Transform) -> Quat {
        let rotation = look_rotation(request.camera, request.look_at, *current.forward());
        self.goal = Some(MoveGoal { request, rotation });
        rotation
    }

    pub fn is_active(&self) -> bool {
        self.goal.is_some()
    }

    pub fn cancel(&mut self) {
        self.goal = None;
    }

    pub fn step(
        &mut self,
        transform: &mut Transform,
        target: &mut OrientationTarget,
        dt: f32,
    ) -> MoveStep {
        let Some(goal) = self.goal else {
            return MoveStep::Idle;
        };

        let position_t = damping_factor(MOVE_POSITION_DAMPING, dt);
        transform.translation = transform.translation.lerp(goal.request.camera, position_t);

        target.0 = goal.rotation;
        let rotation_t = damping_factor(MOVE_ROTATION_DAMPING, dt);
        transform.rotation = transform.rotation.slerp(goal.rotation, rotation_t).normalize();

        let position_error = transform.translation.distance(goal.request.camera);
        let angle_error = angle_between(transform.rotation, goal.rotation);
        if position_error < ARRIVAL_POSITION_EPSILON
            && angle_error < ARRIVAL_ANGLE_EPSILON_DEG.to_radians()
        {
            transform.translation = goal.request.camera;
            transform.rotation = goal.rotation;
            self.goal = None;
            return MoveStep::Arrived(goal.request);
        }

        MoveStep::Moving
    }
}
