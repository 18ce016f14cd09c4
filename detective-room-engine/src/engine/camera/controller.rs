use crate::engine::assets::room_config::ZoomMode;
use crate::engine::camera::free_look::{FreeLook, smooth_rotation};
use crate::engine::camera::move_to::{CameraArrived, CameraMover, MoveRequest, MoveStep};
use crate::engine::camera::orientation::OrientationTarget;
use crate::engine::camera::zoom::{ZoomControl, scroll_lines};
use crate::engine::core::app_state::AppState;
use crate::tools::inspect::Inspection;
use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;
use constants::camera::FREE_LOOK_DAMPING;

/// The room's main perspective camera.
#[derive(Component, Debug, Default)]
pub struct RoomCamera;

pub struct CameraControllerPlugin;

impl Plugin for CameraControllerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OrientationTarget>()
            .init_resource::<FreeLook>()
            .init_resource::<CameraMover>()
            .init_resource::<ZoomControl>()
            .add_event::<MoveRequest>()
            .add_event::<CameraArrived>()
            .add_systems(
                Update,
                // Writers of the orientation target run before the motion system reads it.
                (
                    queue_move_requests,
                    free_look_system,
                    camera_motion_system,
                    zoom_system,
                )
                    .chain()
                    .run_if(in_state(AppState::Running)),
            );
    }
}

pub fn queue_move_requests(
    mut requests: EventReader<MoveRequest>,
    mut mover: ResMut<CameraMover>,
    camera: Query<&Transform, With<RoomCamera>>,
) {
    let Ok(transform) = camera.single() else {
        requests.clear();
        return;
    };

    // Last write wins: only the final request of the frame survives.
    if let Some(request) = requests.read().last() {
        debug!("Camera move to {:?} looking at {:?}", request.camera, request.look_at);
        mover.request(*request, transform);
    }
}

pub fn free_look_system(
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut free_look: ResMut<FreeLook>,
    mut target: ResMut<OrientationTarget>,
    mover: Res<CameraMover>,
    inspection: Res<Inspection>,
) {
    let delta: Vec2 = mouse_motion.read().map(|motion| motion.delta).sum();

    if mover.is_active() || inspection.is_open() {
        return;
    }

    if mouse_button.pressed(MouseButton::Left) && delta != Vec2::ZERO {
        target.0 = free_look.apply_drag(delta);
    }
}

pub fn camera_motion_system(
    time: Res<Time>,
    mut camera: Query<&mut Transform, With<RoomCamera>>,
    mut mover: ResMut<CameraMover>,
    mut target: ResMut<OrientationTarget>,
    mut free_look: ResMut<FreeLook>,
    mut arrived: EventWriter<CameraArrived>,
) {
    let Ok(mut transform) = camera.single_mut() else {
        return;
    };
    let dt = time.delta_secs();

    match mover.step(&mut transform, &mut target, dt) {
        MoveStep::Arrived(request) => {
            free_look.sync_from(target.0);
            debug!("Camera arrived at {:?}", request.camera);
            arrived.write(CameraArrived { request });
        }
        MoveStep::Moving => {}
        MoveStep::Idle => {
            transform.rotation = smooth_rotation(transform.rotation, target.0, FREE_LOOK_DAMPING, dt);
        }
    }
}

pub fn zoom_system(
    mut scroll_events: EventReader<MouseWheel>,
    mut zoom: ResMut<ZoomControl>,
    mover: Res<CameraMover>,
    inspection: Res<Inspection>,
    mut camera: Query<(&mut Projection, &mut Transform), With<RoomCamera>>,
) {
    let lines: f32 = scroll_events
        .read()
        .map(|event| scroll_lines(event.unit, event.y))
        .sum();

    if lines.abs() <= f32::EPSILON || inspection.is_open() {
        return;
    }

    let Ok((mut projection, mut transform)) = camera.single_mut() else {
        return;
    };

    match zoom.mode {
        ZoomMode::Fov => {
            if let Projection::Perspective(perspective) = projection.as_mut() {
                perspective.fov = zoom.apply_fov(perspective.fov, lines);
            }
        }
        ZoomMode::Dolly => {
            if mover.is_active() {
                return;
            }
            let moved = zoom.apply_dolly(lines);
            let forward = transform.forward();
            transform.translation += forward * moved;
        }
    }
}
