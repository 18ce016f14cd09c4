use crate::engine::camera::controller::RoomCamera;
use crate::tools::click::ClickTracker;
use crate::tools::inspect::Inspection;
use crate::tools::ray::{PickBounds, cursor_ray, pick_nearest};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use constants::interaction::{
    MAGNIFIER_HELD_OFFSET, MAGNIFIER_HELD_TILT, MAGNIFIER_LENS_LOCAL_OFFSET,
};
use constants::render_settings::LENS_RADIUS;

/// Screen-space lens published while the magnifier is held.
///
/// Written only by [`update_held_magnifier`]; read by the reveal material sync.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct LensMask {
    pub active: bool,
    /// Lens centre in normalised device coordinates.
    pub origin: Vec2,
    /// Unit vector from the camera to the lens.
    pub dir: Vec3,
    pub radius: f32,
}

impl Default for LensMask {
    fn default() -> Self {
        Self {
            active: false,
            origin: Vec2::ZERO,
            dir: Vec3::NEG_Z,
            radius: LENS_RADIUS,
        }
    }
}

/// The prop that can be picked up and used as a lens.
#[derive(Component, Debug, Default)]
pub struct MagnifierPickup;

/// Where the magnifier sat before it was picked up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavedPose {
    pub parent: Option<Entity>,
    pub transform: Transform,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MagnifierState {
    #[default]
    Stowed,
    Held(SavedPose),
}

/// Pickup and drop state machine.
#[derive(Resource, Debug, Default)]
pub struct Magnifier {
    state: MagnifierState,
    picked_on_press: bool,
    claimed_click: bool,
}

impl Magnifier {
    pub fn state(&self) -> MagnifierState {
        self.state
    }

    pub fn is_held(&self) -> bool {
        matches!(self.state, MagnifierState::Held(_))
    }

    /// Whether this frame's pointer press or release belonged to the magnifier.
    pub fn claimed_click(&self) -> bool {
        self.claimed_click
    }

    /// Left press. Picks up the magnifier when the press hit it while stowed.
    pub fn on_press(&mut self, hit_magnifier: bool, pose: SavedPose) -> bool {
        self.picked_on_press = false;
        if self.is_held() || !hit_magnifier {
            return false;
        }
        self.state = MagnifierState::Held(pose);
        self.picked_on_press = true;
        self.claimed_click = true;
        true
    }

    /// Left release. Returns the pose to restore when the magnifier is dropped.
    ///
    /// The release that completes the pickup press never drops it, and only a
    /// true click that misses the held magnifier puts it back.
    pub fn on_release(&mut self, true_click: bool, hit_magnifier: bool) -> Option<SavedPose> {
        if std::mem::take(&mut self.picked_on_press) {
            self.claimed_click = true;
            return None;
        }

        let MagnifierState::Held(saved) = self.state else {
            return None;
        };
        if true_click {
            self.claimed_click = true;
        }
        if !true_click || hit_magnifier {
            return None;
        }

        self.state = MagnifierState::Stowed;
        Some(saved)
    }

    fn begin_frame(&mut self) {
        self.claimed_click = false;
    }

    /// Mask for this frame. Always inactive while stowed.
    pub fn frame_mask(&self, camera: &Transform, clip_from_world: Mat4) -> LensMask {
        if !self.is_held() {
            return LensMask::default();
        }
        let lens = lens_point(&held_pose(camera));
        lens_mask(camera.translation, lens, clip_from_world)
    }
}

/// Pose of the held magnifier for a camera pose.
pub fn held_pose(camera: &Transform) -> Transform {
    Transform {
        translation: camera.translation + camera.rotation * MAGNIFIER_HELD_OFFSET,
        rotation: camera.rotation * Quat::from_rotation_x(MAGNIFIER_HELD_TILT),
        scale: Vec3::ONE,
    }
}

pub fn lens_point(held: &Transform) -> Vec3 {
    held.transform_point(MAGNIFIER_LENS_LOCAL_OFFSET)
}

pub fn lens_mask(camera_position: Vec3, lens: Vec3, clip_from_world: Mat4) -> LensMask {
    let clip = clip_from_world * lens.extend(1.0);
    let origin = if clip.w.abs() > f32::EPSILON {
        clip.truncate().truncate() / clip.w
    } else {
        Vec2::ZERO
    };

    LensMask {
        active: true,
        origin,
        dir: (lens - camera_position).try_normalize().unwrap_or(Vec3::NEG_Z),
        radius: LENS_RADIUS,
    }
}

/// Pick up on press, drop on a true click elsewhere.
pub fn magnifier_input(
    mut commands: Commands,
    clicks: Res<ClickTracker>,
    inspection: Res<Inspection>,
    mut magnifier: ResMut<Magnifier>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<RoomCamera>>,
    pickables: Query<(Entity, &GlobalTransform, &PickBounds)>,
    magnifiers: Query<(Entity, &Transform, Option<&ChildOf>), With<MagnifierPickup>>,
) {
    magnifier.begin_frame();

    if inspection.is_open() || (clicks.pressed_at.is_none() && clicks.released_at.is_none()) {
        return;
    }
    let Ok((magnifier_entity, transform, child_of)) = magnifiers.single() else {
        return;
    };
    let (Ok(window), Ok((camera, camera_xf))) = (windows.single(), cameras.single()) else {
        return;
    };

    let hit_magnifier = cursor_ray(window, camera, camera_xf)
        .and_then(|ray| pick_nearest(ray, &pickables))
        .is_some_and(|(entity, _)| entity == magnifier_entity);

    if clicks.pressed_at.is_some() {
        let pose = SavedPose {
            parent: child_of.map(ChildOf::parent),
            transform: *transform,
        };
        if magnifier.on_press(hit_magnifier, pose) {
            info!("Picked up magnifier");
            commands.entity(magnifier_entity).remove::<ChildOf>();
        }
    }

    if clicks.released_at.is_some() {
        if let Some(saved) = magnifier.on_release(clicks.clicked_at.is_some(), hit_magnifier) {
            info!("Put magnifier down");
            let mut entity = commands.entity(magnifier_entity);
            entity.insert(saved.transform);
            if let Some(parent) = saved.parent {
                entity.insert(ChildOf(parent));
            }
        }
    }
}

/// Keep the held magnifier in front of the camera and publish the lens mask.
pub fn update_held_magnifier(
    magnifier: Res<Magnifier>,
    mut mask: ResMut<LensMask>,
    cameras: Query<(&Camera, &Transform), (With<RoomCamera>, Without<MagnifierPickup>)>,
    mut held: Query<&mut Transform, With<MagnifierPickup>>,
) {
    let Ok((camera, camera_transform)) = cameras.single() else {
        *mask = LensMask::default();
        return;
    };

    if magnifier.is_held() {
        if let Ok(mut transform) = held.single_mut() {
            let pose = held_pose(camera_transform);
            transform.translation = pose.translation;
            transform.rotation = pose.rotation;
        }
    }

    let clip_from_world = camera.clip_from_view() * camera_transform.compute_matrix().inverse();
    *mask = magnifier.frame_mask(camera_transform, clip_from_world);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stowed_pose() -> SavedPose {
        SavedPose {
            parent: Some(Entity::from_raw(7)),
            transform: Transform::from_xyz(-0.3, 0.8, 0.1),
        }
    }

    fn camera() -> Transform {
        Transform::from_xyz(0.0, 1.6, 3.0).looking_at(Vec3::new(0.0, 1.0, 0.0), Vec3::Y)
    }

    fn clip_from_world(camera: &Transform) -> Mat4 {
        let projection = Mat4::perspective_infinite_reverse_rh(55f32.to_radians(), 16.0 / 9.0, 0.1);
        projection * camera.compute_matrix().inverse()
    }

    #[test]
    fn click_on_magnifier_picks_it_up() {
        let mut magnifier = Magnifier::default();
        assert!(magnifier.on_press(true, stowed_pose()));
        assert_eq!(magnifier.on_release(true, true), None);
        assert!(magnifier.is_held());
        assert!(magnifier.claimed_click());
    }

    #[test]
    fn held_mask_is_active_with_unit_direction() {
        let mut magnifier = Magnifier::default();
        magnifier.on_press(true, stowed_pose());
        magnifier.on_release(true, true);

        let camera = camera();
        let mask = magnifier.frame_mask(&camera, clip_from_world(&camera));
        assert!(mask.active);
        assert!((mask.dir.length() - 1.0).abs() < 1e-5);
        assert!((mask.radius - 0.47).abs() < 1e-6);
        assert!(mask.origin.x.abs() <= 1.0 && mask.origin.y.abs() <= 1.0);
        assert!(mask.dir.dot(*camera.forward()) > 0.5);
    }

    #[test]
    fn click_on_empty_space_drops_and_deactivates() {
        let mut magnifier = Magnifier::default();
        magnifier.on_press(true, stowed_pose());
        magnifier.on_release(true, true);

        magnifier.begin_frame();
        assert!(!magnifier.on_press(false, stowed_pose()));
        assert_eq!(magnifier.on_release(true, false), Some(stowed_pose()));
        assert!(!magnifier.is_held());

        let camera = camera();
        assert!(!magnifier.frame_mask(&camera, clip_from_world(&camera)).active);
    }

    #[test]
    fn drag_does_not_drop() {
        let mut magnifier = Magnifier::default();
        magnifier.on_press(true, stowed_pose());
        magnifier.on_release(true, true);

        magnifier.on_press(false, stowed_pose());
        assert_eq!(magnifier.on_release(false, false), None);
        assert!(magnifier.is_held());
    }

    #[test]
    fn pickup_release_after_drag_keeps_it_held() {
        let mut magnifier = Magnifier::default();
        magnifier.on_press(true, stowed_pose());
        assert_eq!(magnifier.on_release(false, false), None);
        assert!(magnifier.is_held());
    }

    #[test]
    fn clicking_the_held_magnifier_keeps_it() {
        let mut magnifier = Magnifier::default();
        magnifier.on_press(true, stowed_pose());
        magnifier.on_release(true, true);

        magnifier.on_press(true, stowed_pose());
        assert_eq!(magnifier.on_release(true, true), None);
        assert!(magnifier.is_held());
    }

    #[test]
    fn held_pose_follows_camera() {
        let camera = camera();
        let pose = held_pose(&camera);
        let local = camera.compute_matrix().inverse().transform_point3(pose.translation);
        assert!(local.abs_diff_eq(MAGNIFIER_HELD_OFFSET, 1e-4));
    }
}
