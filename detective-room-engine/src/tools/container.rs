use crate::engine::scene::room::Prop;
use crate::tools::puzzle::GameState;
use bevy::prelude::*;
use constants::room::{CONTAINER_OPEN_SECS, get_container_kind_name};

/// How an opening part moves between closed and open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContainerMotionKind {
    /// Translate by this local offset when fully open (drawers).
    Slide(Vec3),
    /// Rotate about the local X axis through `pivot` (lids).
    Hinge { pivot: Vec3, angle: f32 },
}

/// Animated part of a container: the drawer itself or a box lid.
#[derive(Component, Debug, Clone)]
pub struct ContainerMotion {
    pub container_id: String,
    pub kind: ContainerMotionKind,
    pub closed: Transform,
    /// 0 = closed, 1 = open.
    pub progress: f32,
}

impl ContainerMotion {
    pub fn new(container_id: impl Into<String>, kind: ContainerMotionKind, closed: Transform) -> Self {
        Self {
            container_id: container_id.into(),
            kind,
            closed,
            progress: 0.0,
        }
    }

    /// Slide out along local +Z by most of the drawer depth.
    pub fn drawer(container_id: impl Into<String>, closed: Transform, depth: f32) -> Self {
        Self::new(
            container_id,
            ContainerMotionKind::Slide(Vec3::Z * depth * 0.7),
            closed,
        )
    }

    /// Swing open about the lid's back edge.
    pub fn lid(container_id: impl Into<String>, closed: Transform, depth: f32) -> Self {
        Self::new(
            container_id,
            ContainerMotionKind::Hinge {
                pivot: Vec3::new(0.0, 0.0, -depth * 0.5),
                angle: -100f32.to_radians(),
            },
            closed,
        )
    }

    /// Move `progress` toward open or closed at a fixed rate.
    pub fn advance(&mut self, open: bool, dt: f32) -> bool {
        let target = if open { 1.0 } else { 0.0 };
        if self.progress == target {
            return false;
        }
        let step = dt / CONTAINER_OPEN_SECS;
        self.progress = if open {
            (self.progress + step).min(1.0)
        } else {
            (self.progress - step).max(0.0)
        };
        true
    }

    pub fn pose(&self) -> Transform {
        let t = smoothstep(self.progress.clamp(0.0, 1.0));
        match self.kind {
            ContainerMotionKind::Slide(offset) => {
                let mut pose = self.closed;
                pose.translation += self.closed.rotation * (offset * t);
                pose
            }
            ContainerMotionKind::Hinge { pivot, angle } => {
                let hinge = Quat::from_rotation_x(angle * t);
                let pivot_world = self.closed.rotation * pivot;
                let mut pose = self.closed;
                pose.translation =
                    self.closed.translation + pivot_world - (self.closed.rotation * hinge * pivot);
                pose.rotation = self.closed.rotation * hinge;
                pose
            }
        }
    }
}

fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// Toggle the container this prop belongs to. Returns whether it is now open.
pub fn toggle_container_for(prop: &Prop, game: &mut GameState) -> Option<bool> {
    let id = std::iter::once(prop.id.as_str())
        .chain(prop.parent.as_deref())
        .find(|id| game.container(id).is_some())?;

    match game.toggle_container(id) {
        Ok(open) => {
            let name = game
                .container(id)
                .map(|container| get_container_kind_name(&container.kind))
                .unwrap_or_default();
            info!("{} {} {}", if open { "Opened" } else { "Closed" }, name, id);
            Some(open)
        }
        Err(err) => {
            warn!("{}", err);
            None
        }
    }
}

/// Drive drawer and lid poses from the container state.
pub fn animate_containers(
    time: Res<Time>,
    mut game: ResMut<GameState>,
    mut parts: Query<(&mut ContainerMotion, &mut Transform)>,
) {
    let dt = time.delta_secs();

    let ids: Vec<String> = game.containers().map(|(id, _)| id.clone()).collect();
    for id in &ids {
        // Consuming the nonce is bookkeeping, not a visible state change.
        if game.bypass_change_detection().take_open_animation(id).is_some() {
            // A fresh opening always plays from closed.
            for (mut motion, _) in &mut parts {
                if &motion.container_id == id {
                    motion.progress = 0.0;
                }
            }
        }
    }

    for (mut motion, mut transform) in &mut parts {
        let open = game
            .container(&motion.container_id)
            .is_some_and(|container| container.open);
        if motion.advance(open, dt) || motion.is_added() {
            *transform = motion.pose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawer_slides_along_its_facing() {
        let closed = Transform::from_xyz(1.0, 0.5, 0.0)
            .with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let mut drawer = ContainerMotion::drawer("desk-drawer", closed, 0.4);
        assert_eq!(drawer.pose(), closed);

        drawer.progress = 1.0;
        let open = drawer.pose();
        assert!((open.translation - Vec3::new(1.28, 0.5, 0.0)).length() < 1e-4);
        assert_eq!(open.rotation, closed.rotation);
    }

    #[test]
    fn lid_hinges_about_back_edge() {
        let closed = Transform::from_xyz(0.0, 0.3, 0.0);
        let mut lid = ContainerMotion::lid("box", closed, 0.4);
        lid.progress = 1.0;
        let open = lid.pose();

        // The back edge stays put while the lid swings.
        let back_edge = Vec3::new(0.0, 0.0, -0.2);
        let before = closed.transform_point(back_edge);
        let after = open.transform_point(back_edge);
        assert!((before - after).length() < 1e-4);
        assert!(open.transform_point(Vec3::new(0.0, 0.0, 0.2)).y > 0.5);
    }

    #[test]
    fn progress_is_clamped_and_reports_motion() {
        let mut drawer = ContainerMotion::drawer("d", Transform::IDENTITY, 0.4);
        assert!(!drawer.advance(false, 0.1));
        assert!(drawer.advance(true, CONTAINER_OPEN_SECS * 2.0));
        assert_eq!(drawer.progress, 1.0);
        assert!(!drawer.advance(true, 0.1));
        assert!(drawer.advance(false, CONTAINER_OPEN_SECS * 0.5));
        assert!((drawer.progress - 0.5).abs() < 1e-5);
    }
}
