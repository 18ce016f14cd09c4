use bevy::prelude::*;

/// Local-space box size used for click picking.
#[derive(Component, Debug, Clone, Copy)]
pub struct PickBounds(pub Vec3);

pub fn ray_hits_obb(origin: Vec3, dir: Vec3, xf: GlobalTransform, size: Vec3) -> Option<f32> {
    let inv = xf.compute_matrix().inverse();
    let o_local = inv.transform_point3(origin);
    let d_local = inv.transform_vector3(dir);
    let he = size * 0.5;
    ray_aabb_hit_t(o_local, d_local, -he, he)
}

// Slab-method ray-AABB intersection, returns Some(t) or None
pub fn ray_aabb_hit_t(ray_origin: Vec3, ray_direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;

    for axis in 0..3 {
        let origin = ray_origin[axis];
        let direction = ray_direction[axis];
        if direction == 0.0 {
            // Parallel to this slab: miss unless already inside it.
            if origin < min[axis] || origin > max[axis] {
                return None;
            }
            continue;
        }

        let inv = 1.0 / direction;
        let (mut t0, mut t1) = ((min[axis] - origin) * inv, (max[axis] - origin) * inv);
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_near = t_near.max(t0);
        t_far = t_far.min(t1);
        if t_near > t_far {
            return None;
        }
    }

    if t_far < 0.0 {
        return None;
    }
    Some(if t_near >= 0.0 { t_near } else { t_far })
}

/// Nearest picked entity along the ray.
pub fn pick_nearest<'a>(
    ray: Ray3d,
    candidates: impl IntoIterator<Item = (Entity, &'a GlobalTransform, &'a PickBounds)>,
) -> Option<(Entity, f32)> {
    candidates
        .into_iter()
        .filter_map(|(entity, xf, bounds)| {
            ray_hits_obb(ray.origin, ray.direction.as_vec3(), *xf, bounds.0).map(|t| (entity, t))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// World ray under the cursor, if the window has one.
pub fn cursor_ray(window: &Window, camera: &Camera, camera_xf: &GlobalTransform) -> Option<Ray3d> {
    let cursor = window.cursor_position()?;
    camera.viewport_to_world(camera_xf, cursor).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ray(origin: Vec3, dir: Vec3) -> Ray3d {
        Ray3d::new(origin, Dir3::new(dir).expect("non-zero direction"))
    }

    #[test]
    fn hits_box_in_front() {
        let t = ray_aabb_hit_t(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z, Vec3::splat(-0.5), Vec3::splat(0.5));
        assert_eq!(t, Some(4.5));
    }

    #[test]
    fn misses_box_behind_or_beside() {
        let min = Vec3::splat(-0.5);
        let max = Vec3::splat(0.5);
        assert_eq!(ray_aabb_hit_t(Vec3::new(0.0, 0.0, 5.0), Vec3::Z, min, max), None);
        assert_eq!(ray_aabb_hit_t(Vec3::new(2.0, 0.0, 5.0), Vec3::NEG_Z, min, max), None);
    }

    #[test]
    fn origin_inside_returns_exit_distance() {
        let t = ray_aabb_hit_t(Vec3::ZERO, Vec3::X, Vec3::splat(-1.0), Vec3::splat(1.0));
        assert_eq!(t, Some(1.0));
    }

    #[test]
    fn obb_respects_rotation_and_translation() {
        let xf = GlobalTransform::from(
            Transform::from_xyz(3.0, 0.0, 0.0).with_rotation(Quat::from_rotation_y(0.25 * std::f32::consts::PI)),
        );
        let size = Vec3::new(2.0, 0.2, 0.2);
        assert!(ray_hits_obb(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z, xf, size).is_some());
        assert!(ray_hits_obb(Vec3::new(4.5, 0.0, 5.0), Vec3::NEG_Z, xf, size).is_none());
    }

    #[test]
    fn nearest_candidate_wins() {
        let near = GlobalTransform::from(Transform::from_xyz(0.0, 0.0, 1.0));
        let far = GlobalTransform::from(Transform::from_xyz(0.0, 0.0, -1.0));
        let bounds = PickBounds(Vec3::splat(0.5));
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);

        let hit = pick_nearest(
            ray(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z),
            [(b, &far, &bounds), (a, &near, &bounds)],
        );
        assert_eq!(hit.map(|(entity, _)| entity), Some(a));
    }
}
