//! Outline classification rules and the per-entity outline side table.
//!
//! The composite shader (`shaders/outline_composite.wgsl`) and the CPU
//! functions here implement the same edge rule:
//!
//! ```text
//! normal buffer: rgb = n * 0.5 + 0.5, a = coverage
//! id buffer:     rgb = outline colour, a = object id / 255 (0 = background)
//!
//! edge  <=> any 3x3 neighbour with
//!             both normals covered and dot(n_c, n_i) < 1 - normal_threshold
//!          or |id_c - id_i| > id_threshold
//! ```
//!
//! An edge pixel takes the outline colour of the centre object, or of the
//! first differing non-background neighbour when the centre is background.

use bevy::prelude::*;
use constants::render_settings::{
    DEFAULT_OUTLINE_RGB, OUTLINE_ID_THRESHOLD, OUTLINE_NORMAL_THRESHOLD,
};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineThresholds {
    pub normal: f32,
    pub id: f32,
}

impl Default for OutlineThresholds {
    fn default() -> Self {
        Self {
            normal: OUTLINE_NORMAL_THRESHOLD,
            id: OUTLINE_ID_THRESHOLD,
        }
    }
}

const CENTRE: usize = 4;

fn decode_normal(encoded: Vec4) -> Option<Vec3> {
    (encoded.w > 0.0).then(|| (encoded.truncate() * 2.0 - 1.0).normalize_or_zero())
}

/// Outline colour for the centre of a 3x3 neighbourhood, or `None` when it is not an edge.
pub fn classify_pixel(
    normals: &[Vec4; 9],
    ids: &[Vec4; 9],
    thresholds: OutlineThresholds,
) -> Option<Vec3> {
    let centre_normal = decode_normal(normals[CENTRE]);
    let centre_id = ids[CENTRE];

    let mut edge = false;
    let mut neighbour_colour = None;

    for index in (0..9).filter(|&index| index != CENTRE) {
        if let (Some(a), Some(b)) = (centre_normal, decode_normal(normals[index])) {
            if a.dot(b) < 1.0 - thresholds.normal {
                edge = true;
            }
        }

        let id = ids[index];
        if (id.w - centre_id.w).abs() > thresholds.id {
            edge = true;
            if neighbour_colour.is_none() && id.w > 0.0 {
                neighbour_colour = Some(id.truncate());
            }
        }
    }

    if !edge {
        return None;
    }

    if centre_id.w > 0.0 {
        Some(centre_id.truncate())
    } else {
        Some(neighbour_colour.unwrap_or(Vec3::from_array(DEFAULT_OUTLINE_RGB)))
    }
}

/// Full-frame composite over row-major buffers. Borders clamp to the edge.
pub fn composite(
    width: usize,
    height: usize,
    lit: &[Vec3],
    normals: &[Vec4],
    ids: &[Vec4],
    thresholds: OutlineThresholds,
) -> Vec<Vec3> {
    let at = |x: isize, y: isize| -> usize {
        let x = x.clamp(0, width as isize - 1) as usize;
        let y = y.clamp(0, height as isize - 1) as usize;
        y * width + x
    };

    let mut out = Vec::with_capacity(width * height);
    for y in 0..height as isize {
        for x in 0..width as isize {
            let mut normal_block = [Vec4::ZERO; 9];
            let mut id_block = [Vec4::ZERO; 9];
            for (slot, (dx, dy)) in (-1..=1)
                .flat_map(|dy| (-1..=1).map(move |dx| (dx, dy)))
                .enumerate()
            {
                let index = at(x + dx, y + dy);
                normal_block[slot] = normals[index];
                id_block[slot] = ids[index];
            }

            let centre = at(x, y);
            out.push(classify_pixel(&normal_block, &id_block, thresholds).unwrap_or(lit[centre]));
        }
    }
    out
}

/// Outline colour and id for one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineStyle {
    pub colour: Vec3,
    pub id: u8,
}

impl OutlineStyle {
    /// Colour written by the flat id pass.
    pub fn id_colour(&self) -> LinearRgba {
        LinearRgba::new(
            self.colour.x,
            self.colour.y,
            self.colour.z,
            f32::from(self.id) / 255.0,
        )
    }
}

/// Entity to outline style side table.
///
/// Ids cycle through 1..=255; 0 is reserved for background.
#[derive(Resource, Debug, Default)]
pub struct OutlineRegistry {
    styles: HashMap<Entity, OutlineStyle>,
    last_id: u8,
}

impl OutlineRegistry {
    pub fn register(&mut self, entity: Entity, colour: Vec3) -> OutlineStyle {
        if let Some(style) = self.styles.get_mut(&entity) {
            style.colour = colour;
            return *style;
        }

        self.last_id = if self.last_id == u8::MAX {
            1
        } else {
            self.last_id + 1
        };
        let style = OutlineStyle {
            colour,
            id: self.last_id,
        };
        self.styles.insert(entity, style);
        style
    }

    pub fn get(&self, entity: Entity) -> Option<OutlineStyle> {
        self.styles.get(&entity).copied()
    }

    pub fn remove(&mut self, entity: Entity) -> Option<OutlineStyle> {
        self.styles.remove(&entity)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UP: Vec4 = Vec4::new(0.5, 1.0, 0.5, 1.0);
    const FRONT: Vec4 = Vec4::new(0.5, 0.5, 1.0, 1.0);
    const LIT: Vec3 = Vec3::new(0.8, 0.7, 0.6);

    fn id(colour: Vec3, id: u8) -> Vec4 {
        colour.extend(f32::from(id) / 255.0)
    }

    #[test]
    fn uniform_region_has_no_edge() {
        let ink = Vec3::new(1.0, 0.0, 0.0);
        let normals = [UP; 9];
        let ids = [id(ink, 7); 9];
        assert_eq!(
            classify_pixel(&normals, &ids, OutlineThresholds::default()),
            None
        );
    }

    #[test]
    fn boundary_between_tinted_objects_is_an_edge() {
        let red = Vec3::new(1.0, 0.0, 0.0);
        let blue = Vec3::new(0.0, 0.0, 1.0);
        let (width, height) = (6, 3);
        let mut ids = Vec::new();
        for _ in 0..height {
            for x in 0..width {
                ids.push(if x < 3 { id(red, 1) } else { id(blue, 2) });
            }
        }
        let normals = vec![UP; width * height];
        let lit = vec![LIT; width * height];

        let out = composite(width, height, &lit, &normals, &ids, OutlineThresholds::default());

        let row = &out[width..2 * width];
        assert_eq!(row[0], LIT);
        assert_eq!(row[2], red);
        assert_eq!(row[3], blue);
        assert_eq!(row[5], LIT);
    }

    #[test]
    fn normal_crease_is_an_edge() {
        let ink = Vec3::new(0.1, 0.1, 0.1);
        let mut normals = [UP; 9];
        normals[5] = FRONT;
        let ids = [id(ink, 3); 9];
        assert_eq!(
            classify_pixel(&normals, &ids, OutlineThresholds::default()),
            Some(ink)
        );
    }

    #[test]
    fn background_next_to_object_takes_object_colour() {
        let ink = Vec3::new(0.0, 1.0, 0.0);
        let mut normals = [Vec4::ZERO; 9];
        let mut ids = [Vec4::ZERO; 9];
        normals[8] = UP;
        ids[8] = id(ink, 9);
        assert_eq!(
            classify_pixel(&normals, &ids, OutlineThresholds::default()),
            Some(ink)
        );
    }

    #[test]
    fn empty_background_has_no_edge() {
        let normals = [Vec4::ZERO; 9];
        let ids = [Vec4::ZERO; 9];
        assert_eq!(
            classify_pixel(&normals, &ids, OutlineThresholds::default()),
            None
        );
    }

    #[test]
    fn registry_ids_skip_background() {
        let mut registry = OutlineRegistry {
            last_id: 254,
            ..default()
        };
        let a = registry.register(Entity::from_raw(1), Vec3::ONE);
        let b = registry.register(Entity::from_raw(2), Vec3::ONE);
        assert_eq!(a.id, 255);
        assert_eq!(b.id, 1);

        let again = registry.register(Entity::from_raw(1), Vec3::ZERO);
        assert_eq!(again.id, 255);
        assert_eq!(again.colour, Vec3::ZERO);
        assert_eq!(registry.len(), 2);
        assert!(registry.remove(Entity::from_raw(2)).is_some());
        assert_eq!(registry.get(Entity::from_raw(2)), None);
    }
}
