use crate::tools::magnifier::LensMask;
use bevy::{
    prelude::*,
    render::render_resource::{AsBindGroup, ShaderRef, ShaderType},
    window::PrimaryWindow,
};

const LENS_REVEAL_SHADER_PATH: &str = "shaders/lens_reveal.wgsl";

/// Lens mask as the reveal shader sees it.
#[derive(ShaderType, Debug, Clone, Copy, PartialEq, Default)]
pub struct LensUniform {
    pub origin: Vec2,
    pub radius: f32,
    pub active: f32,
    pub dir: Vec3,
    /// Viewport width / height; the radius is measured on the vertical axis.
    pub aspect: f32,
}

impl LensUniform {
    pub fn from_mask(mask: &LensMask, aspect: f32) -> Self {
        Self {
            origin: mask.origin,
            radius: mask.radius,
            active: if mask.active { 1.0 } else { 0.0 },
            dir: mask.dir,
            aspect,
        }
    }

    /// Whether a fragment at `ndc` lies inside the lens circle.
    pub fn covers(&self, ndc: Vec2) -> bool {
        if self.active < 0.5 {
            return false;
        }
        let offset = Vec2::new((ndc.x - self.origin.x) * self.aspect, ndc.y - self.origin.y);
        offset.length() <= self.radius
    }
}

/// Hidden clue surface, drawn only inside the magnifier lens.
#[derive(Asset, TypePath, AsBindGroup, Debug, Clone)]
pub struct RevealMaterial {
    #[uniform(0)]
    pub lens: LensUniform,
    #[uniform(1)]
    pub colour: LinearRgba,
    #[texture(2)]
    #[sampler(3)]
    pub texture: Option<Handle<Image>>,
}

impl Material for RevealMaterial {
    fn fragment_shader() -> ShaderRef {
        LENS_REVEAL_SHADER_PATH.into()
    }

    fn alpha_mode(&self) -> AlphaMode {
        AlphaMode::Blend
    }
}

/// Copy the published lens mask into every reveal material.
pub fn sync_lens_uniforms(
    mask: Res<LensMask>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut materials: ResMut<Assets<RevealMaterial>>,
) {
    let aspect = windows
        .single()
        .ok()
        .map(|window| window.width() / window.height().max(1.0))
        .unwrap_or(1.0);
    let lens = LensUniform::from_mask(&mask, aspect);

    let stale: Vec<_> = materials
        .iter()
        .filter(|(_, material)| material.lens != lens)
        .map(|(id, _)| id)
        .collect();
    for id in stale {
        if let Some(material) = materials.get_mut(id) {
            material.lens = lens;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask() -> LensMask {
        LensMask {
            active: true,
            origin: Vec2::new(0.2, -0.1),
            dir: Vec3::NEG_Z,
            radius: 0.47,
        }
    }

    #[test]
    fn covers_inside_circle_only() {
        let lens = LensUniform::from_mask(&mask(), 1.0);
        assert!(lens.covers(Vec2::new(0.2, -0.1)));
        assert!(lens.covers(Vec2::new(0.2, 0.35)));
        assert!(!lens.covers(Vec2::new(0.2, 0.4)));
    }

    #[test]
    fn aspect_keeps_lens_round_on_screen() {
        let lens = LensUniform::from_mask(&mask(), 2.0);
        assert!(!lens.covers(Vec2::new(0.2 + 0.3, -0.1)));
        assert!(lens.covers(Vec2::new(0.2 + 0.2, -0.1)));
    }

    #[test]
    fn inactive_lens_reveals_nothing() {
        let mut mask = mask();
        mask.active = false;
        let lens = LensUniform::from_mask(&mask, 1.0);
        assert!(!lens.covers(mask.origin));
    }
}
