use crate::engine::assets::room_config::{CameraConfig, ZoomMode};
use bevy::input::mouse::MouseScrollUnit;
use bevy::prelude::*;
use constants::camera::{
    DEFAULT_FOV_MAX_DEG, DEFAULT_FOV_MIN_DEG, DOLLY_MAX_DISTANCE, SCROLL_PIXELS_PER_LINE,
    ZOOM_DOLLY_STEP, ZOOM_FOV_STEP_DEG,
};

/// Scroll-wheel zoom, either narrowing the FOV or dollying forward.
#[derive(Resource, Debug, Clone)]
pub struct ZoomControl {
    pub enabled: bool,
    pub mode: ZoomMode,
    /// Radians.
    pub fov_min: f32,
    pub fov_max: f32,
    pub speed: f32,
    /// Current forward dolly offset, kept within `[0, DOLLY_MAX_DISTANCE]`.
    pub dolly: f32,
}

impl Default for ZoomControl {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: ZoomMode::Fov,
            fov_min: DEFAULT_FOV_MIN_DEG.to_radians(),
            fov_max: DEFAULT_FOV_MAX_DEG.to_radians(),
            speed: 1.0,
            dolly: 0.0,
        }
    }
}

impl ZoomControl {
    pub fn from_config(camera: &CameraConfig) -> Self {
        Self {
            enabled: camera.zoom_enabled,
            mode: camera.zoom_mode,
            fov_min: camera.fov_min_degrees.to_radians(),
            fov_max: camera.fov_max_degrees.to_radians(),
            ..default()
        }
    }

    /// New FOV after scrolling `lines` (positive zooms in).
    pub fn apply_fov(&self, fov: f32, lines: f32) -> f32 {
        if !self.enabled {
            return fov;
        }
        let next = fov - lines * ZOOM_FOV_STEP_DEG.to_radians() * self.speed;
        if next.is_finite() {
            next.clamp(self.fov_min, self.fov_max)
        } else {
            fov.clamp(self.fov_min, self.fov_max)
        }
    }

    /// Distance to move along the camera forward for `lines` of scroll.
    pub fn apply_dolly(&mut self, lines: f32) -> f32 {
        if !self.enabled {
            return 0.0;
        }
        let next = (self.dolly + lines * ZOOM_DOLLY_STEP * self.speed).clamp(0.0, DOLLY_MAX_DISTANCE);
        let moved = next - self.dolly;
        self.dolly = next;
        moved
    }
}

/// Scroll amount in lines for either unit.
pub fn scroll_lines(unit: MouseScrollUnit, y: f32) -> f32 {
    match unit {
        MouseScrollUnit::Line => y,
        MouseScrollUnit::Pixel => y / SCROLL_PIXELS_PER_LINE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fov_stays_in_range_for_any_scroll() {
        let zoom = ZoomControl::default();
        let fov = 55f32.to_radians();
        for lines in [1e9, -1e9, 3.0, -3.0, f32::MAX, f32::MIN] {
            let next = zoom.apply_fov(fov, lines);
            assert!(next >= zoom.fov_min && next <= zoom.fov_max, "{lines} -> {next}");
        }
        assert_eq!(zoom.apply_fov(fov, 1e9), zoom.fov_min);
        assert_eq!(zoom.apply_fov(fov, -1e9), zoom.fov_max);
    }

    #[test]
    fn disabled_zoom_leaves_fov_unchanged() {
        let zoom = ZoomControl {
            enabled: false,
            ..default()
        };
        let fov = 55f32.to_radians();
        assert_eq!(zoom.apply_fov(fov, 40.0), fov);
    }

    #[test]
    fn dolly_is_bounded() {
        let mut zoom = ZoomControl {
            mode: ZoomMode::Dolly,
            ..default()
        };
        assert_eq!(zoom.apply_dolly(-5.0), 0.0);
        let forward = zoom.apply_dolly(1000.0);
        assert!((forward - DOLLY_MAX_DISTANCE).abs() < 1e-6);
        assert!((zoom.apply_dolly(-1.0) + ZOOM_DOLLY_STEP).abs() < 1e-6);
    }

    #[test]
    fn pixel_scroll_is_normalised_to_lines() {
        assert_eq!(scroll_lines(MouseScrollUnit::Line, 2.0), 2.0);
        assert_eq!(
            scroll_lines(MouseScrollUnit::Pixel, SCROLL_PIXELS_PER_LINE * 3.0),
            3.0
        );
    }
}
