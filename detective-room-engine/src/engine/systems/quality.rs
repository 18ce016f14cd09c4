use crate::engine::camera::controller::RoomCamera;
use crate::engine::render::outline_post_processing::OutlineSettings;
use crate::engine::systems::perf::PerfSampler;
use bevy::prelude::*;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown quality level `{0}`")]
pub struct UnknownQuality(pub String);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderQuality {
    Low,
    Medium,
    #[default]
    High,
}

impl RenderQuality {
    /// Accepts `low`/`medium`/`high` (any case) or `0`/`1`/`2`.
    pub fn parse(level: &str) -> Result<Self, UnknownQuality> {
        match level.trim().to_lowercase().as_str() {
            "low" | "0" => Ok(Self::Low),
            "medium" | "1" => Ok(Self::Medium),
            "high" | "2" => Ok(Self::High),
            _ => Err(UnknownQuality(level.to_string())),
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, UnknownQuality> {
        match value {
            serde_json::Value::String(level) => Self::parse(level),
            serde_json::Value::Number(level) => Self::parse(&level.to_string()),
            other => Err(UnknownQuality(other.to_string())),
        }
    }

    pub fn outlines(&self) -> bool {
        !matches!(self, Self::Low)
    }

    pub fn shadows(&self) -> bool {
        matches!(self, Self::High)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuneCommand {
    /// Drop to the cheapest settings and restart perf sampling.
    EnablePerfMode,
    SetQuality(RenderQuality),
}

/// Current render quality. Changing it is picked up by [`apply_render_quality`].
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualitySettings {
    pub quality: RenderQuality,
    pub perf_mode: bool,
}

impl QualitySettings {
    pub fn apply(&mut self, command: TuneCommand) {
        match command {
            TuneCommand::EnablePerfMode => {
                self.quality = RenderQuality::Low;
                self.perf_mode = true;
            }
            TuneCommand::SetQuality(quality) => self.quality = quality,
        }
    }
}

/// Commands pushed from outside the schedule (JS hooks, RPC).
#[derive(Resource, Clone, Default)]
pub struct TuneQueue(pub Arc<Mutex<Vec<TuneCommand>>>);

impl TuneQueue {
    pub fn push(&self, command: TuneCommand) {
        if let Ok(mut queue) = self.0.lock() {
            queue.push(command);
        }
    }

    pub fn drain(&self) -> Vec<TuneCommand> {
        self.0
            .lock()
            .map(|mut queue| std::mem::take(&mut *queue))
            .unwrap_or_default()
    }
}

pub fn drain_tune_commands(
    queue: Res<TuneQueue>,
    mut settings: ResMut<QualitySettings>,
    mut sampler: ResMut<PerfSampler>,
) {
    for command in queue.drain() {
        info!("Tune command {:?}", command);
        settings.apply(command);
        if command == TuneCommand::EnablePerfMode {
            sampler.reset();
        }
    }
}

pub fn apply_render_quality(
    settings: Res<QualitySettings>,
    mut cameras: Query<&mut OutlineSettings, With<RoomCamera>>,
    mut lights: Query<&mut DirectionalLight>,
) {
    if !settings.is_changed() {
        return;
    }

    let quality = settings.quality;
    for mut outline in &mut cameras {
        outline.enabled = if quality.outlines() { 1.0 } else { 0.0 };
    }
    for mut light in &mut lights {
        light.shadows_enabled = quality.shadows();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_numbers() {
        assert_eq!(RenderQuality::parse("LOW"), Ok(RenderQuality::Low));
        assert_eq!(RenderQuality::parse("1"), Ok(RenderQuality::Medium));
        assert_eq!(
            RenderQuality::from_json(&serde_json::json!(2)),
            Ok(RenderQuality::High)
        );
        assert_eq!(
            RenderQuality::from_json(&serde_json::json!("ultra")),
            Err(UnknownQuality("ultra".into()))
        );
    }

    #[test]
    fn levels_gate_outlines_and_shadows() {
        assert!(!RenderQuality::Low.outlines());
        assert!(RenderQuality::Medium.outlines() && !RenderQuality::Medium.shadows());
        assert!(RenderQuality::High.shadows());
    }

    #[test]
    fn perf_mode_forces_low() {
        let mut settings = QualitySettings::default();
        settings.apply(TuneCommand::EnablePerfMode);
        assert_eq!(settings.quality, RenderQuality::Low);
        assert!(settings.perf_mode);
    }

    #[test]
    fn queue_drains_in_order() {
        let queue = TuneQueue::default();
        queue.push(TuneCommand::SetQuality(RenderQuality::Medium));
        queue.push(TuneCommand::EnablePerfMode);
        assert_eq!(
            queue.drain(),
            vec![
                TuneCommand::SetQuality(RenderQuality::Medium),
                TuneCommand::EnablePerfMode
            ]
        );
        assert!(queue.drain().is_empty());
    }
}
