use crate::engine::core::app_state::AppState;
use crate::rpc::web_rpc::WebRpcInterface;
use bevy::prelude::*;
use constants::render_settings::{PERF_PUBLISH_INTERVAL_SECS, PERF_SAMPLE_WINDOW};
use serde::Serialize;
use std::collections::VecDeque;

/// Rolling window of frame times in seconds.
#[derive(Resource, Debug, Clone)]
pub struct PerfSampler {
    frame_times: VecDeque<f32>,
    capacity: usize,
}

impl Default for PerfSampler {
    fn default() -> Self {
        Self::with_capacity(PERF_SAMPLE_WINDOW)
    }
}

impl PerfSampler {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frame_times: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, frame_time: f32) {
        if !frame_time.is_finite() || frame_time <= 0.0 {
            return;
        }
        if self.frame_times.len() == self.capacity {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(frame_time);
    }

    pub fn reset(&mut self) {
        self.frame_times.clear();
    }

    pub fn len(&self) -> usize {
        self.frame_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_times.is_empty()
    }

    /// Frames per second over the window.
    pub fn average_fps(&self) -> f32 {
        let total: f32 = self.frame_times.iter().sum();
        if total <= 0.0 {
            0.0
        } else {
            self.frame_times.len() as f32 / total
        }
    }

    /// Slowest frame in the window, in milliseconds.
    pub fn max_frame_time_ms(&self) -> f32 {
        self.frame_times.iter().copied().fold(0.0, f32::max) * 1000.0
    }
}

/// Published performance snapshot, shaped for the page's perf probes.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfSnapshot {
    pub avg_fps: f32,
    pub max_frame_time: f32,
    /// Visible meshes this frame; each is at least one draw.
    pub draw_calls: u32,
    pub geometries: u32,
    pub textures: u32,
    pub sample_count: u32,
}

impl PerfSnapshot {
    pub fn from_sampler(sampler: &PerfSampler, draw_calls: u32, geometries: u32, textures: u32) -> Self {
        Self {
            avg_fps: sampler.average_fps(),
            max_frame_time: sampler.max_frame_time_ms(),
            draw_calls,
            geometries,
            textures,
            sample_count: sampler.len() as u32,
        }
    }
}

#[derive(Component)]
pub struct FpsText;

pub struct PerfPlugin;

impl Plugin for PerfPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PerfSampler>()
            .init_resource::<PerfSnapshot>()
            .add_systems(
                Update,
                (sample_frame_time, publish_perf_snapshot)
                    .chain()
                    .run_if(in_state(AppState::Running)),
            );

        #[cfg(not(target_arch = "wasm32"))]
        {
            app.add_systems(Startup, spawn_fps_text)
                .add_systems(Update, fps_text_update_system);
        }
    }
}

pub fn sample_frame_time(time: Res<Time>, mut sampler: ResMut<PerfSampler>) {
    sampler.record(time.delta_secs());
}

pub fn publish_perf_snapshot(
    time: Res<Time>,
    mut last_send_time: Local<f32>,
    sampler: Res<PerfSampler>,
    mut snapshot: ResMut<PerfSnapshot>,
    mut rpc_interface: ResMut<WebRpcInterface>,
    meshes: Res<Assets<Mesh>>,
    images: Res<Assets<Image>>,
    visible: Query<&ViewVisibility, With<Mesh3d>>,
) {
    let current_time = time.elapsed_secs();
    if current_time - *last_send_time < PERF_PUBLISH_INTERVAL_SECS {
        return;
    }
    *last_send_time = current_time;

    let draw_calls = visible.iter().filter(|visibility| visibility.get()).count() as u32;
    *snapshot = PerfSnapshot::from_sampler(
        &sampler,
        draw_calls,
        meshes.len() as u32,
        images.len() as u32,
    );

    match serde_json::to_value(*snapshot) {
        Ok(params) => rpc_interface.send_notification("perf_update", params),
        Err(err) => warn!("Failed to serialise perf snapshot: {}", err),
    }
}

fn spawn_fps_text(mut commands: Commands) {
    commands.spawn((
        Text::new("FPS: "),
        TextFont {
            font_size: 14.0,
            ..default()
        },
        TextColor(Color::srgb(0.9, 0.3, 0.2)),
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(12.0),
            right: Val::Px(12.0),
            ..default()
        },
        FpsText,
    ));
}

pub fn fps_text_update_system(snapshot: Res<PerfSnapshot>, mut query: Query<&mut Text, With<FpsText>>) {
    if !snapshot.is_changed() {
        return;
    }
    for mut text in &mut query {
        text.0 = format!(
            "FPS: {:.1}  max {:.1} ms",
            snapshot.avg_fps, snapshot.max_frame_time
        );
    }
}
