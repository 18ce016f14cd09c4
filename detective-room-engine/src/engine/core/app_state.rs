use crate::engine::loading::progress::LoadingProgress;
use bevy::prelude::*;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States)]
pub enum AppState {
    #[default]
    Loading,
    Running,
}

/// Enter `Running` once the room config is in and the room has been spawned.
pub fn transition_to_running(
    loading_progress: Res<LoadingProgress>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    if loading_progress.ready() {
        info!("→ Room ready, transitioning to Running state");
        next_state.set(AppState::Running);
    }
}
