use crate::engine::assets::room_config::{RoomConfig, RoomConfigHandle};
use crate::engine::loading::progress::LoadingProgress;
use crate::tools::puzzle::GameState;
use bevy::asset::LoadState;
use bevy::prelude::*;
use constants::room::ROOM_CONFIG_PATH;

// Start the loading process
pub fn start_loading(mut config_handle: ResMut<RoomConfigHandle>, asset_server: Res<AssetServer>) {
    info!("Loading room config from {}", ROOM_CONFIG_PATH);
    config_handle.handle = Some(asset_server.load(ROOM_CONFIG_PATH));
}

/// Validate the loaded room and publish it with a fresh game state.
pub fn load_room_config_system(
    mut loading_progress: ResMut<LoadingProgress>,
    config_handle: Res<RoomConfigHandle>,
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    configs: Res<Assets<RoomConfig>>,
) {
    if loading_progress.config_loaded || loading_progress.config_failed {
        return;
    }

    let Some(handle) = &config_handle.handle else {
        return;
    };

    if let Some(LoadState::Failed(err)) = asset_server.get_load_state(handle) {
        error!("Room config failed to load: {}", err);
        loading_progress.config_failed = true;
        return;
    }

    let Some(room) = configs.get(handle) else {
        return;
    };

    let game = match room.validate().and_then(|_| GameState::from_config(room)) {
        Ok(game) => game,
        Err(err) => {
            error!("Room config rejected: {}", err);
            loading_progress.config_failed = true;
            return;
        }
    };

    info!(
        "✓ Room config loaded: {} props, {} puzzles",
        room.props.len(),
        room.puzzles.len()
    );
    commands.insert_resource(room.clone());
    commands.insert_resource(game);
    loading_progress.config_loaded = true;
}
