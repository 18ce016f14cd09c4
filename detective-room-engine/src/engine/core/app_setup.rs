use bevy::asset::AssetMetaCheck;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy_common_assets::json::JsonAssetPlugin;
// Crate engine modules
use crate::engine::assets::room_config::{RoomConfig, RoomConfigHandle};
use crate::engine::camera::controller::CameraControllerPlugin;
use crate::engine::core::app_state::{AppState, transition_to_running};
use crate::engine::core::window_config::create_window_config;
use crate::engine::loading::config_loader::{load_room_config_system, start_loading};
use crate::engine::loading::progress::{LoadingProgress, mirror_texture_progress};
use crate::engine::loading::texture_loader::{
    SceneTextures, TextureLoaded, TextureLoadingStatus, apply_loaded_textures,
    pump_scene_textures, release_removed_texture_slots,
};
use crate::engine::render::lens_material::RevealMaterial;
use crate::engine::render::outline_post_processing::OutlinePostProcessPlugin;
use crate::engine::render::pixelate_post_processing::PixelatePostProcessPlugin;
use crate::engine::scene::room::spawn_room;
use crate::engine::systems::perf::PerfPlugin;
// Crate tools modules
use crate::tools::interaction::InteractionPlugin;
// Web RPC and debug hooks
use crate::rpc::debug_hooks::DebugHooksPlugin;
use crate::rpc::web_rpc::WebRpcPlugin;

const LOG_FILTER: &str = "wgpu=error,naga=warn,detective_room_engine=info";

pub fn create_app() -> App {
    let mut app = App::new();

    app.add_plugins(create_default_plugins())
        .init_state::<AppState>()
        // Registers RoomConfig as a loadable asset type from JSON files.
        .add_plugins(JsonAssetPlugin::<RoomConfig>::new(&["json"]))
        .add_plugins(MaterialPlugin::<RevealMaterial>::default())
        .add_plugins(OutlinePostProcessPlugin)
        .add_plugins(PixelatePostProcessPlugin)
        .add_plugins(CameraControllerPlugin)
        .add_plugins(InteractionPlugin)
        .add_plugins(PerfPlugin)
        .add_plugins(DebugHooksPlugin)
        .add_plugins(WebRpcPlugin);

    // Initialise resources early
    app.init_resource::<LoadingProgress>()
        .init_resource::<RoomConfigHandle>()
        .init_resource::<SceneTextures>()
        .init_resource::<TextureLoadingStatus>()
        .add_event::<TextureLoaded>()
        .insert_resource(ClearColor(Color::srgb(0.05, 0.045, 0.04)));

    // State-based system scheduling
    app.add_systems(Startup, start_loading)
        .add_systems(
            Update,
            (load_room_config_system, spawn_room, transition_to_running)
                .chain()
                .run_if(in_state(AppState::Loading)),
        );

    // Textures stream in both states and never gate the transition.
    app.add_systems(
        Update,
        (
            pump_scene_textures,
            apply_loaded_textures,
            release_removed_texture_slots,
            mirror_texture_progress,
        )
            .chain(),
    );

    app
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    let log_config = LogPlugin {
        filter: LOG_FILTER.into(),
        ..default()
    };

    DefaultPlugins
        .set(window_config)
        .set(asset_config)
        .set(log_config)
}
