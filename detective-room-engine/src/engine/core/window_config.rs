use bevy::prelude::*;
use bevy::window::PresentMode;

/// Canvas the web build renders into.
pub const CANVAS_SELECTOR: &str = "#detective-room";

pub fn create_window_config() -> Window {
    #[cfg(target_arch = "wasm32")]
    {
        Window {
            canvas: Some(CANVAS_SELECTOR.into()),
            fit_canvas_to_parent: true,
            prevent_default_event_handling: true,
            present_mode: PresentMode::AutoVsync,
            ..default()
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        Window {
            title: "Detective Room".into(),
            present_mode: PresentMode::AutoVsync,
            ..default()
        }
    }
}
