use crate::engine::systems::quality::{TuneCommand, TuneQueue};
use bevy::prelude::*;

#[cfg(not(target_arch = "wasm32"))]
use crate::engine::systems::quality::RenderQuality;

#[cfg(target_arch = "wasm32")]
use crate::engine::loading::texture_loader::TextureLoadingStatus;
#[cfg(target_arch = "wasm32")]
use crate::engine::systems::perf::PerfSnapshot;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// `window` property holding the latest perf snapshot.
pub const PERF_HOOK: &str = "__TT_DETECTIVE_PERF__";
/// `window` property holding the texture cache stats.
pub const TEXTURE_LOADING_HOOK: &str = "__TT_TEXTURE_LOADING__";
/// `window` property exposing `enablePerfMode()` and `setQuality(level)`.
pub const TUNE_HOOK: &str = "__TT_DETECTIVE_TUNE__";

/// Global debug hooks for automated perf runs (web) or function keys (native).
pub struct DebugHooksPlugin;

impl Plugin for DebugHooksPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TuneQueue>();

        #[cfg(target_arch = "wasm32")]
        app.add_systems(Startup, install_tune_hook)
            .add_systems(Update, (publish_perf_hook, publish_texture_loading_hook));

        #[cfg(not(target_arch = "wasm32"))]
        app.add_systems(Update, tune_from_function_keys);
    }
}

#[cfg(target_arch = "wasm32")]
fn set_window_property(name: &str, value: &JsValue) {
    let Some(window) = web_sys::window() else {
        return;
    };
    if let Err(err) = js_sys::Reflect::set(&window, &JsValue::from_str(name), value) {
        warn!("Failed to set window.{}: {:?}", name, err);
    }
}

/// Mirror a serializable value onto `window` as a plain JS object.
#[cfg(target_arch = "wasm32")]
fn publish_json<T: serde::Serialize>(name: &str, value: &T) {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(err) => {
            error!("Failed to serialise {}: {}", name, err);
            return;
        }
    };
    match js_sys::JSON::parse(&json) {
        Ok(object) => set_window_property(name, &object),
        Err(err) => warn!("Failed to parse {} for publication: {:?}", name, err),
    }
}

#[cfg(target_arch = "wasm32")]
fn publish_perf_hook(snapshot: Res<PerfSnapshot>) {
    if snapshot.is_changed() {
        publish_json(PERF_HOOK, &*snapshot);
    }
}

#[cfg(target_arch = "wasm32")]
fn publish_texture_loading_hook(status: Res<TextureLoadingStatus>) {
    if status.is_changed() {
        publish_json(TEXTURE_LOADING_HOOK, &status.0);
    }
}

#[cfg(target_arch = "wasm32")]
fn quality_from_js(level: &JsValue) -> Option<crate::engine::systems::quality::RenderQuality> {
    use crate::engine::systems::quality::RenderQuality;

    let parsed = if let Some(text) = level.as_string() {
        RenderQuality::parse(&text)
    } else if let Some(number) = level.as_f64() {
        RenderQuality::parse(&(number as i64).to_string())
    } else {
        RenderQuality::parse("")
    };
    parsed.map_err(|err| warn!("setQuality: {}", err)).ok()
}

#[cfg(target_arch = "wasm32")]
fn install_tune_hook(queue: Res<TuneQueue>) {
    let hook = js_sys::Object::new();

    // Callbacks only enqueue; the schedule applies them next frame.
    let perf_queue = queue.clone();
    let enable_perf_mode = Closure::<dyn FnMut()>::new(move || {
        perf_queue.push(TuneCommand::EnablePerfMode);
    });

    let quality_queue = queue.clone();
    let set_quality = Closure::<dyn FnMut(JsValue)>::new(move |level: JsValue| {
        if let Some(quality) = quality_from_js(&level) {
            quality_queue.push(TuneCommand::SetQuality(quality));
        }
    });

    for (name, function) in [
        ("enablePerfMode", enable_perf_mode.as_ref()),
        ("setQuality", set_quality.as_ref()),
    ] {
        if let Err(err) = js_sys::Reflect::set(&hook, &JsValue::from_str(name), function) {
            warn!("Failed to install {}.{}: {:?}", TUNE_HOOK, name, err);
        }
    }

    // Owned by JS from here on.
    enable_perf_mode.forget();
    set_quality.forget();

    set_window_property(TUNE_HOOK, &hook);
    info!("Installed window.{}", TUNE_HOOK);
}

/// F5/F6/F7 pick low/medium/high quality, F8 enables perf mode.
#[cfg(not(target_arch = "wasm32"))]
fn tune_from_function_keys(keys: Res<ButtonInput<KeyCode>>, queue: Res<TuneQueue>) {
    let command = if keys.just_pressed(KeyCode::F5) {
        TuneCommand::SetQuality(RenderQuality::Low)
    } else if keys.just_pressed(KeyCode::F6) {
        TuneCommand::SetQuality(RenderQuality::Medium)
    } else if keys.just_pressed(KeyCode::F7) {
        TuneCommand::SetQuality(RenderQuality::High)
    } else if keys.just_pressed(KeyCode::F8) {
        TuneCommand::EnablePerfMode
    } else {
        return;
    };
    queue.push(command);
}
