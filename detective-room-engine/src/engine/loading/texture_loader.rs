use crate::engine::render::lens_material::RevealMaterial;
use crate::engine::loading::texture_cache::{
    LoadPoll, LoadingStats, ReleaseOutcome, TextureCache, TextureLoadError, TextureOptions,
    TextureSource, TextureTicket,
};
use bevy::asset::LoadState;
use bevy::image::{ImageAddressMode, ImageLoaderSettings, ImageSampler, ImageSamplerDescriptor};
use bevy::prelude::*;
use constants::texture::{MAX_CONCURRENT_TEXTURE_LOADS, TEXTURE_ROOT};
use std::sync::{Arc, Mutex};

/// Asset server backed loader. Pending loads are the strong handle itself.
pub struct AssetServerSource<'a> {
    pub server: &'a AssetServer,
    pub images: &'a mut Assets<Image>,
}

impl TextureSource for AssetServerSource<'_> {
    type Texture = Handle<Image>;
    type Pending = Handle<Image>;

    fn begin(&mut self, url: &str, options: &TextureOptions) -> Handle<Image> {
        let is_srgb = options.srgb;
        let repeat = options.repeat;
        self.server.load_with_settings(
            resolve_texture_path(url),
            move |settings: &mut ImageLoaderSettings| {
                settings.is_srgb = is_srgb;
                if repeat {
                    settings.sampler = ImageSampler::Descriptor(ImageSamplerDescriptor {
                        address_mode_u: ImageAddressMode::Repeat,
                        address_mode_v: ImageAddressMode::Repeat,
                        ..ImageSamplerDescriptor::linear()
                    });
                }
            },
        )
    }

    fn poll(&mut self, pending: &Handle<Image>) -> LoadPoll<Handle<Image>> {
        match self.server.get_load_state(pending) {
            Some(LoadState::Loaded) => LoadPoll::Ready(pending.clone()),
            Some(LoadState::Failed(err)) => LoadPoll::Failed(err.to_string()),
            _ => LoadPoll::Pending,
        }
    }

    fn dispose(&mut self, texture: Handle<Image>) {
        self.images.remove(&texture);
    }
}

/// Bare file names live under the texture root; anything with a directory is taken as-is.
pub fn resolve_texture_path(url: &str) -> String {
    let url = url.trim_start_matches('/');
    if url.contains('/') {
        url.to_string()
    } else {
        format!("{TEXTURE_ROOT}/{url}")
    }
}

/// Scene-wide texture cache plus the latest stats pushed by its subscriber.
#[derive(Resource)]
pub struct SceneTextures {
    cache: TextureCache<Handle<Image>, Handle<Image>>,
    latest_stats: Arc<Mutex<Option<LoadingStats>>>,
}

impl Default for SceneTextures {
    fn default() -> Self {
        let mut cache = TextureCache::new(MAX_CONCURRENT_TEXTURE_LOADS);
        let latest_stats = Arc::new(Mutex::new(None));
        let sink = latest_stats.clone();
        cache.subscribe(move |stats| {
            if let Ok(mut slot) = sink.lock() {
                *slot = Some(stats);
            }
        });
        Self {
            cache,
            latest_stats,
        }
    }
}

impl SceneTextures {
    pub fn acquire(&mut self, url: &str, options: TextureOptions) -> TextureTicket {
        self.cache.acquire(url, options)
    }

    /// Return the reference taken by `slot`. Failed slots hold nothing.
    pub fn release(
        &mut self,
        slot: &TextureSlot,
        server: &AssetServer,
        images: &mut Assets<Image>,
    ) -> ReleaseOutcome {
        let mut source = AssetServerSource { server, images };
        let outcome = self.cache.release_ticket(slot.ticket, &mut source);
        if outcome == ReleaseOutcome::Disposed {
            debug!("Disposed texture {}", slot.url);
        }
        outcome
    }

    pub fn get(&self, url: &str) -> Option<&Handle<Image>> {
        self.cache.get(url)
    }

    pub fn stats(&self) -> LoadingStats {
        self.cache.stats()
    }

    fn take_published_stats(&self) -> Option<LoadingStats> {
        self.latest_stats.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// Last stats reported by the cache, mirrored for RPC and debug hooks.
#[derive(Resource, Default, Debug, Clone, Copy)]
pub struct TextureLoadingStatus(pub LoadingStats);

/// One resolved acquire.
#[derive(Event, Debug, Clone)]
pub struct TextureLoaded {
    pub ticket: TextureTicket,
    pub url: String,
    pub result: Result<Handle<Image>, TextureLoadError>,
}

/// Prop material waiting for (or holding) a cached texture.
#[derive(Component, Debug, Clone)]
pub struct TextureSlot {
    pub url: String,
    pub ticket: TextureTicket,
}

pub fn pump_scene_textures(
    mut textures: ResMut<SceneTextures>,
    asset_server: Res<AssetServer>,
    mut images: ResMut<Assets<Image>>,
    mut loaded: EventWriter<TextureLoaded>,
    mut status: ResMut<TextureLoadingStatus>,
) {
    let mut source = AssetServerSource {
        server: &asset_server,
        images: &mut images,
    };
    let completions = textures.cache.pump(&mut source);

    for completion in completions {
        if let Err(err) = &completion.result {
            warn!("{}", err);
        }
        loaded.write(TextureLoaded {
            ticket: completion.ticket,
            url: completion.url,
            result: completion.result,
        });
    }

    if let Some(stats) = textures.take_published_stats() {
        status.0 = stats;
    }
}

pub fn apply_loaded_textures(
    mut events: EventReader<TextureLoaded>,
    slots: Query<(
        &TextureSlot,
        Option<&MeshMaterial3d<StandardMaterial>>,
        Option<&MeshMaterial3d<RevealMaterial>>,
    )>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut reveal_materials: ResMut<Assets<RevealMaterial>>,
) {
    for event in events.read() {
        let Ok(handle) = &event.result else {
            continue;
        };
        for (slot, standard, reveal) in &slots {
            if slot.ticket != event.ticket {
                continue;
            }
            if let Some(material) = standard.and_then(|m| materials.get_mut(&m.0)) {
                material.base_color_texture = Some(handle.clone());
            }
            if let Some(material) = reveal.and_then(|m| reveal_materials.get_mut(&m.0)) {
                material.texture = Some(handle.clone());
            }
        }
    }
}

/// Return references held by despawned props.
pub fn release_removed_texture_slots(
    mut removed: RemovedComponents<TextureSlot>,
    mut held: Local<Vec<(Entity, TextureSlot)>>,
    slots: Query<(Entity, &TextureSlot), Added<TextureSlot>>,
    mut textures: ResMut<SceneTextures>,
    asset_server: Res<AssetServer>,
    mut images: ResMut<Assets<Image>>,
) {
    for (entity, slot) in &slots {
        held.push((entity, slot.clone()));
    }

    for entity in removed.read() {
        if let Some(index) = held.iter().position(|(owner, _)| *owner == entity) {
            let (_, slot) = held.swap_remove(index);
            textures.release(&slot, &asset_server, &mut images);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_resolve_under_texture_root() {
        assert_eq!(resolve_texture_path("ledger.jpg"), "textures/ledger.jpg");
        assert_eq!(resolve_texture_path("/ledger.jpg"), "textures/ledger.jpg");
        assert_eq!(
            resolve_texture_path("/textures/photos/suspect.jpg"),
            "textures/photos/suspect.jpg"
        );
    }

    #[test]
    fn subscriber_publishes_stats_once() {
        let mut textures = SceneTextures::default();
        textures.acquire("a.jpg", TextureOptions::default());
        let stats = textures.take_published_stats().expect("stats pushed");
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(textures.take_published_stats(), None);
    }
}
