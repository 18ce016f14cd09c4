use crate::engine::loading::texture_cache::LoadingStats;
use crate::engine::loading::texture_loader::TextureLoadingStatus;
use bevy::prelude::*;

/// Loading milestones checked by the `Loading -> Running` transition.
///
/// Textures never gate the transition: the room renders untextured until
/// the cache resolves them.
#[derive(Resource, Default, Debug)]
pub struct LoadingProgress {
    pub config_loaded: bool,
    pub config_failed: bool,
    pub room_spawned: bool,
    pub textures: LoadingStats,
}

impl LoadingProgress {
    pub fn ready(&self) -> bool {
        self.config_loaded && self.room_spawned
    }
}

/// Keep the loading snapshot in step with the texture cache.
pub fn mirror_texture_progress(
    status: Res<TextureLoadingStatus>,
    mut loading_progress: ResMut<LoadingProgress>,
) {
    if status.is_changed() {
        loading_progress.textures = status.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_needs_config_and_room_only() {
        let mut progress = LoadingProgress {
            textures: LoadingStats {
                pending: 3,
                in_flight: 2,
                queued: 1,
            },
            ..default()
        };
        assert!(!progress.ready());
        progress.config_loaded = true;
        assert!(!progress.ready());
        progress.room_spawned = true;
        assert!(progress.ready());
    }
}
