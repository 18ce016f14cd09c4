use bevy::input::keyboard::KeyboardInput;
use bevy::prelude::*;
use constants::room::HINT_STORAGE_KEY;

/// Where the "hint dismissed" flag lives between sessions.
pub trait HintStore: Send + Sync {
    fn is_dismissed(&self) -> bool;
    fn dismiss(&mut self);
}

/// Session-only store used by native builds and tests.
#[derive(Debug, Default)]
pub struct MemoryHintStore {
    dismissed: bool,
}

impl HintStore for MemoryHintStore {
    fn is_dismissed(&self) -> bool {
        self.dismissed
    }

    fn dismiss(&mut self) {
        self.dismissed = true;
    }
}

/// Browser `localStorage` store. Storage errors read as "not dismissed".
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
pub struct LocalStorageHintStore;

#[cfg(target_arch = "wasm32")]
impl LocalStorageHintStore {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok().flatten()
    }
}

#[cfg(target_arch = "wasm32")]
impl HintStore for LocalStorageHintStore {
    fn is_dismissed(&self) -> bool {
        Self::storage()
            .and_then(|storage| storage.get_item(HINT_STORAGE_KEY).ok().flatten())
            .is_some_and(|value| value == "1")
    }

    fn dismiss(&mut self) {
        if let Some(storage) = Self::storage() {
            if storage.set_item(HINT_STORAGE_KEY, "1").is_err() {
                warn!("Could not persist {}", HINT_STORAGE_KEY);
            }
        }
    }
}

/// One-time onboarding hint.
#[derive(Resource)]
pub struct OnboardingHint {
    store: Box<dyn HintStore>,
    visible: bool,
}

impl Default for OnboardingHint {
    fn default() -> Self {
        #[cfg(target_arch = "wasm32")]
        let store: Box<dyn HintStore> = Box::new(LocalStorageHintStore);
        #[cfg(not(target_arch = "wasm32"))]
        let store: Box<dyn HintStore> = Box::new(MemoryHintStore::default());
        Self::with_store(store)
    }
}

impl OnboardingHint {
    pub fn with_store(store: Box<dyn HintStore>) -> Self {
        let visible = !store.is_dismissed();
        Self { store, visible }
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Hide the hint for good. Returns true the first time only.
    pub fn dismiss(&mut self) -> bool {
        if !self.visible {
            return false;
        }
        self.visible = false;
        self.store.dismiss();
        true
    }
}

/// First click, drag or `H` dismisses the hint.
pub fn dismiss_hint_on_input(
    mut hint: ResMut<OnboardingHint>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut keys: EventReader<KeyboardInput>,
) {
    let pressed_h = keys
        .read()
        .any(|event| event.state.is_pressed() && event.key_code == KeyCode::KeyH);

    if !hint.visible() {
        return;
    }
    if (pressed_h || mouse_button.just_pressed(MouseButton::Left)) && hint.dismiss() {
        debug!("Onboarding hint dismissed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_shows_until_dismissed_once() {
        let mut hint = OnboardingHint::with_store(Box::new(MemoryHintStore::default()));
        assert!(hint.visible());
        assert!(hint.dismiss());
        assert!(!hint.visible());
        assert!(!hint.dismiss());
    }

    #[test]
    fn dismissed_store_starts_hidden() {
        let mut store = MemoryHintStore::default();
        store.dismiss();
        let hint = OnboardingHint::with_store(Box::new(store));
        assert!(!hint.visible());
    }
}
