/// Room description loaded at startup.
pub const ROOM_CONFIG_PATH: &str = "config/room.json";

/// localStorage key for the dismissed onboarding hint.
pub const HINT_STORAGE_KEY: &str = "tt-detective-hint-dismissed";

/// Seconds a container lid or drawer takes to open.
pub const CONTAINER_OPEN_SECS: f32 = 0.6;

pub struct ContainerKindInfo {
    pub id: &'static str,
    pub name: &'static str,
}

pub const CONTAINER_KINDS: &[ContainerKindInfo] = &[
    ContainerKindInfo {
        id: "box",
        name: "box",
    },
    ContainerKindInfo {
        id: "drawer",
        name: "desk drawer",
    },
];

pub fn get_container_kind_name(id: &str) -> String {
    CONTAINER_KINDS
        .iter()
        .find(|c| c.id == id)
        .map_or("container", |c| c.name)
        .to_string()
}
