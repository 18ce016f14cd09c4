use crate::engine::assets::room_config::{PropConfig, PropInteraction, RoomConfig};
use crate::engine::camera::controller::RoomCamera;
use crate::engine::camera::free_look::FreeLook;
use crate::engine::camera::orientation::{OrientationTarget, look_rotation};
use crate::engine::camera::zoom::ZoomControl;
use crate::engine::loading::progress::LoadingProgress;
use crate::engine::loading::texture_cache::TextureOptions;
use crate::engine::loading::texture_loader::{SceneTextures, TextureSlot};
use crate::engine::render::id_pass::{Outlined, spawn_id_camera};
use crate::engine::render::lens_material::{LensUniform, RevealMaterial};
use crate::engine::render::outline_post_processing::OutlineSettings;
use crate::engine::render::pixelate_post_processing::PixelateSettings;
use crate::tools::container::ContainerMotion;
use crate::tools::inspect::Inspectable;
use crate::tools::magnifier::MagnifierPickup;
use crate::tools::ray::PickBounds;
use bevy::core_pipeline::prepass::{DepthPrepass, NormalPrepass};
use bevy::pbr::NotShadowCaster;
use bevy::prelude::*;
use bevy::ui::IsDefaultUiCamera;
use bevy::window::PrimaryWindow;
use constants::render_settings::{DEFAULT_OUTLINE_RGB, ID_LAYER};
use std::collections::HashMap;

const MAIN_CAMERA_ORDER: isize = 0;
const MAIN_ID_CAMERA_ORDER: isize = -2;

/// A spawned room prop, keyed by its config id.
#[derive(Component, Debug, Clone)]
pub struct Prop {
    pub id: String,
    pub parent: Option<String>,
}

/// Opening part a prop config contributes, if any.
///
/// Drawers animate themselves; a box animates its children (the lid).
fn container_motion(prop: &PropConfig, room: &RoomConfig) -> Option<ContainerMotion> {
    let depth = prop.shape.bounds().z;

    if let Some(PropInteraction::Container(container)) = &prop.interaction {
        if container.kind == "drawer" {
            let mut motion = ContainerMotion::drawer(&prop.id, prop.transform(), depth);
            if container.open {
                motion.progress = 1.0;
            }
            return Some(motion);
        }
        return None;
    }

    let parent = room.prop(prop.parent.as_deref()?)?;
    match &parent.interaction {
        Some(PropInteraction::Container(container)) if container.kind == "box" => {
            let mut motion = ContainerMotion::lid(&parent.id, prop.transform(), depth);
            if container.open {
                motion.progress = 1.0;
            }
            Some(motion)
        }
        _ => None,
    }
}

fn colour(rgb: [f32; 3]) -> Color {
    Color::srgb(rgb[0], rgb[1], rgb[2])
}

/// Spawn props and the main camera once the room config is in.
#[allow(clippy::too_many_arguments)]
pub fn spawn_room(
    mut commands: Commands,
    mut loading_progress: ResMut<LoadingProgress>,
    room: Option<Res<RoomConfig>>,
    mut textures: ResMut<SceneTextures>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut reveal_materials: ResMut<Assets<RevealMaterial>>,
    mut images: ResMut<Assets<Image>>,
    mut orientation: ResMut<OrientationTarget>,
    mut free_look: ResMut<FreeLook>,
    mut zoom: ResMut<ZoomControl>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    if !loading_progress.config_loaded || loading_progress.room_spawned {
        return;
    }
    let Some(room) = room else {
        return;
    };

    let mut spawned = HashMap::new();
    for prop in &room.props {
        let transform = prop.transform();
        let mesh = meshes.add(prop.shape.mesh());
        let mut entity = commands.spawn((
            Name::new(prop.id.clone()),
            Mesh3d(mesh),
            transform,
            Prop {
                id: prop.id.clone(),
                parent: prop.parent.clone(),
            },
        ));

        if prop.secret {
            // Only visible through the lens, so never pickable or outlined.
            entity.insert((
                MeshMaterial3d(reveal_materials.add(RevealMaterial {
                    lens: LensUniform::default(),
                    colour: colour(prop.colour).to_linear(),
                    texture: None,
                })),
                NotShadowCaster,
            ));
        } else {
            entity.insert((
                MeshMaterial3d(materials.add(StandardMaterial {
                    base_color: colour(prop.colour),
                    perceptual_roughness: 0.8,
                    ..default()
                })),
                PickBounds(prop.shape.bounds()),
                Outlined {
                    colour: Vec3::from_array(prop.outline.unwrap_or(DEFAULT_OUTLINE_RGB)),
                    id_layer: ID_LAYER,
                },
            ));
        }

        if let Some(url) = &prop.texture {
            let ticket = textures.acquire(url, TextureOptions::default());
            entity.insert(TextureSlot {
                url: url.clone(),
                ticket,
            });
        }

        match &prop.interaction {
            Some(PropInteraction::Inspect(inspect)) => {
                entity.insert(Inspectable(inspect.clone()));
            }
            Some(PropInteraction::Magnifier) => {
                entity.insert(MagnifierPickup);
            }
            Some(PropInteraction::Container(_)) | None => {}
        }

        if let Some(motion) = container_motion(prop, &room) {
            entity.insert(motion);
        }

        spawned.insert(prop.id.as_str(), entity.id());
    }

    for prop in &room.props {
        let Some(parent_id) = &prop.parent else {
            continue;
        };
        match (spawned.get(prop.id.as_str()), spawned.get(parent_id.as_str())) {
            (Some(&child), Some(&parent)) => {
                commands.entity(child).insert(ChildOf(parent));
            }
            _ => warn!("Prop {} names unknown parent {}", prop.id, parent_id),
        }
    }

    let eye = Vec3::from_array(room.camera.position);
    let look_at = Vec3::from_array(room.camera.look_at);
    let rotation = look_rotation(eye, look_at, Vec3::NEG_Z);

    let camera = commands
        .spawn((
            Camera3d::default(),
            Camera {
                order: MAIN_CAMERA_ORDER,
                ..default()
            },
            Projection::Perspective(PerspectiveProjection {
                fov: room.camera.fov_degrees.to_radians(),
                ..default()
            }),
            Transform::from_translation(eye).with_rotation(rotation),
            Msaa::Off,
            NormalPrepass,
            DepthPrepass,
            OutlineSettings::default(),
            PixelateSettings::default(),
            // The overlay camera renders last but is usually inactive.
            IsDefaultUiCamera,
            RoomCamera,
        ))
        .id();

    let size = windows
        .single()
        .map(|window| UVec2::new(window.physical_width(), window.physical_height()))
        .unwrap_or(UVec2::ONE);
    let id_target = spawn_id_camera(
        &mut commands,
        &mut images,
        camera,
        size,
        MAIN_ID_CAMERA_ORDER,
        ID_LAYER,
    );
    commands.entity(camera).insert(id_target);

    orientation.0 = rotation;
    free_look.sync_from(rotation);
    *zoom = ZoomControl::from_config(&room.camera);

    spawn_lighting(&mut commands);

    loading_progress.room_spawned = true;
    info!("✓ Room spawned: {} props", room.props.len());
}

fn spawn_lighting(commands: &mut Commands) {
    commands.insert_resource(AmbientLight {
        color: Color::srgb(1.0, 0.93, 0.82),
        brightness: 180.0,
        ..default()
    });

    commands.spawn((
        Name::new("Moonlight"),
        DirectionalLight {
            illuminance: 2_500.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::ZYX,
            0.0,
            1.0,
            -std::f32::consts::FRAC_PI_4,
        )),
    ));

    commands.spawn((
        Name::new("DeskLamp"),
        PointLight {
            color: Color::srgb(1.0, 0.85, 0.6),
            intensity: 120_000.0,
            range: 8.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(-0.6, 1.5, 0.3),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOM: &str = r#"{
        "camera": { "position": [0, 1.6, 3], "look_at": [0, 1, 0] },
        "props": [
            { "id": "desk", "shape": { "cuboid": [1.6, 0.08, 0.8] }, "position": [0, 0.75, 0] },
            { "id": "drawer", "shape": { "cuboid": [0.5, 0.12, 0.6] }, "position": [0, 0.6, 0],
              "interaction": { "container": { "kind": "drawer", "open": true } } },
            { "id": "box", "shape": { "cuboid": [0.4, 0.3, 0.4] }, "position": [1, 0.15, 1],
              "interaction": { "container": { "kind": "box" } } },
            { "id": "lid", "shape": { "cuboid": [0.42, 0.03, 0.42] }, "position": [0, 0.16, 0],
              "parent": "box" },
            { "id": "pen", "shape": { "cylinder": { "radius": 0.01, "height": 0.14 } },
              "position": [0, 0.1, 0], "parent": "drawer" }
        ]
    }"#;

    fn room() -> RoomConfig {
        RoomConfig::from_json(ROOM).expect("room parses")
    }

    #[test]
    fn drawer_moves_itself_and_starts_open() {
        let room = room();
        let drawer = room.prop("drawer").expect("drawer");
        let motion = container_motion(drawer, &room).expect("drawer motion");
        assert_eq!(motion.container_id, "drawer");
        assert_eq!(motion.progress, 1.0);
    }

    #[test]
    fn box_animates_its_lid_only() {
        let room = room();
        let lid = container_motion(room.prop("lid").expect("lid"), &room).expect("lid motion");
        assert_eq!(lid.container_id, "box");
        assert_eq!(lid.progress, 0.0);
        assert!(container_motion(room.prop("box").expect("box"), &room).is_none());
    }

    #[test]
    fn plain_props_and_drawer_contents_do_not_animate() {
        let room = room();
        assert!(container_motion(room.prop("desk").expect("desk"), &room).is_none());
        assert!(container_motion(room.prop("pen").expect("pen"), &room).is_none());
    }
}
