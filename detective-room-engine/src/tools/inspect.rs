use crate::engine::assets::room_config::{InspectConfig, RoomConfig};
use crate::engine::camera::controller::RoomCamera;
use crate::engine::camera::move_to::MoveRequest;
use crate::engine::camera::orientation::damping_factor;
use crate::engine::loading::texture_cache::TextureOptions;
use crate::engine::loading::texture_loader::{SceneTextures, TextureSlot};
use crate::engine::render::id_pass::{Outlined, spawn_id_camera};
use crate::engine::render::outline_post_processing::OutlineSettings;
use crate::engine::render::pixelate_post_processing::PixelateSettings;
use crate::engine::scene::room::Prop;
use crate::tools::click::ClickTracker;
use crate::tools::container::toggle_container_for;
use crate::tools::magnifier::Magnifier;
use crate::tools::puzzle::{GameState, PuzzleSolved};
use crate::tools::ray::{PickBounds, cursor_ray, pick_nearest};
use bevy::core_pipeline::prepass::{DepthPrepass, NormalPrepass};
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use bevy::render::view::RenderLayers;
use bevy::window::PrimaryWindow;
use constants::interaction::{INSPECT_PROXY_DISTANCE, INSPECT_ROTATE_SENSITIVITY};
use constants::render_settings::{
    DEFAULT_OUTLINE_RGB, INSPECT_ID_LAYER, INSPECT_LAYER, INSPECT_PIXELATE_DAMPING,
};
use serde::Serialize;

/// Largest extent of an inspected proxy in front of the overlay camera.
const INSPECT_FIT_SIZE: f32 = 0.7;

/// Render order of the overlay and its id camera, above the room cameras.
const OVERLAY_CAMERA_ORDER: isize = 1;
const OVERLAY_ID_CAMERA_ORDER: isize = -1;

/// Marks a prop that opens the inspection overlay when clicked.
#[derive(Component, Debug, Clone)]
pub struct Inspectable(pub InspectConfig);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextPuzzle {
    pub id: String,
    pub title: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InspectMeta {
    pub prop_id: String,
    pub title: String,
    pub kind: Option<String>,
    pub puzzle: Option<TextPuzzle>,
    pub solved: bool,
    pub world_position: Vec3,
}

/// One mesh of an outlined inspection, positioned relative to the group centre.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectPart {
    pub mesh: Handle<Mesh>,
    pub material: Handle<StandardMaterial>,
    pub outline: Vec3,
    pub offset: Vec3,
    pub rotation: Quat,
    pub bounds: Vec3,
}

impl InspectPart {
    fn reach(&self) -> f32 {
        self.offset.length() + self.bounds.length() * 0.5
    }
}

/// What is being inspected.
#[derive(Debug, Clone, PartialEq)]
pub enum InspectState {
    /// Flat image shown on a quad.
    Framed {
        meta: InspectMeta,
        image: String,
        aspect: f32,
    },
    /// A single outlined mesh.
    Outlined { meta: InspectMeta, part: InspectPart },
    /// Several meshes inspected together.
    OutlinedGroup {
        meta: InspectMeta,
        parts: Vec<InspectPart>,
    },
}

impl InspectState {
    pub fn meta(&self) -> &InspectMeta {
        match self {
            Self::Framed { meta, .. }
            | Self::Outlined { meta, .. }
            | Self::OutlinedGroup { meta, .. } => meta,
        }
    }

    fn meta_mut(&mut self) -> &mut InspectMeta {
        match self {
            Self::Framed { meta, .. }
            | Self::Outlined { meta, .. }
            | Self::OutlinedGroup { meta, .. } => meta,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Framed { .. } => "framed",
            Self::Outlined { .. } => "outlined",
            Self::OutlinedGroup { .. } => "outlinedGroup",
        }
    }

    pub fn summary(&self) -> InspectSummary {
        let meta = self.meta();
        InspectSummary {
            state: self.kind_name(),
            prop_id: meta.prop_id.clone(),
            title: meta.title.clone(),
            kind: meta.kind.clone(),
            puzzle: meta.puzzle.as_ref().map(|puzzle| puzzle.id.clone()),
            solved: meta.solved,
            world_position: meta.world_position.to_array(),
        }
    }
}

/// Serializable view of an inspection for the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectSummary {
    pub state: &'static str,
    pub prop_id: String,
    pub title: String,
    pub kind: Option<String>,
    pub puzzle: Option<String>,
    pub solved: bool,
    pub world_position: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Correct,
    Incorrect,
    AlreadySolved,
    Pinned,
    AlreadyPinned,
    NotYetAvailable,
}

impl Feedback {
    pub fn text(&self) -> &'static str {
        match self {
            Self::Correct => "Correct",
            Self::Incorrect => "Incorrect",
            Self::AlreadySolved => "Already solved",
            Self::Pinned => "Pinned to the case board",
            Self::AlreadyPinned => "Already on the case board",
            Self::NotYetAvailable => "Nothing to pin yet",
        }
    }
}

/// The open inspection, if any, plus the answer being typed for it.
#[derive(Resource, Debug, Default)]
pub struct Inspection {
    current: Option<InspectState>,
    pub answer: String,
    pub feedback: Option<Feedback>,
}

impl Inspection {
    /// Open `state`, replacing and returning whatever was open before.
    pub fn open(&mut self, state: InspectState) -> Option<InspectState> {
        self.answer.clear();
        self.feedback = None;
        self.current.replace(state)
    }

    pub fn close(&mut self) -> Option<InspectState> {
        self.answer.clear();
        self.feedback = None;
        self.current.take()
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&InspectState> {
        self.current.as_ref()
    }

    pub fn puzzle(&self) -> Option<&TextPuzzle> {
        self.current.as_ref().and_then(|state| state.meta().puzzle.as_ref())
    }

    pub fn mark_solved(&mut self) {
        if let Some(state) = self.current.as_mut() {
            state.meta_mut().solved = true;
        }
    }
}

/// Fired whenever an inspection opens, closes or is replaced.
#[derive(Event, Debug, Clone)]
pub struct InspectChanged {
    pub summary: Option<InspectSummary>,
}

impl InspectChanged {
    pub fn from_state(state: Option<&InspectState>) -> Self {
        Self {
            summary: state.map(InspectState::summary),
        }
    }
}

/// Build the metadata for inspecting `prop_id`.
pub fn inspect_meta(
    prop_id: &str,
    inspect: &InspectConfig,
    room: &RoomConfig,
    game: &GameState,
    world_position: Vec3,
) -> InspectMeta {
    let puzzle = room.puzzles_anchored_at(prop_id).next();
    let solved = puzzle
        .and_then(|puzzle| game.status(&puzzle.id))
        .is_some_and(|status| status.solved);

    InspectMeta {
        prop_id: prop_id.to_string(),
        title: inspect.title.clone(),
        kind: inspect.kind.clone(),
        puzzle: puzzle.map(|puzzle| TextPuzzle {
            id: puzzle.id.clone(),
            title: puzzle.title.clone(),
            prompt: puzzle.prompt.clone(),
        }),
        solved,
        world_position,
    }
}

/// Centre a set of world-space parts on their mean position.
pub fn centre_parts(parts: &mut [InspectPart]) {
    if parts.is_empty() {
        return;
    }
    let centre = parts.iter().map(|part| part.offset).sum::<Vec3>() / parts.len() as f32;
    for part in parts.iter_mut() {
        part.offset -= centre;
    }
}

/// Uniform scale that fits the parts inside the overlay frame.
pub fn fit_scale(parts: &[InspectPart]) -> f32 {
    let reach = parts.iter().map(InspectPart::reach).fold(0.0, f32::max);
    if reach <= f32::EPSILON {
        1.0
    } else {
        INSPECT_FIT_SIZE * 0.5 / reach
    }
}

/// Camera drawing the inspected proxy over the pixelated room.
#[derive(Component, Debug)]
pub struct InspectOverlayCamera;

/// Parent of the inspected proxies; drag rotates it.
#[derive(Component, Debug)]
pub struct InspectRoot;

pub fn spawn_inspect_overlay(
    mut commands: Commands,
    mut images: ResMut<Assets<Image>>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let size = windows
        .single()
        .map(|window| UVec2::new(window.physical_width(), window.physical_height()))
        .unwrap_or(UVec2::ONE);

    let camera = commands
        .spawn((
            Camera3d::default(),
            Camera {
                order: OVERLAY_CAMERA_ORDER,
                is_active: false,
                clear_color: ClearColorConfig::None,
                ..default()
            },
            Msaa::Off,
            // The room below is already tonemapped.
            Tonemapping::None,
            NormalPrepass,
            DepthPrepass,
            OutlineSettings::default(),
            Transform::IDENTITY,
            RenderLayers::layer(INSPECT_LAYER),
            InspectOverlayCamera,
        ))
        .id();

    let id_target = spawn_id_camera(
        &mut commands,
        &mut images,
        camera,
        size,
        OVERLAY_ID_CAMERA_ORDER,
        INSPECT_ID_LAYER,
    );

    commands.entity(camera).insert(id_target).with_children(|children| {
        children.spawn((
            PointLight {
                intensity: 60_000.0,
                range: 10.0,
                ..default()
            },
            Transform::from_xyz(0.6, 0.8, 0.4),
            RenderLayers::layer(INSPECT_LAYER),
        ));
    });

    commands.spawn((
        Transform::from_xyz(0.0, 0.0, -INSPECT_PROXY_DISTANCE),
        Visibility::default(),
        RenderLayers::layer(INSPECT_LAYER),
        InspectRoot,
    ));
}

/// Open the inspection for a clicked prop, or toggle a clicked container.
#[allow(clippy::too_many_arguments)]
pub fn inspect_on_click(
    clicks: Res<ClickTracker>,
    magnifier: Res<Magnifier>,
    room: Res<RoomConfig>,
    mut game: ResMut<GameState>,
    mut inspection: ResMut<Inspection>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<RoomCamera>>,
    pickables: Query<(Entity, &GlobalTransform, &PickBounds)>,
    props: Query<(&Prop, Option<&Inspectable>)>,
    parts: Query<(
        &Prop,
        &GlobalTransform,
        &PickBounds,
        &Mesh3d,
        &MeshMaterial3d<StandardMaterial>,
        Option<&Outlined>,
    )>,
    mut moves: EventWriter<MoveRequest>,
    mut changed: EventWriter<InspectChanged>,
) {
    if clicks.clicked_at.is_none() || magnifier.claimed_click() || inspection.is_open() {
        return;
    }
    let (Ok(window), Ok((camera, camera_xf))) = (windows.single(), cameras.single()) else {
        return;
    };
    let Some((entity, _)) =
        cursor_ray(window, camera, camera_xf).and_then(|ray| pick_nearest(ray, &pickables))
    else {
        return;
    };
    let Ok((prop, inspectable)) = props.get(entity) else {
        return;
    };

    let Some(Inspectable(inspect)) = inspectable else {
        toggle_container_for(prop, &mut game);
        return;
    };

    let world_position = pickables
        .get(entity)
        .map(|(_, xf, _)| xf.translation())
        .unwrap_or_default();
    let meta = inspect_meta(&prop.id, inspect, &room, &game, world_position);

    let part_for = |id: &str| {
        parts
            .iter()
            .find(|(prop, ..)| prop.id == id)
            .map(|(_, xf, bounds, mesh, material, outlined)| {
                let (_, rotation, translation) = xf.to_scale_rotation_translation();
                InspectPart {
                    mesh: mesh.0.clone(),
                    material: material.0.clone(),
                    outline: outlined
                        .map(|outlined| outlined.colour)
                        .unwrap_or(Vec3::from_array(DEFAULT_OUTLINE_RGB)),
                    offset: translation,
                    rotation,
                    bounds: bounds.0,
                }
            })
    };

    let state = if let Some(image) = &inspect.image {
        InspectState::Framed {
            meta,
            image: image.clone(),
            aspect: inspect.aspect.unwrap_or(1.0).max(0.1),
        }
    } else if let Some(group) = inspect.group.as_ref().and_then(|id| room.group(id)) {
        let mut parts: Vec<_> = group.members.iter().filter_map(|id| part_for(id)).collect();
        centre_parts(&mut parts);
        InspectState::OutlinedGroup { meta, parts }
    } else if let Some(mut part) = part_for(&prop.id) {
        part.offset = Vec3::ZERO;
        InspectState::Outlined { meta, part }
    } else {
        warn!("Prop {} has nothing to inspect", prop.id);
        return;
    };

    for puzzle in room.puzzles_anchored_at(&prop.id) {
        match game.mark_available(&puzzle.id) {
            Ok(true) => info!("Puzzle {} is now available", puzzle.id),
            Ok(false) => {}
            Err(err) => warn!("{}", err),
        }
        if let Some(view) = puzzle.view {
            moves.write(MoveRequest {
                camera: Vec3::from_array(view.camera),
                look_at: Vec3::from_array(view.look_at),
            });
        }
    }

    info!("Inspecting {} ({})", prop.id, state.kind_name());
    inspection.open(state);
    changed.write(InspectChanged::from_state(inspection.current()));
}

/// Rebuild the overlay proxies whenever the inspection changes.
#[allow(clippy::too_many_arguments)]
pub fn sync_inspect_overlay(
    mut commands: Commands,
    mut events: EventReader<InspectChanged>,
    inspection: Res<Inspection>,
    mut textures: ResMut<SceneTextures>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut cameras: Query<&mut Camera, With<InspectOverlayCamera>>,
    mut roots: Query<(Entity, &mut Transform), With<InspectRoot>>,
) {
    if events.read().last().is_none() {
        return;
    }
    let Ok((root, mut root_transform)) = roots.single_mut() else {
        return;
    };

    commands.entity(root).despawn_related::<Children>();
    root_transform.rotation = Quat::IDENTITY;

    if let Ok(mut camera) = cameras.single_mut() {
        camera.is_active = inspection.is_open();
    }

    let Some(state) = inspection.current() else {
        return;
    };

    let layer = RenderLayers::layer(INSPECT_LAYER);
    match state {
        InspectState::Framed { image, aspect, .. } => {
            let height = INSPECT_FIT_SIZE / aspect.max(1.0);
            let ticket = textures.acquire(image, TextureOptions::default());
            let material = materials.add(StandardMaterial {
                base_color: Color::WHITE,
                unlit: true,
                double_sided: true,
                cull_mode: None,
                ..default()
            });
            commands.entity(root).with_children(|children| {
                children.spawn((
                    Mesh3d(meshes.add(Rectangle::new(height * aspect, height))),
                    MeshMaterial3d(material),
                    Transform::IDENTITY,
                    layer.clone(),
                    TextureSlot {
                        url: image.clone(),
                        ticket,
                    },
                ));
            });
        }
        InspectState::Outlined { part, .. } => {
            spawn_parts(&mut commands, root, std::slice::from_ref(part), &layer);
        }
        InspectState::OutlinedGroup { parts, .. } => {
            spawn_parts(&mut commands, root, parts, &layer);
        }
    }
}

fn spawn_parts(commands: &mut Commands, root: Entity, parts: &[InspectPart], layer: &RenderLayers) {
    let scale = fit_scale(parts);
    commands.entity(root).with_children(|children| {
        for part in parts {
            children.spawn((
                Mesh3d(part.mesh.clone()),
                MeshMaterial3d(part.material.clone()),
                Transform {
                    translation: part.offset * scale,
                    rotation: part.rotation,
                    scale: Vec3::splat(scale),
                },
                layer.clone(),
                Outlined {
                    colour: part.outline,
                    id_layer: INSPECT_ID_LAYER,
                },
            ));
        }
    });
}

/// Dragging while inspecting turns the proxy instead of the room camera.
pub fn rotate_inspected(
    inspection: Res<Inspection>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut roots: Query<&mut Transform, With<InspectRoot>>,
) {
    let delta: Vec2 = mouse_motion.read().map(|motion| motion.delta).sum();
    if !inspection.is_open() || !mouse_button.pressed(MouseButton::Left) || delta == Vec2::ZERO {
        return;
    }
    let Ok(mut transform) = roots.single_mut() else {
        return;
    };

    let yaw = Quat::from_rotation_y(delta.x * INSPECT_ROTATE_SENSITIVITY);
    let pitch = Quat::from_rotation_x(delta.y * INSPECT_ROTATE_SENSITIVITY);
    transform.rotation = (yaw * pitch * transform.rotation).normalize();
}

/// Ease the room pixelation in while an inspection is open.
pub fn ramp_pixelation(
    time: Res<Time>,
    inspection: Res<Inspection>,
    mut cameras: Query<&mut PixelateSettings, With<RoomCamera>>,
) {
    let target = if inspection.is_open() { 1.0 } else { 0.0 };
    let t = damping_factor(INSPECT_PIXELATE_DAMPING, time.delta_secs());

    for mut settings in &mut cameras {
        let strength = settings.strength + (target - settings.strength) * t;
        let strength = if (target - strength).abs() < 1e-3 {
            target
        } else {
            strength
        };
        if settings.strength != strength {
            settings.strength = strength;
        }
    }
}

/// Reflect solves from any source (panel, keyboard or RPC) on the open inspection.
pub fn mark_inspection_solved(
    mut solved: EventReader<PuzzleSolved>,
    mut inspection: ResMut<Inspection>,
) {
    for event in solved.read() {
        let matches = inspection
            .puzzle()
            .is_some_and(|puzzle| puzzle.id == event.id);
        if matches && !inspection.current().is_some_and(|state| state.meta().solved) {
            inspection.mark_solved();
        }
    }
}
