use crate::engine::render::outline::OutlineRegistry;
use bevy::{
    asset::RenderAssetUsages,
    core_pipeline::tonemapping::{DebandDither, Tonemapping},
    image::BevyDefault,
    prelude::*,
    render::{
        camera::RenderTarget,
        extract_component::ExtractComponent,
        render_resource::{
            AsBindGroup, Extent3d, ShaderRef, TextureDimension, TextureFormat, TextureUsages,
        },
        view::RenderLayers,
    },
    window::PrimaryWindow,
};

const OUTLINE_ID_SHADER_PATH: &str = "shaders/outline_id.wgsl";

/// Flat unlit material writing outline colour in RGB and the object id in alpha.
#[derive(Asset, TypePath, AsBindGroup, Debug, Clone)]
pub struct OutlineIdMaterial {
    #[uniform(0)]
    pub id_colour: LinearRgba,
}

impl Material for OutlineIdMaterial {
    fn fragment_shader() -> ShaderRef {
        OUTLINE_ID_SHADER_PATH.into()
    }
}

/// Marks a mesh entity that should be outlined by the camera drawing `id_layer`.
#[derive(Component, Debug, Clone, Copy)]
pub struct Outlined {
    pub colour: Vec3,
    pub id_layer: usize,
}

/// Child entity drawing the parent's mesh into the id buffer.
#[derive(Component, Debug)]
pub struct IdProxy;

/// Off-screen id buffer sampled by the composite pass of the owning camera.
#[derive(Component, Clone, ExtractComponent)]
pub struct OutlineIdTarget(pub Handle<Image>);

/// Camera rendering the flat id pass into an [`OutlineIdTarget`].
#[derive(Component, Debug)]
pub struct IdCamera;

pub fn create_id_image(width: u32, height: u32) -> Image {
    let size = Extent3d {
        width: width.max(1),
        height: height.max(1),
        ..default()
    };
    let mut image = Image::new_fill(
        size,
        TextureDimension::D2,
        &[0, 0, 0, 0],
        TextureFormat::bevy_default(),
        RenderAssetUsages::default(),
    );
    image.texture_descriptor.usage =
        TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST | TextureUsages::RENDER_ATTACHMENT;
    image
}

/// Spawn the id camera as a child of `parent` and return the id target to put on the parent.
///
/// The id camera renders first (`order` below the parent's) so the composite
/// node of the parent view samples a finished id buffer.
pub fn spawn_id_camera(
    commands: &mut Commands,
    images: &mut Assets<Image>,
    parent: Entity,
    size: UVec2,
    order: isize,
    id_layer: usize,
) -> OutlineIdTarget {
    let handle = images.add(create_id_image(size.x, size.y));

    commands.entity(parent).with_children(|children| {
        children.spawn((
            Camera3d::default(),
            Camera {
                order,
                target: RenderTarget::Image(handle.clone().into()),
                clear_color: ClearColorConfig::Custom(Color::NONE),
                ..default()
            },
            Msaa::Off,
            Tonemapping::None,
            DebandDither::Disabled,
            Transform::IDENTITY,
            RenderLayers::layer(id_layer),
            IdCamera,
        ));
    });

    OutlineIdTarget(handle)
}

/// Register newly outlined meshes and give each a flat id proxy.
pub fn attach_id_proxies(
    mut commands: Commands,
    mut registry: ResMut<OutlineRegistry>,
    mut id_materials: ResMut<Assets<OutlineIdMaterial>>,
    outlined: Query<(Entity, &Mesh3d, &Outlined), Added<Outlined>>,
) {
    for (entity, mesh, outlined) in &outlined {
        let style = registry.register(entity, outlined.colour);
        let material = id_materials.add(OutlineIdMaterial {
            id_colour: style.id_colour(),
        });

        commands.entity(entity).with_children(|children| {
            children.spawn((
                Mesh3d(mesh.0.clone()),
                MeshMaterial3d(material),
                Transform::IDENTITY,
                RenderLayers::layer(outlined.id_layer),
                IdProxy,
            ));
        });
    }
}

pub fn forget_removed_outlines(
    mut removed: RemovedComponents<Outlined>,
    mut registry: ResMut<OutlineRegistry>,
) {
    for entity in removed.read() {
        registry.remove(entity);
    }
}

/// Id cameras share their parent's projection so zoom keeps the buffers aligned.
pub fn sync_id_camera_projection(
    parents: Query<&Projection, (Without<IdCamera>, With<OutlineIdTarget>)>,
    mut id_cameras: Query<(&ChildOf, &mut Projection), With<IdCamera>>,
) {
    for (child_of, mut projection) in &mut id_cameras {
        if let Ok(parent_projection) = parents.get(child_of.parent()) {
            *projection = parent_projection.clone();
        }
    }
}

/// Keep every id buffer at the window's physical size.
///
/// Checked each frame in every state, so a resize that happens before the room
/// exists is still picked up.
pub fn resize_id_targets(
    windows: Query<&Window, With<PrimaryWindow>>,
    targets: Query<&OutlineIdTarget>,
    mut images: ResMut<Assets<Image>>,
) {
    let Ok(window) = windows.single() else {
        return;
    };

    let size = Extent3d {
        width: window.physical_width().max(1),
        height: window.physical_height().max(1),
        ..default()
    };
    for target in &targets {
        let stale = images
            .get(&target.0)
            .is_some_and(|image| image.texture_descriptor.size != size);
        if !stale {
            continue;
        }
        if let Some(image) = images.get_mut(&target.0) {
            image.resize(size);
        }
    }
}
