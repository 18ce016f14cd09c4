use crate::engine::core::app_state::AppState;
use crate::engine::render::id_pass::{
    OutlineIdMaterial, OutlineIdTarget, attach_id_proxies, forget_removed_outlines,
    resize_id_targets, sync_id_camera_projection,
};
use crate::engine::render::outline::OutlineRegistry;
use bevy::{
    core_pipeline::{
        core_3d::graph::{Core3d, Node3d},
        fullscreen_vertex_shader::fullscreen_shader_vertex_state,
        prepass::ViewPrepassTextures,
    },
    ecs::query::QueryItem,
    image::BevyDefault,
    prelude::*,
    render::{
        RenderApp,
        extract_component::{
            ComponentUniforms, DynamicUniformIndex, ExtractComponent, ExtractComponentPlugin,
            UniformComponentPlugin,
        },
        render_asset::RenderAssets,
        render_graph::{
            NodeRunError, RenderGraphApp, RenderGraphContext, RenderLabel, ViewNode, ViewNodeRunner,
        },
        render_resource::{
            binding_types::{texture_2d, uniform_buffer},
            *,
        },
        renderer::{RenderContext, RenderDevice},
        texture::GpuImage,
        view::ViewTarget,
    },
};
use constants::render_settings::{
    OUTLINE_ID_THRESHOLD, OUTLINE_NORMAL_THRESHOLD, OUTLINE_THICKNESS_PX,
};

const OUTLINE_SHADER_PATH: &str = "shaders/outline_composite.wgsl";

pub struct OutlinePostProcessPlugin;

impl Plugin for OutlinePostProcessPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            MaterialPlugin::<OutlineIdMaterial>::default(),
            ExtractComponentPlugin::<OutlineSettings>::default(),
            UniformComponentPlugin::<OutlineSettings>::default(),
            ExtractComponentPlugin::<OutlineIdTarget>::default(),
        ))
        .init_resource::<OutlineRegistry>()
        .add_systems(
            Update,
            (
                (
                    attach_id_proxies,
                    forget_removed_outlines,
                    sync_id_camera_projection,
                )
                    .run_if(in_state(AppState::Running)),
                resize_id_targets,
            ),
        );

        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app
            .add_render_graph_node::<ViewNodeRunner<OutlinePostProcessNode>>(
                Core3d,
                OutlinePostProcessLabel,
            )
            .add_render_graph_edges(
                Core3d,
                (
                    Node3d::Tonemapping,
                    OutlinePostProcessLabel,
                    Node3d::EndMainPassPostProcessing,
                ),
            );
    }

    fn finish(&self, app: &mut App) {
        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app.init_resource::<OutlinePostProcessPipeline>();
    }
}

#[derive(Debug, Hash, PartialEq, Eq, Clone, RenderLabel)]
pub struct OutlinePostProcessLabel;

/// Edge thresholds for a view. `enabled` is 0 or 1 (uniforms have no bool).
#[derive(Component, Clone, Copy, ExtractComponent, ShaderType)]
pub struct OutlineSettings {
    pub normal_threshold: f32,
    pub id_threshold: f32,
    pub thickness: f32,
    pub enabled: f32,
}

impl Default for OutlineSettings {
    fn default() -> Self {
        Self {
            normal_threshold: OUTLINE_NORMAL_THRESHOLD,
            id_threshold: OUTLINE_ID_THRESHOLD,
            thickness: OUTLINE_THICKNESS_PX,
            enabled: 1.0,
        }
    }
}

#[derive(Default)]
struct OutlinePostProcessNode;

impl ViewNode for OutlinePostProcessNode {
    type ViewQuery = (
        &'static ViewTarget,
        &'static ViewPrepassTextures,
        &'static OutlineIdTarget,
        &'static OutlineSettings,
        &'static DynamicUniformIndex<OutlineSettings>,
    );

    fn run(
        &self,
        _graph: &mut RenderGraphContext,
        render_context: &mut RenderContext,
        (view_target, prepass_textures, id_target, _settings, settings_index): QueryItem<
            Self::ViewQuery,
        >,
        world: &World,
    ) -> Result<(), NodeRunError> {
        let outline_pipeline = world.resource::<OutlinePostProcessPipeline>();
        let pipeline_cache = world.resource::<PipelineCache>();

        let Some(pipeline) = pipeline_cache.get_render_pipeline(outline_pipeline.pipeline_id)
        else {
            return Ok(());
        };

        let settings_uniforms = world.resource::<ComponentUniforms<OutlineSettings>>();
        let Some(settings_binding) = settings_uniforms.uniforms().binding() else {
            return Ok(());
        };

        // Both auxiliary buffers must exist; until then the lit colour is left untouched.
        let Some(normal_view) = prepass_textures.normal_view() else {
            return Ok(());
        };
        let gpu_images = world.resource::<RenderAssets<GpuImage>>();
        let Some(id_image) = gpu_images.get(&id_target.0) else {
            return Ok(());
        };

        let post_process = view_target.post_process_write();

        let bind_group = render_context.render_device().create_bind_group(
            "outline_post_process_bind_group",
            &outline_pipeline.layout,
            &BindGroupEntries::sequential((
                post_process.source,
                normal_view,
                &id_image.texture_view,
                settings_binding.clone(),
            )),
        );

        let mut render_pass = render_context.begin_tracked_render_pass(RenderPassDescriptor {
            label: Some("outline_post_process_pass"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view: post_process.destination,
                resolve_target: None,
                ops: Operations::default(),
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_render_pipeline(pipeline);
        render_pass.set_bind_group(0, &bind_group, &[settings_index.index()]);
        render_pass.draw(0..3, 0..1);

        Ok(())
    }
}

#[derive(Resource)]
struct OutlinePostProcessPipeline {
    layout: BindGroupLayout,
    pipeline_id: CachedRenderPipelineId,
}

impl FromWorld for OutlinePostProcessPipeline {
    fn from_world(world: &mut World) -> Self {
        let render_device = world.resource::<RenderDevice>();

        // Every input is read with textureLoad, so no sampler is bound.
        let layout = render_device.create_bind_group_layout(
            "outline_post_process_bind_group_layout",
            &BindGroupLayoutEntries::sequential(
                ShaderStages::FRAGMENT,
                (
                    texture_2d(TextureSampleType::Float { filterable: false }),
                    texture_2d(TextureSampleType::Float { filterable: false }),
                    texture_2d(TextureSampleType::Float { filterable: false }),
                    uniform_buffer::<OutlineSettings>(true),
                ),
            ),
        );

        let shader = world.load_asset(OUTLINE_SHADER_PATH);

        let pipeline_id =
            world
                .resource_mut::<PipelineCache>()
                .queue_render_pipeline(RenderPipelineDescriptor {
                    label: Some("outline_post_process_pipeline".into()),
                    layout: vec![layout.clone()],
                    vertex: fullscreen_shader_vertex_state(),
                    fragment: Some(FragmentState {
                        shader,
                        shader_defs: vec![],
                        entry_point: "fragment".into(),
                        targets: vec![Some(ColorTargetState {
                            format: TextureFormat::bevy_default(),
                            blend: None,
                            write_mask: ColorWrites::ALL,
                        })],
                    }),
                    primitive: PrimitiveState::default(),
                    depth_stencil: None,
                    multisample: MultisampleState::default(),
                    push_constant_ranges: vec![],
                    zero_initialize_workgroup_memory: false,
                });

        Self {
            layout,
            pipeline_id,
        }
    }
}
