use crate::engine::render::outline_post_processing::OutlinePostProcessLabel;
use bevy::{
    core_pipeline::{
        core_3d::graph::{Core3d, Node3d},
        fullscreen_vertex_shader::fullscreen_shader_vertex_state,
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
        render_graph::{
            NodeRunError, RenderGraphApp, RenderGraphContext, RenderLabel, ViewNode, ViewNodeRunner,
        },
        render_resource::{
            binding_types::{texture_2d, uniform_buffer},
            *,
        },
        renderer::{RenderContext, RenderDevice},
        view::ViewTarget,
    },
};
use constants::render_settings::INSPECT_PIXELATE_CELL_PX;

const PIXELATE_SHADER_PATH: &str = "shaders/pixelate.wgsl";

/// Background pixelation behind the inspection overlay.
///
/// Must be added after [`OutlinePostProcessPlugin`](super::outline_post_processing::OutlinePostProcessPlugin)
/// because its node is ordered after the outline node.
pub struct PixelatePostProcessPlugin;

impl Plugin for PixelatePostProcessPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            ExtractComponentPlugin::<PixelateSettings>::default(),
            UniformComponentPlugin::<PixelateSettings>::default(),
        ));

        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app
            .add_render_graph_node::<ViewNodeRunner<PixelatePostProcessNode>>(
                Core3d,
                PixelatePostProcessLabel,
            )
            .add_render_graph_edges(
                Core3d,
                (
                    OutlinePostProcessLabel,
                    PixelatePostProcessLabel,
                    Node3d::EndMainPassPostProcessing,
                ),
            );
    }

    fn finish(&self, app: &mut App) {
        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app.init_resource::<PixelatePostProcessPipeline>();
    }
}

#[derive(Debug, Hash, PartialEq, Eq, Clone, RenderLabel)]
struct PixelatePostProcessLabel;

/// `strength` in 0..=1 blends the cell size from 1 px to `cell_px`.
#[derive(Component, Clone, Copy, ExtractComponent, ShaderType)]
pub struct PixelateSettings {
    pub cell_px: f32,
    pub strength: f32,
}

impl Default for PixelateSettings {
    fn default() -> Self {
        Self {
            cell_px: INSPECT_PIXELATE_CELL_PX,
            strength: 0.0,
        }
    }
}

impl PixelateSettings {
    /// Effective cell size in whole pixels, as the shader computes it.
    pub fn cell_size(&self) -> u32 {
        let strength = self.strength.clamp(0.0, 1.0);
        (1.0 + (self.cell_px - 1.0) * strength).round().max(1.0) as u32
    }
}

#[derive(Default)]
struct PixelatePostProcessNode;

impl ViewNode for PixelatePostProcessNode {
    type ViewQuery = (
        &'static ViewTarget,
        &'static PixelateSettings,
        &'static DynamicUniformIndex<PixelateSettings>,
    );

    fn run(
        &self,
        _graph: &mut RenderGraphContext,
        render_context: &mut RenderContext,
        (view_target, settings, settings_index): QueryItem<Self::ViewQuery>,
        world: &World,
    ) -> Result<(), NodeRunError> {
        // Nothing to do while the overlay is closed.
        if settings.cell_size() <= 1 {
            return Ok(());
        }

        let pixelate_pipeline = world.resource::<PixelatePostProcessPipeline>();
        let pipeline_cache = world.resource::<PipelineCache>();

        let Some(pipeline) = pipeline_cache.get_render_pipeline(pixelate_pipeline.pipeline_id)
        else {
            return Ok(());
        };

        let settings_uniforms = world.resource::<ComponentUniforms<PixelateSettings>>();
        let Some(settings_binding) = settings_uniforms.uniforms().binding() else {
            return Ok(());
        };

        let post_process = view_target.post_process_write();

        let bind_group = render_context.render_device().create_bind_group(
            "pixelate_post_process_bind_group",
            &pixelate_pipeline.layout,
            &BindGroupEntries::sequential((post_process.source, settings_binding.clone())),
        );

        let mut render_pass = render_context.begin_tracked_render_pass(RenderPassDescriptor {
            label: Some("pixelate_post_process_pass"),
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
struct PixelatePostProcessPipeline {
    layout: BindGroupLayout,
    pipeline_id: CachedRenderPipelineId,
}

impl FromWorld for PixelatePostProcessPipeline {
    fn from_world(world: &mut World) -> Self {
        let render_device = world.resource::<RenderDevice>();

        let layout = render_device.create_bind_group_layout(
            "pixelate_post_process_bind_group_layout",
            &BindGroupLayoutEntries::sequential(
                ShaderStages::FRAGMENT,
                (
                    texture_2d(TextureSampleType::Float { filterable: false }),
                    uniform_buffer::<PixelateSettings>(true),
                ),
            ),
        );

        let shader = world.load_asset(PIXELATE_SHADER_PATH);

        let pipeline_id =
            world
                .resource_mut::<PipelineCache>()
                .queue_render_pipeline(RenderPipelineDescriptor {
                    label: Some("pixelate_post_process_pipeline".into()),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_size_follows_strength() {
        let mut settings = PixelateSettings::default();
        assert_eq!(settings.cell_size(), 1);
        settings.strength = 1.0;
        assert_eq!(settings.cell_size(), INSPECT_PIXELATE_CELL_PX as u32);
        settings.strength = 7.0;
        assert_eq!(settings.cell_size(), INSPECT_PIXELATE_CELL_PX as u32);
        settings.strength = 0.5;
        assert_eq!(settings.cell_size(), 4);
    }
}
