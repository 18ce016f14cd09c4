use crate::engine::camera::controller::camera_motion_system;
use crate::engine::core::app_state::AppState;
use crate::engine::core::hint::{OnboardingHint, dismiss_hint_on_input};
use crate::engine::render::lens_material::sync_lens_uniforms;
use crate::engine::systems::quality::{QualitySettings, apply_render_quality, drain_tune_commands};
use crate::tools::answer_input::answer_keyboard_system;
use crate::tools::click::{ClickTracker, track_pointer};
use crate::tools::container::animate_containers;
use crate::tools::inspect::{
    InspectChanged, Inspection, inspect_on_click, mark_inspection_solved, ramp_pixelation,
    rotate_inspected, spawn_inspect_overlay, sync_inspect_overlay,
};
use crate::tools::magnifier::{LensMask, Magnifier, magnifier_input, update_held_magnifier};
use crate::tools::overlay::{
    handle_panel_buttons, spawn_overlay_ui, update_case_board, update_hint_node,
    update_inspect_panel,
};
use crate::tools::puzzle::PuzzleSolved;
use bevy::prelude::*;

/// Pointer, magnifier, inspection and puzzle input for the running room.
pub struct InteractionPlugin;

impl Plugin for InteractionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ClickTracker>()
            .init_resource::<Magnifier>()
            .init_resource::<LensMask>()
            .init_resource::<Inspection>()
            .init_resource::<OnboardingHint>()
            .init_resource::<QualitySettings>()
            .add_event::<InspectChanged>()
            .add_event::<PuzzleSolved>()
            .add_systems(Startup, (spawn_inspect_overlay, spawn_overlay_ui));

        app.add_systems(
            Update,
            (
                // One pointer press is claimed by at most one consumer, in this order.
                (
                    track_pointer,
                    magnifier_input,
                    inspect_on_click,
                    answer_keyboard_system,
                    handle_panel_buttons,
                    mark_inspection_solved,
                    sync_inspect_overlay,
                )
                    .chain(),
                (update_held_magnifier, sync_lens_uniforms)
                    .chain()
                    .after(camera_motion_system)
                    .after(magnifier_input),
                (drain_tune_commands, apply_render_quality).chain(),
                animate_containers,
                rotate_inspected,
                ramp_pixelation,
                update_inspect_panel.after(mark_inspection_solved),
                update_case_board,
                update_hint_node.after(dismiss_hint_on_input),
                dismiss_hint_on_input,
            )
                .run_if(in_state(AppState::Running)),
        );
    }
}
