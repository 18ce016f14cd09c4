use crate::engine::core::hint::OnboardingHint;
use crate::tools::answer_input::{pin_for_inspection, submit_for_inspection};
use crate::tools::inspect::{InspectChanged, Inspection};
use crate::tools::puzzle::{GameState, PuzzleSolved};
use bevy::prelude::*;

const PANEL_BACKGROUND: Color = Color::srgba(0.10, 0.09, 0.08, 0.92);
const BUTTON_BACKGROUND: Color = Color::srgb(0.22, 0.20, 0.17);
const BUTTON_HOVER: Color = Color::srgb(0.30, 0.27, 0.22);
const TEXT_COLOUR: Color = Color::srgb(0.95, 0.92, 0.85);
const MUTED_TEXT: Color = Color::srgb(0.70, 0.66, 0.58);

#[derive(Component)]
pub struct InspectPanel;

#[derive(Component)]
pub struct PanelTitle;

#[derive(Component)]
pub struct PanelPrompt;

#[derive(Component)]
pub struct PanelAnswer;

#[derive(Component)]
pub struct PanelFeedback;

#[derive(Component)]
pub struct CloseButton;

#[derive(Component)]
pub struct SubmitButton;

#[derive(Component)]
pub struct PinButton;

#[derive(Component)]
pub struct CaseBoardList;

#[derive(Component)]
pub struct HintNode;

fn button(marker: impl Component, label: &'static str) -> impl Bundle {
    (
        marker,
        Button,
        Name::new(format!("{label}Button")),
        BackgroundColor(BUTTON_BACKGROUND),
        BorderColor(Color::srgba(0.0, 0.0, 0.0, 0.25)),
        Node {
            height: Val::Px(30.0),
            padding: UiRect::axes(Val::Px(12.0), Val::Px(4.0)),
            display: Display::Flex,
            align_items: AlignItems::Center,
            justify_content: JustifyContent::Center,
            border: UiRect::all(Val::Px(1.0)),
            ..default()
        },
        children![(
            Text::new(label),
            TextFont {
                font_size: 15.0,
                ..default()
            },
            TextColor(TEXT_COLOUR),
        )],
    )
}

fn text(marker: impl Component, size: f32, colour: Color) -> impl Bundle {
    (
        marker,
        Text::new(""),
        TextFont {
            font_size: size,
            ..default()
        },
        TextColor(colour),
    )
}

pub fn spawn_overlay_ui(mut commands: Commands) {
    commands.spawn((
        InspectPanel,
        Name::new("InspectPanel"),
        // Tracked so presses on the panel are kept from the room.
        Interaction::default(),
        BackgroundColor(PANEL_BACKGROUND),
        Node {
            width: Val::Px(360.0),
            position_type: PositionType::Absolute,
            left: Val::Px(16.0),
            bottom: Val::Px(16.0),
            padding: UiRect::all(Val::Px(14.0)),
            row_gap: Val::Px(8.0),
            display: Display::None,
            flex_direction: FlexDirection::Column,
            ..default()
        },
        children![
            text(PanelTitle, 20.0, TEXT_COLOUR),
            text(PanelPrompt, 15.0, MUTED_TEXT),
            text(PanelAnswer, 17.0, TEXT_COLOUR),
            text(PanelFeedback, 15.0, MUTED_TEXT),
            (
                Node {
                    column_gap: Val::Px(8.0),
                    display: Display::Flex,
                    flex_direction: FlexDirection::Row,
                    ..default()
                },
                children![
                    button(SubmitButton, "Submit"),
                    button(PinButton, "Pin"),
                    button(CloseButton, "Close"),
                ],
            ),
        ],
    ));

    commands.spawn((
        Name::new("CaseBoard"),
        Interaction::default(),
        BackgroundColor(PANEL_BACKGROUND),
        Node {
            width: Val::Px(240.0),
            position_type: PositionType::Absolute,
            right: Val::Px(16.0),
            top: Val::Px(16.0),
            padding: UiRect::all(Val::Px(10.0)),
            row_gap: Val::Px(4.0),
            display: Display::Flex,
            flex_direction: FlexDirection::Column,
            ..default()
        },
        children![
            (
                Text::new("Case board"),
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(TEXT_COLOUR),
            ),
            (
                CaseBoardList,
                Node {
                    row_gap: Val::Px(2.0),
                    display: Display::Flex,
                    flex_direction: FlexDirection::Column,
                    ..default()
                },
            ),
        ],
    ));

    commands.spawn((
        HintNode,
        Name::new("Hint"),
        Interaction::default(),
        BackgroundColor(PANEL_BACKGROUND),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Percent(50.0),
            top: Val::Px(16.0),
            padding: UiRect::axes(Val::Px(14.0), Val::Px(8.0)),
            display: Display::None,
            ..default()
        },
        children![(
            Text::new("Drag to look around, click objects to inspect (H to hide)"),
            TextFont {
                font_size: 15.0,
                ..default()
            },
            TextColor(TEXT_COLOUR),
        )],
    ));
}

/// Mirror the open inspection into the panel texts.
pub fn update_inspect_panel(
    inspection: Res<Inspection>,
    mut panels: Query<&mut Node, With<InspectPanel>>,
    mut texts: ParamSet<(
        Query<&mut Text, With<PanelTitle>>,
        Query<&mut Text, With<PanelPrompt>>,
        Query<&mut Text, With<PanelAnswer>>,
        Query<&mut Text, With<PanelFeedback>>,
    )>,
) {
    if !inspection.is_changed() {
        return;
    }

    if let Ok(mut node) = panels.single_mut() {
        node.display = if inspection.is_open() {
            Display::Flex
        } else {
            Display::None
        };
    }

    let Some(state) = inspection.current() else {
        return;
    };
    let meta = state.meta();

    if let Ok(mut title) = texts.p0().single_mut() {
        **title = meta.title.clone();
    }
    if let Ok(mut prompt) = texts.p1().single_mut() {
        **prompt = match &meta.puzzle {
            Some(puzzle) if meta.solved => format!("{}: solved", puzzle.title),
            Some(puzzle) => format!("{}: {}", puzzle.title, puzzle.prompt),
            None => String::new(),
        };
    }
    if let Ok(mut answer) = texts.p2().single_mut() {
        **answer = if meta.puzzle.is_some() && !meta.solved {
            format!("> {}_", inspection.answer)
        } else {
            String::new()
        };
    }
    if let Ok(mut feedback) = texts.p3().single_mut() {
        **feedback = inspection
            .feedback
            .map(|feedback| feedback.text().to_string())
            .unwrap_or_default();
    }
}

pub fn handle_panel_buttons(
    mut inspection: ResMut<Inspection>,
    mut game: ResMut<GameState>,
    mut solved: EventWriter<PuzzleSolved>,
    mut changed: EventWriter<InspectChanged>,
    mut buttons: Query<
        (
            &Interaction,
            &mut BackgroundColor,
            Has<CloseButton>,
            Has<SubmitButton>,
            Has<PinButton>,
        ),
        (Changed<Interaction>, With<Button>),
    >,
) {
    for (interaction, mut background, close, submit, pin) in &mut buttons {
        *background = BackgroundColor(match interaction {
            Interaction::Hovered | Interaction::Pressed => BUTTON_HOVER,
            Interaction::None => BUTTON_BACKGROUND,
        });
        if *interaction != Interaction::Pressed {
            continue;
        }

        if close && inspection.is_open() {
            inspection.close();
            changed.write(InspectChanged::from_state(None));
            continue;
        }

        let Some(puzzle_id) = inspection.puzzle().map(|puzzle| puzzle.id.clone()) else {
            continue;
        };
        if submit && !inspection.answer.trim().is_empty() {
            let answer = inspection.answer.clone();
            submit_for_inspection(&puzzle_id, &answer, &mut game, &mut inspection, &mut solved);
        } else if pin {
            pin_for_inspection(&puzzle_id, &mut game, &mut inspection);
        }
    }
}

/// List pinned puzzles, with their answers once solved.
pub fn update_case_board(
    mut commands: Commands,
    game: Res<GameState>,
    lists: Query<Entity, With<CaseBoardList>>,
) {
    if !game.is_changed() {
        return;
    }
    let Ok(list) = lists.single() else {
        return;
    };

    commands.entity(list).despawn_related::<Children>();
    commands.entity(list).with_children(|list| {
        for (config, status) in game.puzzles().filter(|(_, status)| status.pinned) {
            let line = match &status.solved_answer {
                Some(answer) => format!("{}: {}", config.title, answer),
                None => format!("{}: ?", config.title),
            };
            list.spawn((
                Text::new(line),
                TextFont {
                    font_size: 14.0,
                    ..default()
                },
                TextColor(if status.solved { TEXT_COLOUR } else { MUTED_TEXT }),
            ));
        }
    });
}

pub fn update_hint_node(hint: Res<OnboardingHint>, mut nodes: Query<&mut Node, With<HintNode>>) {
    if !hint.is_changed() {
        return;
    }
    if let Ok(mut node) = nodes.single_mut() {
        node.display = if hint.visible() {
            Display::Flex
        } else {
            Display::None
        };
    }
}
