use crate::tools::inspect::{Feedback, InspectChanged, Inspection};
use crate::tools::puzzle::{AnswerOutcome, GameState, PinOutcome, PuzzleSolved};
use bevy::input::ButtonState;
use bevy::input::keyboard::{Key, KeyboardInput};
use bevy::prelude::*;

/// Longest answer the panel accepts.
const MAX_ANSWER_CHARS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerAction {
    None,
    Submit(String),
    Pin,
    Close,
}

/// Apply one key press to the answer being typed.
///
/// `P` pins the puzzle only while nothing has been typed yet; once an answer
/// is under way it is an ordinary character.
pub fn apply_key(answer: &mut String, key: &Key, has_puzzle: bool) -> AnswerAction {
    match key {
        Key::Escape => AnswerAction::Close,
        Key::Enter if has_puzzle => {
            if answer.trim().is_empty() {
                AnswerAction::None
            } else {
                AnswerAction::Submit(answer.clone())
            }
        }
        Key::Backspace if has_puzzle => {
            answer.pop();
            AnswerAction::None
        }
        Key::Space if has_puzzle && !answer.is_empty() => {
            push_chars(answer, " ");
            AnswerAction::None
        }
        Key::Character(text) if has_puzzle => {
            if answer.is_empty() && text.eq_ignore_ascii_case("p") {
                return AnswerAction::Pin;
            }
            push_chars(answer, text);
            AnswerAction::None
        }
        _ => AnswerAction::None,
    }
}

fn push_chars(answer: &mut String, text: &str) {
    for c in text.chars().filter(|c| !c.is_control()) {
        if answer.chars().count() >= MAX_ANSWER_CHARS {
            break;
        }
        answer.push(c);
    }
}

pub fn submit_feedback(outcome: AnswerOutcome) -> Feedback {
    match outcome {
        AnswerOutcome::Solved => Feedback::Correct,
        AnswerOutcome::AlreadySolved => Feedback::AlreadySolved,
        AnswerOutcome::Incorrect => Feedback::Incorrect,
    }
}

pub fn pin_feedback(outcome: PinOutcome) -> Feedback {
    match outcome {
        PinOutcome::Pinned => Feedback::Pinned,
        PinOutcome::AlreadyPinned => Feedback::AlreadyPinned,
        PinOutcome::Unavailable => Feedback::NotYetAvailable,
    }
}

/// Submit an answer for `puzzle_id` and record the feedback on the inspection.
pub fn submit_for_inspection(
    puzzle_id: &str,
    answer: &str,
    game: &mut GameState,
    inspection: &mut Inspection,
    solved: &mut EventWriter<PuzzleSolved>,
) {
    match game.submit_answer(puzzle_id, answer) {
        Ok(outcome) => {
            if outcome == AnswerOutcome::Solved {
                info!("Puzzle {} solved", puzzle_id);
                inspection.mark_solved();
                inspection.answer.clear();
                solved.write(PuzzleSolved {
                    id: puzzle_id.to_string(),
                    answer: answer.trim().to_string(),
                });
            }
            inspection.feedback = Some(submit_feedback(outcome));
        }
        Err(err) => warn!("{}", err),
    }
}

pub fn pin_for_inspection(puzzle_id: &str, game: &mut GameState, inspection: &mut Inspection) {
    match game.pin(puzzle_id) {
        Ok(outcome) => {
            if outcome == PinOutcome::Pinned {
                info!("Puzzle {} pinned", puzzle_id);
            }
            inspection.feedback = Some(pin_feedback(outcome));
        }
        Err(err) => warn!("{}", err),
    }
}

pub fn answer_keyboard_system(
    mut keys: EventReader<KeyboardInput>,
    mut inspection: ResMut<Inspection>,
    mut game: ResMut<GameState>,
    mut solved: EventWriter<PuzzleSolved>,
    mut changed: EventWriter<InspectChanged>,
) {
    if !inspection.is_open() {
        keys.clear();
        return;
    }

    let puzzle_id = inspection.puzzle().map(|puzzle| puzzle.id.clone());
    for event in keys.read() {
        if event.state != ButtonState::Pressed {
            continue;
        }

        let action = apply_key(&mut inspection.answer, &event.logical_key, puzzle_id.is_some());
        match (action, puzzle_id.as_deref()) {
            (AnswerAction::Close, _) => {
                inspection.close();
                changed.write(InspectChanged::from_state(None));
                return;
            }
            (AnswerAction::Submit(answer), Some(id)) => {
                submit_for_inspection(id, &answer, &mut game, &mut inspection, &mut solved);
            }
            (AnswerAction::Pin, Some(id)) => pin_for_inspection(id, &mut game, &mut inspection),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(keys: &[Key]) -> (String, Vec<AnswerAction>) {
        let mut answer = String::new();
        let actions = keys
            .iter()
            .map(|key| apply_key(&mut answer, key, true))
            .collect();
        (answer, actions)
    }

    fn chars(text: &str) -> Vec<Key> {
        text.chars()
            .map(|c| {
                if c == ' ' {
                    Key::Space
                } else {
                    Key::Character(c.to_string().into())
                }
            })
            .collect()
    }

    #[test]
    fn characters_append_and_backspace_deletes() {
        let mut keys = chars("butlex");
        keys.push(Key::Backspace);
        keys.extend(chars("r"));
        let (answer, _) = typed(&keys);
        assert_eq!(answer, "butler");
    }

    #[test]
    fn enter_submits_typed_answer() {
        let mut keys = chars("the maid");
        keys.push(Key::Enter);
        let (_, actions) = typed(&keys);
        assert_eq!(actions.last(), Some(&AnswerAction::Submit("the maid".into())));
    }

    #[test]
    fn enter_with_nothing_typed_does_nothing() {
        let (_, actions) = typed(&[Key::Space, Key::Enter]);
        assert_eq!(actions, vec![AnswerAction::None, AnswerAction::None]);
    }

    #[test]
    fn p_pins_only_before_typing() {
        let (answer, actions) = typed(&chars("p"));
        assert_eq!(actions, vec![AnswerAction::Pin]);
        assert!(answer.is_empty());

        let (answer, _) = typed(&chars("apple pie"));
        assert_eq!(answer, "apple pie");
    }

    #[test]
    fn escape_closes_even_without_puzzle() {
        let mut answer = String::new();
        assert_eq!(apply_key(&mut answer, &Key::Escape, false), AnswerAction::Close);
        assert_eq!(
            apply_key(&mut answer, &Key::Character("x".into()), false),
            AnswerAction::None
        );
        assert!(answer.is_empty());
    }

    #[test]
    fn answer_length_is_capped() {
        let mut answer = String::new();
        for _ in 0..100 {
            apply_key(&mut answer, &Key::Character("ab".into()), true);
        }
        assert_eq!(answer.chars().count(), MAX_ANSWER_CHARS);
    }
}
