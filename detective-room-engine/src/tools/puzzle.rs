use crate::engine::assets::room_config::{
    AnswerSpec, ConfigError, PropInteraction, PuzzleConfig, RoomConfig,
};
use bevy::prelude::*;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("unknown puzzle `{0}`")]
    UnknownPuzzle(String),
    #[error("unknown container `{0}`")]
    UnknownContainer(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleStatus {
    pub available: bool,
    pub pinned: bool,
    pub solved: bool,
    pub solved_answer: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    Solved,
    AlreadySolved,
    Incorrect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PinOutcome {
    Pinned,
    AlreadyPinned,
    Unavailable,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    pub kind: String,
    pub open: bool,
    pub open_nonce: u32,
    #[serde(skip)]
    applied_nonce: u32,
}

#[derive(Debug)]
enum CompiledAnswer {
    Exact(String),
    Pattern(Regex),
}

impl CompiledAnswer {
    fn matches(&self, normalised: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == normalised,
            Self::Pattern(pattern) => pattern.is_match(normalised),
        }
    }
}

#[derive(Debug)]
struct PuzzleEntry {
    config: PuzzleConfig,
    answers: Vec<CompiledAnswer>,
    status: PuzzleStatus,
}

/// Lowercase, trim and collapse internal whitespace.
pub fn normalise_answer(answer: &str) -> String {
    answer
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// In-memory puzzle and container state for one session.
#[derive(Resource, Debug, Default)]
pub struct GameState {
    puzzles: HashMap<String, PuzzleEntry>,
    order: Vec<String>,
    containers: HashMap<String, ContainerStatus>,
}

impl GameState {
    pub fn from_config(room: &RoomConfig) -> Result<Self, ConfigError> {
        let mut state = Self::default();

        for puzzle in &room.puzzles {
            let answers = puzzle
                .answers
                .iter()
                .map(|answer| compile_answer(&puzzle.id, answer))
                .collect::<Result<Vec<_>, _>>()?;
            if answers.is_empty() {
                return Err(ConfigError::NoAnswers(puzzle.id.clone()));
            }
            if state.puzzles.contains_key(&puzzle.id) {
                return Err(ConfigError::DuplicatePuzzle(puzzle.id.clone()));
            }
            state.order.push(puzzle.id.clone());
            state.puzzles.insert(
                puzzle.id.clone(),
                PuzzleEntry {
                    config: puzzle.clone(),
                    answers,
                    status: PuzzleStatus::default(),
                },
            );
        }

        for prop in &room.props {
            if let Some(PropInteraction::Container(container)) = &prop.interaction {
                state.containers.insert(
                    prop.id.clone(),
                    ContainerStatus {
                        kind: container.kind.clone(),
                        open: container.open,
                        ..default()
                    },
                );
            }
        }

        Ok(state)
    }

    pub fn status(&self, id: &str) -> Option<&PuzzleStatus> {
        self.puzzles.get(id).map(|entry| &entry.status)
    }

    pub fn config(&self, id: &str) -> Option<&PuzzleConfig> {
        self.puzzles.get(id).map(|entry| &entry.config)
    }

    /// Puzzles in config order.
    pub fn puzzles(&self) -> impl Iterator<Item = (&PuzzleConfig, &PuzzleStatus)> {
        self.order
            .iter()
            .filter_map(|id| self.puzzles.get(id))
            .map(|entry| (&entry.config, &entry.status))
    }

    /// Returns true when the puzzle was not available before.
    pub fn mark_available(&mut self, id: &str) -> Result<bool, GameError> {
        let entry = self.entry_mut(id)?;
        let changed = !entry.status.available;
        entry.status.available = true;
        Ok(changed)
    }

    pub fn pin(&mut self, id: &str) -> Result<PinOutcome, GameError> {
        let status = &mut self.entry_mut(id)?.status;
        if !status.available {
            return Ok(PinOutcome::Unavailable);
        }
        if status.pinned {
            return Ok(PinOutcome::AlreadyPinned);
        }
        status.pinned = true;
        Ok(PinOutcome::Pinned)
    }

    pub fn submit_answer(&mut self, id: &str, answer: &str) -> Result<AnswerOutcome, GameError> {
        let entry = self.entry_mut(id)?;
        if entry.status.solved {
            return Ok(AnswerOutcome::AlreadySolved);
        }

        let normalised = normalise_answer(answer);
        if !entry
            .answers
            .iter()
            .any(|expected| expected.matches(&normalised))
        {
            return Ok(AnswerOutcome::Incorrect);
        }

        entry.status.available = true;
        entry.status.solved = true;
        entry.status.solved_answer = Some(answer.trim().to_string());
        Ok(AnswerOutcome::Solved)
    }

    pub fn container(&self, id: &str) -> Option<&ContainerStatus> {
        self.containers.get(id)
    }

    pub fn containers(&self) -> impl Iterator<Item = (&String, &ContainerStatus)> {
        self.containers.iter()
    }

    /// Flip a container and return whether it is now open.
    pub fn toggle_container(&mut self, id: &str) -> Result<bool, GameError> {
        let container = self
            .containers
            .get_mut(id)
            .ok_or_else(|| GameError::UnknownContainer(id.to_string()))?;
        container.open = !container.open;
        if container.open {
            container.open_nonce += 1;
        }
        Ok(container.open)
    }

    /// Consume a pending open animation. Returns the nonce once per opening.
    pub fn take_open_animation(&mut self, id: &str) -> Option<u32> {
        let container = self.containers.get_mut(id)?;
        if container.open_nonce == container.applied_nonce {
            return None;
        }
        container.applied_nonce = container.open_nonce;
        Some(container.open_nonce)
    }

    fn entry_mut(&mut self, id: &str) -> Result<&mut PuzzleEntry, GameError> {
        self.puzzles
            .get_mut(id)
            .ok_or_else(|| GameError::UnknownPuzzle(id.to_string()))
    }
}

fn compile_answer(puzzle: &str, answer: &AnswerSpec) -> Result<CompiledAnswer, ConfigError> {
    match answer {
        AnswerSpec::Text(text) => Ok(CompiledAnswer::Exact(normalise_answer(text))),
        // Patterns must match the whole normalised answer, ignoring case.
        AnswerSpec::Pattern(pattern) => RegexBuilder::new(&format!("^(?:{pattern})$"))
            .case_insensitive(true)
            .build()
            .map(CompiledAnswer::Pattern)
            .map_err(|err| ConfigError::InvalidPattern {
                puzzle: puzzle.to_string(),
                reason: err.to_string(),
            }),
    }
}

/// Fired once when a puzzle transitions to solved.
#[derive(Event, Debug, Clone)]
pub struct PuzzleSolved {
    pub id: String,
    pub answer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> RoomConfig {
        RoomConfig::from_json(
            r#"{
            "camera": { "position": [0, 1.6, 3], "look_at": [0, 1, 0] },
            "props": [
                { "id": "ledger", "shape": { "cuboid": [0.3, 0.03, 0.22] }, "position": [0, 0.8, 0] },
                { "id": "drawer", "shape": { "cuboid": [0.5, 0.15, 0.4] }, "position": [0, 0.6, 0],
                  "interaction": { "container": { "kind": "drawer" } } }
            ],
            "puzzles": [
                { "id": "safe", "title": "Safe", "anchors": ["ledger"], "prompt": "Year?",
                  "answers": [{ "text": "  Nineteen   Forty-Seven " }, { "pattern": "^19[0-9]7$" }] }
            ]
        }"#,
        )
        .expect("room parses")
    }

    #[test]
    fn normalises_case_and_whitespace() {
        assert_eq!(normalise_answer("  The   Butler\tDid it "), "the butler did it");
    }

    #[test]
    fn text_answer_solves_exactly_once() {
        let mut game = GameState::from_config(&room()).expect("valid");
        assert_eq!(game.status("safe").map(|s| s.solved), Some(false));

        assert_eq!(
            game.submit_answer("safe", "nineteen forty-seven"),
            Ok(AnswerOutcome::Solved)
        );
        let status = game.status("safe").expect("known");
        assert!(status.solved);
        assert!(status.available);
        assert_eq!(status.solved_answer.as_deref(), Some("nineteen forty-seven"));

        assert_eq!(
            game.submit_answer("safe", "1947"),
            Ok(AnswerOutcome::AlreadySolved)
        );
    }

    #[test]
    fn pattern_answer_solves() {
        let mut game = GameState::from_config(&room()).expect("valid");
        assert_eq!(game.submit_answer("safe", " 1987 "), Ok(AnswerOutcome::Solved));
    }

    #[test]
    fn patterns_ignore_case_and_match_whole_answers() {
        let mut room = room();
        room.puzzles[0].answers = vec![AnswerSpec::Pattern("Mr\\s+Hale|Butler".into())];
        let mut game = GameState::from_config(&room).expect("valid");

        assert_eq!(
            game.submit_answer("safe", "not the butler"),
            Ok(AnswerOutcome::Incorrect)
        );
        assert_eq!(game.submit_answer("safe", "mr  hale"), Ok(AnswerOutcome::Solved));
    }

    #[test]
    fn wrong_answer_leaves_puzzle_unsolved() {
        let mut game = GameState::from_config(&room()).expect("valid");
        assert_eq!(
            game.submit_answer("safe", "the butler"),
            Ok(AnswerOutcome::Incorrect)
        );
        assert_eq!(game.status("safe"), Some(&PuzzleStatus::default()));
    }

    #[test]
    fn unknown_puzzle_is_an_error() {
        let mut game = GameState::from_config(&room()).expect("valid");
        assert_eq!(
            game.submit_answer("nope", "x"),
            Err(GameError::UnknownPuzzle("nope".into()))
        );
    }

    #[test]
    fn pin_requires_availability() {
        let mut game = GameState::from_config(&room()).expect("valid");
        assert_eq!(game.pin("safe"), Ok(PinOutcome::Unavailable));
        assert_eq!(game.mark_available("safe"), Ok(true));
        assert_eq!(game.mark_available("safe"), Ok(false));
        assert_eq!(game.pin("safe"), Ok(PinOutcome::Pinned));
        assert_eq!(game.pin("safe"), Ok(PinOutcome::AlreadyPinned));
        assert!(game.status("safe").is_some_and(|s| s.pinned));
    }

    #[test]
    fn open_animation_is_consumed_once_per_opening() {
        let mut game = GameState::from_config(&room()).expect("valid");
        assert_eq!(game.take_open_animation("drawer"), None);

        assert_eq!(game.toggle_container("drawer"), Ok(true));
        assert_eq!(game.take_open_animation("drawer"), Some(1));
        assert_eq!(game.take_open_animation("drawer"), None);

        assert_eq!(game.toggle_container("drawer"), Ok(false));
        assert_eq!(game.take_open_animation("drawer"), None);

        assert_eq!(game.toggle_container("drawer"), Ok(true));
        assert_eq!(game.take_open_animation("drawer"), Some(2));
        assert_eq!(
            game.toggle_container("cabinet"),
            Err(GameError::UnknownContainer("cabinet".into()))
        );
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let mut room = room();
        room.puzzles[0].answers = vec![AnswerSpec::Pattern("(".into())];
        assert!(matches!(
            GameState::from_config(&room),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }
}
