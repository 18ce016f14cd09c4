use bevy::prelude::*;
use constants::camera::{DEFAULT_FOV_DEG, DEFAULT_FOV_MAX_DEG, DEFAULT_FOV_MIN_DEG};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("duplicate prop id `{0}`")]
    DuplicateProp(String),
    #[error("duplicate puzzle id `{0}`")]
    DuplicatePuzzle(String),
    #[error("puzzle `{puzzle}` references unknown anchor `{anchor}`")]
    UnknownAnchor { puzzle: String, anchor: String },
    #[error("group `{group}` references unknown prop `{prop}`")]
    UnknownGroupMember { group: String, prop: String },
    #[error("prop `{prop}` inspects unknown group `{group}`")]
    UnknownGroup { prop: String, group: String },
    #[error("puzzle `{puzzle}` has an invalid answer pattern: {reason}")]
    InvalidPattern { puzzle: String, reason: String },
    #[error("puzzle `{0}` has no answers")]
    NoAnswers(String),
    #[error("more than one magnifier prop")]
    MultipleMagnifiers,
    #[error("fov range [{min}, {max}] is empty")]
    InvalidFovRange { min: f32, max: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomMode {
    #[default]
    Fov,
    Dolly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub look_at: [f32; 3],
    #[serde(default = "default_fov")]
    pub fov_degrees: f32,
    #[serde(default = "default_fov_min")]
    pub fov_min_degrees: f32,
    #[serde(default = "default_fov_max")]
    pub fov_max_degrees: f32,
    #[serde(default)]
    pub zoom_mode: ZoomMode,
    #[serde(default = "default_true")]
    pub zoom_enabled: bool,
}

fn default_fov() -> f32 {
    DEFAULT_FOV_DEG
}

fn default_fov_min() -> f32 {
    DEFAULT_FOV_MIN_DEG
}

fn default_fov_max() -> f32 {
    DEFAULT_FOV_MAX_DEG
}

fn default_true() -> bool {
    true
}

/// Camera pose a puzzle wants when it is inspected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ViewConfig {
    pub camera: [f32; 3],
    pub look_at: [f32; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropShape {
    Cuboid([f32; 3]),
    Plane([f32; 2]),
    Cylinder { radius: f32, height: f32 },
    Sphere(f32),
}

impl PropShape {
    /// Local-space box used for ray picking.
    pub fn bounds(&self) -> Vec3 {
        match *self {
            Self::Cuboid([x, y, z]) => Vec3::new(x, y, z),
            Self::Plane([x, z]) => Vec3::new(x, 0.01, z),
            Self::Cylinder { radius, height } => Vec3::new(radius * 2.0, height, radius * 2.0),
            Self::Sphere(radius) => Vec3::splat(radius * 2.0),
        }
    }

    pub fn mesh(&self) -> Mesh {
        match *self {
            Self::Cuboid([x, y, z]) => Cuboid::new(x, y, z).into(),
            Self::Plane([x, z]) => Plane3d::default().mesh().size(x, z).into(),
            Self::Cylinder { radius, height } => Cylinder::new(radius, height).into(),
            Self::Sphere(radius) => Sphere::new(radius).into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InspectConfig {
    pub title: String,
    #[serde(default)]
    pub kind: Option<String>,
    /// Framed inspection of a flat image instead of the mesh.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub aspect: Option<f32>,
    /// Inspect every member of this group together.
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub kind: String,
    #[serde(default)]
    pub open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropInteraction {
    Inspect(InspectConfig),
    Container(ContainerConfig),
    Magnifier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropConfig {
    pub id: String,
    pub shape: PropShape,
    pub position: [f32; 3],
    #[serde(default)]
    pub rotation_y_degrees: f32,
    #[serde(default = "default_prop_colour")]
    pub colour: [f32; 3],
    #[serde(default)]
    pub texture: Option<String>,
    #[serde(default)]
    pub outline: Option<[f32; 3]>,
    #[serde(default)]
    pub interaction: Option<PropInteraction>,
    /// Hidden writing only visible through the magnifier lens.
    #[serde(default)]
    pub secret: bool,
    /// Parent prop id, e.g. a lid that belongs to a box.
    #[serde(default)]
    pub parent: Option<String>,
}

fn default_prop_colour() -> [f32; 3] {
    [0.6, 0.55, 0.5]
}

impl PropConfig {
    pub fn transform(&self) -> Transform {
        Transform::from_translation(Vec3::from_array(self.position))
            .with_rotation(Quat::from_rotation_y(self.rotation_y_degrees.to_radians()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSpec {
    Text(String),
    Pattern(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleConfig {
    pub id: String,
    pub title: String,
    /// Prop ids whose inspection makes this puzzle available.
    pub anchors: Vec<String>,
    pub prompt: String,
    pub answers: Vec<AnswerSpec>,
    #[serde(default)]
    pub view: Option<ViewConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub id: String,
    pub members: Vec<String>,
}

/// Complete room description as a Bevy asset. Mirrors the JSON structure.
#[derive(Asset, Resource, TypePath, Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    pub camera: CameraConfig,
    pub props: Vec<PropConfig>,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub puzzles: Vec<PuzzleConfig>,
}

impl RoomConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Cross-reference checks serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        if camera.fov_min_degrees > camera.fov_max_degrees {
            return Err(ConfigError::InvalidFovRange {
                min: camera.fov_min_degrees,
                max: camera.fov_max_degrees,
            });
        }

        let mut prop_ids = HashSet::new();
        for prop in &self.props {
            if !prop_ids.insert(prop.id.as_str()) {
                return Err(ConfigError::DuplicateProp(prop.id.clone()));
            }
        }

        let magnifiers = self
            .props
            .iter()
            .filter(|prop| matches!(prop.interaction, Some(PropInteraction::Magnifier)))
            .count();
        if magnifiers > 1 {
            return Err(ConfigError::MultipleMagnifiers);
        }

        for group in &self.groups {
            if let Some(missing) = group
                .members
                .iter()
                .find(|member| !prop_ids.contains(member.as_str()))
            {
                return Err(ConfigError::UnknownGroupMember {
                    group: group.id.clone(),
                    prop: missing.clone(),
                });
            }
        }

        for prop in &self.props {
            if let Some(PropInteraction::Inspect(InspectConfig {
                group: Some(group), ..
            })) = &prop.interaction
            {
                if self.group(group).is_none() {
                    return Err(ConfigError::UnknownGroup {
                        prop: prop.id.clone(),
                        group: group.clone(),
                    });
                }
            }
        }

        let mut puzzle_ids = HashSet::new();
        for puzzle in &self.puzzles {
            if !puzzle_ids.insert(puzzle.id.as_str()) {
                return Err(ConfigError::DuplicatePuzzle(puzzle.id.clone()));
            }
            if puzzle.answers.is_empty() {
                return Err(ConfigError::NoAnswers(puzzle.id.clone()));
            }
            if let Some(anchor) = puzzle
                .anchors
                .iter()
                .find(|anchor| !prop_ids.contains(anchor.as_str()))
            {
                return Err(ConfigError::UnknownAnchor {
                    puzzle: puzzle.id.clone(),
                    anchor: anchor.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn prop(&self, id: &str) -> Option<&PropConfig> {
        self.props.iter().find(|prop| prop.id == id)
    }

    pub fn group(&self, id: &str) -> Option<&GroupConfig> {
        self.groups.iter().find(|group| group.id == id)
    }

    /// Puzzles unlocked by inspecting `prop_id`.
    pub fn puzzles_anchored_at<'a>(
        &'a self,
        prop_id: &'a str,
    ) -> impl Iterator<Item = &'a PuzzleConfig> + 'a {
        self.puzzles
            .iter()
            .filter(move |puzzle| puzzle.anchors.iter().any(|anchor| anchor == prop_id))
    }
}

/// Handle of the room config being loaded.
#[derive(Resource, Default)]
pub struct RoomConfigHandle {
    pub handle: Option<Handle<RoomConfig>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOM: &str = r#"{
        "camera": { "position": [0, 1.6, 3], "look_at": [0, 1, 0] },
        "props": [
            { "id": "desk", "shape": { "cuboid": [1.6, 0.08, 0.8] }, "position": [0, 0.75, 0] },
            { "id": "ledger", "shape": { "cuboid": [0.3, 0.03, 0.22] }, "position": [0.2, 0.8, 0],
              "interaction": { "inspect": { "title": "Ledger" } } },
            { "id": "lens", "shape": { "cylinder": { "radius": 0.05, "height": 0.01 } },
              "position": [-0.3, 0.8, 0.1], "interaction": "magnifier" },
            { "id": "box", "shape": { "cuboid": [0.4, 0.3, 0.4] }, "position": [1, 0.15, 1],
              "interaction": { "container": { "kind": "box" } } }
        ],
        "puzzles": [
            { "id": "safe", "title": "Safe", "anchors": ["ledger"], "prompt": "Year?",
              "answers": [{ "text": "1947" }, { "pattern": "^nineteen forty[- ]?seven$" }],
              "view": { "camera": [0.2, 1.2, 0.5], "look_at": [0.2, 0.8, 0] } }
        ]
    }"#;

    #[test]
    fn parses_and_validates_room() {
        let room = RoomConfig::from_json(ROOM).expect("room parses");
        assert_eq!(room.validate(), Ok(()));
        assert_eq!(room.camera.zoom_mode, ZoomMode::Fov);
        assert_eq!(room.camera.fov_min_degrees, DEFAULT_FOV_MIN_DEG);
        assert!(matches!(
            room.prop("lens").and_then(|p| p.interaction.as_ref()),
            Some(PropInteraction::Magnifier)
        ));
        assert_eq!(room.puzzles_anchored_at("ledger").count(), 1);
        assert_eq!(
            room.puzzles[0].answers[1],
            AnswerSpec::Pattern("^nineteen forty[- ]?seven$".into())
        );
    }

    #[test]
    fn rejects_unknown_anchor() {
        let mut room = RoomConfig::from_json(ROOM).expect("room parses");
        room.puzzles[0].anchors.push("ghost".into());
        assert_eq!(
            room.validate(),
            Err(ConfigError::UnknownAnchor {
                puzzle: "safe".into(),
                anchor: "ghost".into()
            })
        );
    }

    #[test]
    fn rejects_duplicate_props() {
        let mut room = RoomConfig::from_json(ROOM).expect("room parses");
        let copy = room.props[0].clone();
        room.props.push(copy);
        assert_eq!(
            room.validate(),
            Err(ConfigError::DuplicateProp("desk".into()))
        );
    }
}
