//! Sprite templates, placements and clones
//!
//! A template is a named appearance. Displaying it records one placement per
//! name; clones of a template are staged in a sparse table keyed by clone
//! index and only folded into the placement list when a snapshot is built.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use super::entities::Num;
use super::error::SceneError;

/// Direction value meaning "mirrored horizontally"
pub const MIRRORED_DIRECTION: f64 = -180.0;

/// How a sprite's direction is turned into an on-screen rotation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationStyle {
    /// Free rotation
    #[default]
    AllAround,
    /// Face left or right only
    LeftRight,
    /// Never rotate
    DontRotate,
}

impl RotationStyle {
    /// Map a heading (90 = facing right) to the renderer's rotation angle
    pub fn remap(self, direction: f64) -> f64 {
        match self {
            Self::AllAround => 90.0 - direction,
            Self::LeftRight => {
                if direction < 0.0 {
                    MIRRORED_DIRECTION
                } else {
                    0.0
                }
            }
            Self::DontRotate => 0.0,
        }
    }
}

impl FromStr for RotationStyle {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all around" | "all-around" => Ok(Self::AllAround),
            "left-right" => Ok(Self::LeftRight),
            "don't rotate" | "dont-rotate" => Ok(Self::DontRotate),
            other => Err(SceneError::InvalidRotationStyle(other.to_string())),
        }
    }
}

/// Named appearance: `[name, colorList]`
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteTemplate {
    /// Template name
    pub name: String,
    /// Opaque pixel/colour list understood by the renderer
    pub color_source: String,
}

impl Serialize for SpriteTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.name, &self.color_source).serialize(serializer)
    }
}

/// One on-screen placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpritePlacement {
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
    /// Rotation after style remapping
    pub direction: f64,
    /// Scale factor
    pub scale: f64,
}

impl SpritePlacement {
    fn values(&self) -> [f64; 4] {
        [self.x, self.y, self.direction, self.scale]
    }
}

/// Placement list entry: `[name, x, y, dir, scale, cloneX, cloneY, ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteMove {
    /// Template name
    pub name: String,
    /// The template's own placement
    pub placement: SpritePlacement,
    /// Clone placements in clone-index order
    pub clones: Vec<SpritePlacement>,
}

impl Serialize for SpriteMove {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(1 + 4 * (1 + self.clones.len())))?;
        seq.serialize_element(&self.name)?;
        for placement in std::iter::once(&self.placement).chain(&self.clones) {
            for v in placement.values() {
                seq.serialize_element(&Num(v))?;
            }
        }
        seq.end()
    }
}

/// Per-scene sprite collections, cleared with the scene
#[derive(Debug, Clone, Default)]
pub struct SpriteBook {
    templates: Vec<SpriteTemplate>,
    moves: Vec<SpriteMove>,
    clone_moves: BTreeMap<String, BTreeMap<u32, SpritePlacement>>,
}

impl SpriteBook {
    /// Record a template. Redefinitions are appended, not merged.
    pub fn add_template(&mut self, name: impl Into<String>, color_source: impl Into<String>) {
        self.templates.push(SpriteTemplate {
            name: name.into(),
            color_source: color_source.into(),
        });
    }

    /// Whether any template carries `name`
    pub fn has_template(&self, name: &str) -> bool {
        self.templates.iter().any(|t| t.name == name)
    }

    /// Templates in creation order
    pub fn templates(&self) -> &[SpriteTemplate] {
        &self.templates
    }

    /// Record the latest placement of `name`, replacing an earlier one
    pub fn place(&mut self, name: &str, placement: SpritePlacement) -> Result<(), SceneError> {
        if !self.has_template(name) {
            return Err(SceneError::UnknownSprite(name.to_string()));
        }
        match self.moves.iter_mut().find(|m| m.name == name) {
            Some(existing) => existing.placement = placement,
            None => self.moves.push(SpriteMove {
                name: name.to_string(),
                placement,
                clones: Vec::new(),
            }),
        }
        Ok(())
    }

    /// Stage a clone placement
    pub fn place_clone(
        &mut self,
        name: &str,
        clone_index: u32,
        placement: SpritePlacement,
    ) -> Result<(), SceneError> {
        if !self.has_template(name) {
            return Err(SceneError::UnknownSprite(name.to_string()));
        }
        self.clone_moves
            .entry(name.to_string())
            .or_default()
            .insert(clone_index, placement);
        Ok(())
    }

    /// Placement list with staged clones folded in.
    ///
    /// Stored state is left untouched so repeated snapshots do not duplicate
    /// clones. Clones of a sprite that has no placement of its own are
    /// dropped with a warning.
    pub fn merged_moves(&self) -> Vec<SpriteMove> {
        let mut merged = self.moves.clone();
        for (name, clones) in &self.clone_moves {
            match merged.iter_mut().find(|m| &m.name == name) {
                Some(entry) => entry.clones.extend(clones.values().copied()),
                None => log::warn!(
                    "sprite {name} has {} clone(s) but no placement of its own; skipped",
                    clones.len()
                ),
            }
        }
        merged
    }
}

/// Long-lived sprite configuration that survives `clear`
#[derive(Debug, Clone, Default)]
pub struct SpriteSettings {
    rotation_styles: HashMap<String, RotationStyle>,
    scales: HashMap<String, f64>,
}

impl SpriteSettings {
    /// Set the rotation style of `name`
    pub fn set_rotation_style(&mut self, name: impl Into<String>, style: RotationStyle) {
        self.rotation_styles.insert(name.into(), style);
    }

    /// Rotation style of `name`, all-around when unset
    pub fn rotation_style(&self, name: &str) -> RotationStyle {
        self.rotation_styles.get(name).copied().unwrap_or_default()
    }

    /// Set the default scale of `name`
    pub fn set_scale(&mut self, name: impl Into<String>, scale: f64) {
        self.scales.insert(name.into(), scale);
    }

    /// Default scale of `name`, 1.0 when unset
    pub fn scale(&self, name: &str) -> f64 {
        self.scales.get(name).copied().unwrap_or(1.0)
    }
}
