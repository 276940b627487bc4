//! Scripted scene commands
//!
//! One variant per accumulator operation. Scripts are lists of commands
//! loaded from RON, for example:
//!
//! ```ron
//! [
//!     SetRoomName("2048"),
//!     CreateBox(position: (0, 0, 0), color: (r: 1, g: 0, b: 0)),
//!     DrawLine(from: (0, 1, 0), to: (5, 1, 0)),
//!     SendData(name: Some("line")),
//! ]
//! ```
//!
//! Every command runs through [`Command::apply`], which returns whether the
//! caller should send a snapshot. Shapes, light types and rotation styles are
//! given by their menu labels (`"sphere"`, `"spot"`, `"left-right"`) and only
//! checked when the command runs, so one bad label skips a single command.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::foundation::math::Vec3;
use crate::scene::{Angles, Color, LightType, RotationStyle, SceneError, SceneState, Shape};

fn point_light() -> String {
    "point".to_string()
}

fn one() -> f64 {
    1.0
}

fn right() -> f64 {
    90.0
}

fn animation_interval() -> f64 {
    10.0
}

fn light_intensity() -> f64 {
    1000.0
}

fn default_roughness() -> f64 {
    0.5
}

/// Colour as written in scripts; alpha defaults to opaque
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    /// Red
    pub r: f64,
    /// Green
    pub g: f64,
    /// Blue
    pub b: f64,
    /// Opacity
    #[serde(default = "one")]
    pub alpha: f64,
}

impl Default for Rgba {
    fn default() -> Self {
        Self {
            r: 1.0,
            g: 1.0,
            b: 1.0,
            alpha: 1.0,
        }
    }
}

impl From<Rgba> for Color {
    fn from(c: Rgba) -> Self {
        Self::new(c.r, c.g, c.b, c.alpha)
    }
}

/// A single scene operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Join a different room when sending
    SetRoomName(String),
    /// Name the renderer records the build under
    SetRecordName(String),
    /// Voxel edge length
    SetBoxSize(f64),
    /// Delay between boxes while building
    SetBuildInterval(f64),
    /// Primitive used for voxels: `box`, `sphere` or `plane`
    ChangeShape(String),
    /// Surface material
    ChangeMaterial {
        #[serde(default)]
        is_metallic: bool,
        #[serde(default = "default_roughness")]
        roughness: f64,
    },
    /// Place the node, or the current matrix inside a push
    SetNode {
        position: [f64; 3],
        #[serde(default)]
        angles: [f64; 3],
    },
    /// Animate the node
    AnimateNode {
        position: [f64; 3],
        #[serde(default)]
        angles: [f64; 3],
        #[serde(default = "one")]
        scale: f64,
        #[serde(default = "animation_interval")]
        interval: f64,
    },
    /// Animate the whole scene
    AnimateGlobal {
        position: [f64; 3],
        #[serde(default)]
        angles: [f64; 3],
        #[serde(default = "one")]
        scale: f64,
        #[serde(default = "animation_interval")]
        interval: f64,
    },
    /// Save the matrix transform
    PushMatrix,
    /// Restore the matrix transform
    PopMatrix,
    /// Coloured box
    CreateBox {
        position: [f64; 3],
        #[serde(default)]
        color: Rgba,
    },
    /// Box using a catalog texture
    CreateTexturedBox { position: [f64; 3], texture: String },
    /// Remove the box at a cell
    RemoveBox { position: [f64; 3] },
    /// Text in the scene
    WriteSentence {
        text: String,
        position: [f64; 3],
        #[serde(default)]
        color: Rgba,
        #[serde(default)]
        font_size: Option<f64>,
        #[serde(default)]
        fixed_width: bool,
    },
    /// Light source
    SetLight {
        position: [f64; 3],
        #[serde(default)]
        color: Rgba,
        #[serde(default = "light_intensity")]
        intensity: f64,
        #[serde(default = "one")]
        interval: f64,
        /// `point`, `spot` or `directional`
        #[serde(default = "point_light")]
        light_type: String,
    },
    /// Opaque command token for the renderer
    SetCommand(String),
    /// Line of boxes between two points
    DrawLine {
        from: [f64; 3],
        to: [f64; 3],
        #[serde(default)]
        color: Rgba,
    },
    /// Start recording a frame
    FrameIn,
    /// Stop recording a frame
    FrameOut,
    /// Frame playback speed
    SetFrameFps(u32),
    /// Frame loop count
    SetFrameRepeats(u32),
    /// Place a catalog model
    CreateModel {
        model_name: String,
        entity_name: String,
        #[serde(default)]
        position: [f64; 3],
        #[serde(default)]
        angles: [f64; 3],
        #[serde(default = "one")]
        scale: f64,
    },
    /// Move a placed model
    MoveModel {
        entity_name: String,
        #[serde(default)]
        position: [f64; 3],
        #[serde(default)]
        angles: [f64; 3],
        #[serde(default = "one")]
        scale: f64,
    },
    /// Define a sprite appearance
    CreateSpriteTemplate { name: String, color_source: String },
    /// Show a sprite
    DisplaySprite {
        name: String,
        x: f64,
        y: f64,
        #[serde(default = "right")]
        direction: f64,
        #[serde(default)]
        scale: Option<f64>,
    },
    /// Show a sprite clone
    DisplaySpriteClone {
        name: String,
        clone_index: u32,
        x: f64,
        y: f64,
        #[serde(default = "right")]
        direction: f64,
        #[serde(default)]
        scale: Option<f64>,
    },
    /// How a sprite turns
    SetSpriteRotationStyle {
        name: String,
        /// `all around`, `left-right` or `don't rotate`
        style: String,
    },
    /// Default sprite scale
    SetSpriteScale { name: String, scale: f64 },
    /// Game overlay score
    SetGameScore(f64),
    /// Game overlay screen
    SetGameScreen {
        width: f64,
        height: f64,
        #[serde(default = "right")]
        angle: f64,
        #[serde(default)]
        color: Rgba,
    },
    /// Import voxels from a PLY file
    ImportMesh { path: String },
    /// Reset the scene
    ClearData,
    /// Send a snapshot, optionally renaming the record first
    SendData {
        #[serde(default)]
        name: Option<String>,
    },
}

/// What the caller should do after a command ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing beyond the scene update
    Applied,
    /// Build and send a snapshot
    Send,
}

/// Command failures
#[derive(Error, Debug)]
pub enum CommandError {
    /// The scene rejected the operation
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// A referenced file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn vec3(v: [f64; 3]) -> Vec3 {
    Vec3::new(v[0], v[1], v[2])
}

fn angles(v: [f64; 3]) -> Angles {
    Angles::new(v[0], v[1], v[2])
}

impl Command {
    /// Variant name, for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetRoomName(_) => "SetRoomName",
            Self::SetRecordName(_) => "SetRecordName",
            Self::SetBoxSize(_) => "SetBoxSize",
            Self::SetBuildInterval(_) => "SetBuildInterval",
            Self::ChangeShape(_) => "ChangeShape",
            Self::ChangeMaterial { .. } => "ChangeMaterial",
            Self::SetNode { .. } => "SetNode",
            Self::AnimateNode { .. } => "AnimateNode",
            Self::AnimateGlobal { .. } => "AnimateGlobal",
            Self::PushMatrix => "PushMatrix",
            Self::PopMatrix => "PopMatrix",
            Self::CreateBox { .. } => "CreateBox",
            Self::CreateTexturedBox { .. } => "CreateTexturedBox",
            Self::RemoveBox { .. } => "RemoveBox",
            Self::WriteSentence { .. } => "WriteSentence",
            Self::SetLight { .. } => "SetLight",
            Self::SetCommand(_) => "SetCommand",
            Self::DrawLine { .. } => "DrawLine",
            Self::FrameIn => "FrameIn",
            Self::FrameOut => "FrameOut",
            Self::SetFrameFps(_) => "SetFrameFps",
            Self::SetFrameRepeats(_) => "SetFrameRepeats",
            Self::CreateModel { .. } => "CreateModel",
            Self::MoveModel { .. } => "MoveModel",
            Self::CreateSpriteTemplate { .. } => "CreateSpriteTemplate",
            Self::DisplaySprite { .. } => "DisplaySprite",
            Self::DisplaySpriteClone { .. } => "DisplaySpriteClone",
            Self::SetSpriteRotationStyle { .. } => "SetSpriteRotationStyle",
            Self::SetSpriteScale { .. } => "SetSpriteScale",
            Self::SetGameScore(_) => "SetGameScore",
            Self::SetGameScreen { .. } => "SetGameScreen",
            Self::ImportMesh { .. } => "ImportMesh",
            Self::ClearData => "ClearData",
            Self::SendData { .. } => "SendData",
        }
    }

    /// Run the command against `state`
    pub fn apply(&self, state: &mut SceneState) -> Result<Outcome, CommandError> {
        match self {
            Self::SetRoomName(room) => state.set_room_name(room.as_str()),
            Self::SetRecordName(name) => state.set_record_name(name.as_str()),
            Self::SetBoxSize(size) => state.set_box_size(*size),
            Self::SetBuildInterval(interval) => state.set_build_interval(*interval),
            Self::ChangeShape(shape) => state.change_shape(shape.parse::<Shape>()?),
            Self::ChangeMaterial {
                is_metallic,
                roughness,
            } => state.change_material(*is_metallic, *roughness),
            Self::SetNode { position, angles: a } => state.set_node(vec3(*position), angles(*a)),
            Self::AnimateNode {
                position,
                angles: a,
                scale,
                interval,
            } => state.animate_node(vec3(*position), angles(*a), *scale, *interval),
            Self::AnimateGlobal {
                position,
                angles: a,
                scale,
                interval,
            } => state.animate_global(vec3(*position), angles(*a), *scale, *interval),
            Self::PushMatrix => state.push_matrix(),
            Self::PopMatrix => state.pop_matrix()?,
            Self::CreateBox { position, color } => {
                state.create_box(vec3(*position), (*color).into());
            }
            Self::CreateTexturedBox { position, texture } => {
                state.create_textured_box(vec3(*position), texture)?;
            }
            Self::RemoveBox { position } => state.remove_box(vec3(*position)),
            Self::WriteSentence {
                text,
                position,
                color,
                font_size,
                fixed_width,
            } => state.write_sentence(
                text.as_str(),
                vec3(*position),
                (*color).into(),
                *font_size,
                *fixed_width,
            ),
            Self::SetLight {
                position,
                color,
                intensity,
                interval,
                light_type,
            } => {
                let light_type = light_type.parse::<LightType>()?;
                let color = (*color).into();
                state.set_light(vec3(*position), color, *intensity, *interval, light_type);
            }
            Self::SetCommand(token) => state.set_command(token.as_str()),
            Self::DrawLine { from, to, color } => {
                let placed = state.draw_line(vec3(*from), vec3(*to), (*color).into());
                log::debug!("line placed {placed} boxes");
            }
            Self::FrameIn => state.frame_in(),
            Self::FrameOut => state.frame_out(),
            Self::SetFrameFps(fps) => state.set_frame_fps(*fps),
            Self::SetFrameRepeats(repeats) => state.set_frame_repeats(*repeats),
            Self::CreateModel {
                model_name,
                entity_name,
                position,
                angles: a,
                scale,
            } => {
                let position = vec3(*position);
                state.create_model(model_name, position, angles(*a), *scale, entity_name.as_str())?;
            }
            Self::MoveModel {
                entity_name,
                position,
                angles: a,
                scale,
            } => state.move_model(entity_name, vec3(*position), angles(*a), *scale)?,
            Self::CreateSpriteTemplate { name, color_source } => {
                state.create_sprite_template(name.as_str(), color_source.as_str());
            }
            Self::DisplaySprite {
                name,
                x,
                y,
                direction,
                scale,
            } => state.display_sprite(name, *x, *y, *direction, *scale)?,
            Self::DisplaySpriteClone {
                name,
                clone_index,
                x,
                y,
                direction,
                scale,
            } => state.display_sprite_clone(name, *clone_index, *x, *y, *direction, *scale)?,
            Self::SetSpriteRotationStyle { name, style } => {
                state.set_sprite_rotation_style(name.as_str(), style.parse::<RotationStyle>()?);
            }
            Self::SetSpriteScale { name, scale } => state.set_sprite_scale(name.as_str(), *scale),
            Self::SetGameScore(score) => state.set_game_score(*score),
            Self::SetGameScreen {
                width,
                height,
                angle,
                color,
            } => state.set_game_screen(*width, *height, *angle, (*color).into()),
            Self::ImportMesh { path } => {
                let text = std::fs::read_to_string(path).map_err(|source| CommandError::Io {
                    path: path.clone(),
                    source,
                })?;
                state.import_mesh(&text)?;
            }
            Self::ClearData => state.clear(),
            Self::SendData { name } => {
                if let Some(name) = name {
                    state.set_record_name(name.as_str());
                }
                return Ok(Outcome::Send);
            }
        }
        Ok(Outcome::Applied)
    }
}
