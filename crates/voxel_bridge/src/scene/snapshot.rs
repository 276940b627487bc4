//! Wire snapshot of a scene
//!
//! Every key is always present. Empty collections go out as `[]`, the
//! optional game score and screen as empty arrays when unset.

use serde::{Serialize, Serializer};

use super::entities::{
    Animation, FrameTransform, FramedBox, GameScreen, Light, Model, ModelMove, Num, Sentence,
    Shape, VoxelBox,
};
use super::sprites::{SpriteMove, SpriteTemplate};
use super::transform_stack::TransformFrame;

/// Scene serialized for the renderer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Current node placement
    pub node_transform: TransformFrame,
    /// Placement set inside the innermost push
    pub matrix_transform: TransformFrame,
    /// Node placements recorded per animation frame
    pub frame_transforms: Vec<FrameTransform>,
    /// Animation applied to the whole scene
    pub global_animation: Animation,
    /// Animation applied to the node
    pub animation: Animation,
    /// Boxes outside any frame
    pub boxes: Vec<VoxelBox>,
    /// Boxes tagged with their frame id
    pub frames: Vec<FramedBox>,
    /// Text placed in the scene
    pub sentences: Vec<Sentence>,
    /// Light sources
    pub lights: Vec<Light>,
    /// Opaque renderer command tokens
    pub commands: Vec<String>,
    /// Placed catalog models
    pub models: Vec<Model>,
    /// Moves of placed models
    pub model_moves: Vec<ModelMove>,
    /// Sprite templates
    pub sprites: Vec<SpriteTemplate>,
    /// Sprite placements with their clones merged in
    pub sprite_moves: Vec<SpriteMove>,
    /// `[score]` once a score is set
    #[serde(serialize_with = "numbers")]
    pub game_score: Vec<f64>,
    /// Game overlay screen, `[]` when unset
    #[serde(serialize_with = "screen")]
    pub game_screen: Option<GameScreen>,
    /// Voxel edge length
    #[serde(serialize_with = "number")]
    pub size: f64,
    /// Primitive used for voxels
    pub shape: Shape,
    /// Delay between boxes while building
    #[serde(serialize_with = "number")]
    pub interval: f64,
    /// 1 for a metallic material
    pub is_metallic: u8,
    /// Material roughness
    #[serde(serialize_with = "number")]
    pub roughness: f64,
    /// 1 when positions were kept at two decimals
    pub is_allowed_float: u8,
    /// Record name
    pub name: String,
    /// RFC 3339 timestamp of the send
    pub date: String,
}

impl Snapshot {
    /// Encode as a JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    Num(*value).serialize(serializer)
}

fn numbers<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(values.iter().map(|v| Num(*v)))
}

fn screen<S: Serializer>(value: &Option<GameScreen>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(screen) => screen.serialize(serializer),
        None => serializer.collect_seq(std::iter::empty::<Num>()),
    }
}
