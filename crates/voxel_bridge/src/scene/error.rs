//! Scene accumulator errors

use thiserror::Error;

use crate::assets::MeshError;

/// Errors raised synchronously by scene operations.
///
/// None of them poison the scene: the offending entity is skipped and later
/// commands run normally.
#[derive(Error, Debug)]
pub enum SceneError {
    /// `pop_matrix` with nothing pushed
    #[error("transform stack underflow: pop_matrix called with no matching push_matrix")]
    StackUnderflow,

    /// Texture name not present in the texture catalog
    #[error("unknown texture: {0}")]
    UnknownTexture(String),

    /// Model name not present in the model catalog
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// Model entity moved before being created
    #[error("unknown model entity: {0}")]
    UnknownEntity(String),

    /// Sprite displayed before its template was created
    #[error("unknown sprite: {0}")]
    UnknownSprite(String),

    /// Light type outside point/spot/directional
    #[error("invalid light type: {0}")]
    InvalidLightType(String),

    /// Rotation style outside the three supported styles
    #[error("invalid rotation style: {0}")]
    InvalidRotationStyle(String),

    /// Shape outside box/sphere/plane
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// Mesh import failed
    #[error("mesh import failed: {0}")]
    Mesh(#[from] MeshError),
}
