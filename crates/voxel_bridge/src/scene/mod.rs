//! # Scene Module
//!
//! The voxel scene accumulator and its wire snapshot.
//!
//! ## Organization
//!
//! - **State**: `SceneState`, the single mutable accumulator
//! - **Entities**: boxes, sentences, lights, models and the game overlay
//! - **Transforms**: node and push/pop matrix transforms
//! - **Sprites**: templates, placements and clones
//! - **Quantize**: grid versus float coordinate modes
//! - **Snapshot**: the JSON document sent to the renderer

pub mod entities;
pub mod error;
pub mod quantize;
pub mod snapshot;
pub mod sprites;
pub mod state;
pub mod transform_stack;

pub use entities::{Angles, Color, LightType, Shape};
pub use error::SceneError;
pub use quantize::NumberMode;
pub use snapshot::Snapshot;
pub use sprites::RotationStyle;
pub use state::SceneState;
pub use transform_stack::{TransformFrame, TransformStack};
