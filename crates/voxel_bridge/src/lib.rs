//! # Voxel Bridge
//!
//! Builds voxel scenes from imperative commands and streams them to a remote
//! renderer over a websocket.
//!
//! ## Features
//!
//! - **Scene Accumulator**: boxes, text, lights, models, sprites and frames
//! - **Transform Stack**: nested push/pop matrices with composed rotations
//! - **Mesh Import**: voxel meshes exported as PLY
//! - **Dispatcher**: connection lifecycle with idle close and queue policies
//! - **Scripts**: RON command lists
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use voxel_bridge::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), BridgeError> {
//!     let config = BridgeConfig::default();
//!     let mut bridge = Bridge::connect(&config, None)?;
//!
//!     bridge.state_mut().create_box(Vec3::new(0.0, 0.0, 0.0), Color::new(1.0, 0.0, 0.0, 1.0));
//!     bridge.send_data(Some("hello"))?;
//!
//!     bridge.transport().flush().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;

pub mod foundation;
pub mod config;
pub mod assets;
pub mod scene;
pub mod commands;
pub mod net;

mod bridge;

pub use bridge::{
    timestamp, Bridge, BridgeError, RecordingTransport, ScriptReport, SnapshotTransport,
};

/// Common imports for bridge users
pub mod prelude {
    pub use crate::{
        Bridge, BridgeError, RecordingTransport, ScriptReport, SnapshotTransport,
        commands::{Command, Outcome, Rgba},
        core::{BridgeConfig, Config, SceneConfig, TransportConfig},
        foundation::math::Vec3,
        net::{ConnectionState, DispatchError, WebSocketDispatcher},
        scene::{Angles, Color, LightType, RotationStyle, SceneError, SceneState, Shape},
    };
}
