//! # Core Module
//!
//! Shared configuration for the scene accumulator and the dispatcher.
//!
//! ## Organization
//!
//! - **Config**: Unified configuration for scene catalogs, transport and logging

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;

pub use config::{
    BridgeConfig,
    SceneConfig,
    TransportConfig,
    LoggingConfig,
    DispatchMode,
    PendingPolicy,
    Config,
    ConfigError,
};
