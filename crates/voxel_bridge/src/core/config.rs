//! # Unified Configuration System
//!
//! All tunables for the bridge in one place: the scene catalogs the
//! accumulator validates against, the transport policy of the dispatcher and
//! the default log filter.
//!
//! Every section has defaults so a config file only needs the keys it
//! changes:
//!
//! ```toml
//! [scene]
//! room_name = "2048"
//!
//! [transport]
//! server_url = "ws://127.0.0.1:8080"
//! idle_timeout_ms = 5000
//! pending_policy = "coalesce"
//! ```

use serde::{Serialize, Deserialize};
use std::time::Duration;

pub use crate::config::{Config, ConfigError};

/// Default renderer relay endpoint
pub const DEFAULT_SERVER_URL: &str = "wss://websocket.voxelamming.com";

/// Default room joined when nothing else is configured
pub const DEFAULT_ROOM_NAME: &str = "1000";

/// # Scene Configuration
///
/// Catalogs that named entities are checked against, plus text defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Room joined on connect until a command changes it
    pub room_name: String,
    /// Texture names; a texture's wire id is its index here
    pub texture_names: Vec<String>,
    /// Models the renderer knows how to load
    pub model_names: Vec<String>,
    /// Font size for sentences written without one
    pub font_size: f64,
}

impl SceneConfig {
    /// Set the initial room
    pub fn with_room_name(mut self, room: impl Into<String>) -> Self {
        self.room_name = room.into();
        self
    }

    /// Replace the texture catalog
    pub fn with_textures<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.texture_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the model catalog
    pub fn with_models<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.model_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.room_name.trim().is_empty() {
            return Err("Room name cannot be empty".to_string());
        }
        if self.font_size <= 0.0 {
            return Err("Font size must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            room_name: DEFAULT_ROOM_NAME.to_string(),
            texture_names: ["grass", "stone", "dirt", "planks", "bricks"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            model_names: ["Earth", "ToyBiplane", "Ship"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            font_size: 16.0,
        }
    }
}

/// What happens to snapshots issued while a connection is still opening
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingPolicy {
    /// Every queued snapshot is sent in order once the socket opens
    #[default]
    Chain,
    /// Only the most recent snapshot survives
    Coalesce,
}

/// How send requests are bound to the socket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Send as soon as the socket allows it
    #[default]
    Direct,
    /// Queue every request; drain one per period
    IntervalQueue {
        /// Drain period in milliseconds
        period_ms: u64,
    },
}

/// # Transport Configuration
///
/// Socket endpoint and lifecycle policy for the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// `ws://` or `wss://` endpoint of the relay
    pub server_url: String,
    /// Quiet period after the last send before the socket is closed
    pub idle_timeout_ms: u64,
    /// Queue policy while connecting
    pub pending_policy: PendingPolicy,
    /// Upper bound of snapshots held while connecting
    pub max_pending: usize,
    /// Direct binding or interval queue
    pub mode: DispatchMode,
}

impl TransportConfig {
    /// Point at a different relay
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    /// Set the idle timeout
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the pending policy
    pub fn with_pending_policy(mut self, policy: PendingPolicy) -> Self {
        self.pending_policy = policy;
        self
    }

    /// Set the dispatch mode
    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Idle timeout as a duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let url = url::Url::parse(&self.server_url)
            .map_err(|e| format!("Invalid server url {}: {e}", self.server_url))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(format!("Server url must use ws or wss, got {}", url.scheme()));
        }
        if self.idle_timeout_ms == 0 {
            return Err("Idle timeout must be at least 1 ms".to_string());
        }
        if self.max_pending == 0 {
            return Err("Max pending must be at least 1".to_string());
        }
        if let DispatchMode::IntervalQueue { period_ms: 0 } = self.mode {
            return Err("Interval queue period must be at least 1 ms".to_string());
        }
        Ok(())
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            idle_timeout_ms: 2000,
            pending_policy: PendingPolicy::default(),
            max_pending: 16,
            mode: DispatchMode::default(),
        }
    }
}

/// # Logging Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// # Complete Bridge Configuration
///
/// Top-level configuration that encompasses every subsystem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Scene catalogs and defaults
    pub scene: SceneConfig,
    /// Dispatcher settings
    pub transport: TransportConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scene.validate().map_err(ConfigError::Invalid)?;
        self.transport.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }
}

impl Config for BridgeConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scene.room_name, "1000");
        assert_eq!(config.transport.idle_timeout(), Duration::from_secs(2));
        assert_eq!(config.transport.pending_policy, PendingPolicy::Chain);
    }

    #[test]
    fn test_partial_toml() {
        let text = r#"
            [scene]
            room_name = "2048"

            [transport]
            server_url = "ws://127.0.0.1:9000"
            pending_policy = "coalesce"
            mode = { interval_queue = { period_ms = 250 } }
        "#;
        let config = BridgeConfig::parse("bridge.toml", text).unwrap();
        assert_eq!(config.scene.room_name, "2048");
        assert_eq!(config.scene.texture_names.len(), 5);
        assert_eq!(config.transport.pending_policy, PendingPolicy::Coalesce);
        assert_eq!(config.transport.mode, DispatchMode::IntervalQueue { period_ms: 250 });
        assert_eq!(config.transport.idle_timeout_ms, 2000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_ron_round_trip() {
        let config = BridgeConfig {
            transport: TransportConfig::default().with_pending_policy(PendingPolicy::Coalesce),
            ..Default::default()
        };
        let text = ron::ser::to_string(&config).unwrap();
        let parsed = BridgeConfig::parse("bridge.ron", &text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_rejects_bad_transport() {
        let http = TransportConfig::default().with_server_url("http://example.com");
        assert!(http.validate().is_err());

        let zero =
            TransportConfig::default().with_mode(DispatchMode::IntervalQueue { period_ms: 0 });
        assert!(zero.validate().is_err());

        let config = BridgeConfig {
            transport: TransportConfig { max_pending: 0, ..Default::default() },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_saved_toml_loads_back() {
        let config = BridgeConfig {
            transport: TransportConfig::default()
                .with_mode(DispatchMode::IntervalQueue { period_ms: 50 }),
            ..Default::default()
        };
        let path = std::env::temp_dir().join(format!("voxel_bridge_{}.toml", std::process::id()));
        let path = path.to_string_lossy().into_owned();

        config.save_to_file(&path).unwrap();
        let loaded = BridgeConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = BridgeConfig::parse("bridge.yaml", "");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
