//! Scene plus transport
//!
//! `Bridge` owns the scene accumulator and a [`SnapshotTransport`]. Commands
//! mutate the scene synchronously; `send_data` stamps a snapshot and hands it
//! to the transport without waiting for delivery.

use chrono::{SecondsFormat, Utc};
use thiserror::Error;

use crate::commands::{Command, CommandError, Outcome};
use crate::core::config::{BridgeConfig, ConfigError, SceneConfig};
use crate::net::{DispatchError, ErrorCallback, WebSocketDispatcher};
use crate::scene::{SceneError, SceneState};

/// Destination of encoded snapshots
pub trait SnapshotTransport {
    /// Hand `payload` over for delivery to `room`; must not block on the network
    fn dispatch(&mut self, room: &str, payload: String) -> Result<(), DispatchError>;
}

impl SnapshotTransport for WebSocketDispatcher {
    fn dispatch(&mut self, room: &str, payload: String) -> Result<(), DispatchError> {
        self.send(room, payload)
    }
}

/// Keeps every snapshot in memory instead of sending it
#[derive(Debug, Default)]
pub struct RecordingTransport {
    /// `(room, payload)` pairs in dispatch order
    pub sent: Vec<(String, String)>,
}

impl SnapshotTransport for RecordingTransport {
    fn dispatch(&mut self, room: &str, payload: String) -> Result<(), DispatchError> {
        self.sent.push((room.to_string(), payload));
        Ok(())
    }
}

/// Bridge-level errors
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Configuration could not be loaded or is invalid
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A scene operation was rejected
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// A command failed
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// The snapshot could not be handed to the transport
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Tally of a script run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptReport {
    /// Commands that ran
    pub applied: usize,
    /// Commands that failed and were skipped
    pub failed: usize,
    /// Snapshots handed to the transport
    pub sent: usize,
}

/// Current time in the snapshot `date` format
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Scene accumulator bound to a transport
pub struct Bridge<T: SnapshotTransport> {
    state: SceneState,
    transport: T,
}

impl Bridge<WebSocketDispatcher> {
    /// Bridge that sends over a websocket. Must be called inside a tokio runtime.
    pub fn connect(
        config: &BridgeConfig,
        on_error: Option<ErrorCallback>,
    ) -> Result<Self, BridgeError> {
        config.validate()?;
        log::info!(
            "bridge ready: room {}, relay {}",
            config.scene.room_name,
            config.transport.server_url
        );
        let dispatcher = WebSocketDispatcher::spawn(&config.transport, on_error);
        Ok(Self::new(&config.scene, dispatcher))
    }
}

impl<T: SnapshotTransport> Bridge<T> {
    /// Empty scene bound to `transport`
    pub fn new(config: &SceneConfig, transport: T) -> Self {
        Self {
            state: SceneState::new(config),
            transport,
        }
    }

    /// The scene
    pub fn state(&self) -> &SceneState {
        &self.state
    }

    /// The scene, mutably
    pub fn state_mut(&mut self) -> &mut SceneState {
        &mut self.state
    }

    /// The transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Give up the scene and return the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Snapshot the scene and hand it to the transport.
    ///
    /// `name` replaces the record name when given. Returns once the snapshot
    /// is queued; delivery failures are reported by the transport.
    pub fn send_data(&mut self, name: Option<&str>) -> Result<(), BridgeError> {
        if let Some(name) = name {
            self.state.set_record_name(name);
        }
        let snapshot = self.state.snapshot(timestamp());
        let payload = snapshot
            .to_json()
            .map_err(|e| DispatchError::Serialize(e.to_string()))?;
        log::debug!(
            "sending snapshot to room {} ({} boxes, {} bytes)",
            self.state.room_name(),
            snapshot.boxes.len(),
            payload.len()
        );
        self.transport.dispatch(self.state.room_name(), payload)?;
        Ok(())
    }

    /// Run one command, sending when it asks for it
    pub fn apply(&mut self, command: &Command) -> Result<Outcome, BridgeError> {
        let outcome = command.apply(&mut self.state)?;
        if outcome == Outcome::Send {
            // The record name was already applied by the command
            self.send_data(None)?;
        }
        Ok(outcome)
    }

    /// Run a script. Failing commands are logged and skipped.
    pub fn run_script(&mut self, commands: &[Command]) -> ScriptReport {
        let mut report = ScriptReport::default();
        for (index, command) in commands.iter().enumerate() {
            match self.apply(command) {
                Ok(outcome) => {
                    report.applied += 1;
                    if outcome == Outcome::Send {
                        report.sent += 1;
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    log::warn!("command {index} ({}) skipped: {e}", command.name());
                }
            }
        }
        report
    }
}
