//! Dispatcher errors

use thiserror::Error;

/// Failures on the send path.
///
/// Connection failures are reported through the error callback and the log;
/// the connection is abandoned and nothing is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The dispatcher task has stopped
    #[error("dispatcher is no longer running")]
    ChannelClosed,

    /// The websocket handshake failed
    #[error("failed to connect to {url}: {message}")]
    Connect { url: String, message: String },

    /// Writing a frame failed
    #[error("failed to send frame: {0}")]
    Send(String),

    /// The open connection broke
    #[error("connection lost: {0}")]
    Connection(String),

    /// The snapshot could not be encoded
    #[error("failed to encode snapshot: {0}")]
    Serialize(String),
}
