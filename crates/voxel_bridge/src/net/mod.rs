//! # Net Module
//!
//! Delivery of snapshots to the renderer relay.
//!
//! - **Connection**: the lifecycle state machine, free of I/O
//! - **Websocket**: the tokio task that carries out its decisions
//! - **Error**: transport failures

pub mod connection;
pub mod error;
pub mod websocket;

pub use connection::{ConnectionMachine, ConnectionState, TransportAction};
pub use error::DispatchError;
pub use websocket::{ErrorCallback, WebSocketDispatcher};
