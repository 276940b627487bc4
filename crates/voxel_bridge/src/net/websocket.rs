//! Websocket driver
//!
//! A single tokio task owns the socket and the [`ConnectionMachine`]. Callers
//! hand it snapshots through an unbounded channel, so sending never blocks,
//! and watch its state through a `watch` channel. The handshake and the
//! reader half run in helper tasks that report back tagged with their
//! connection generation.

use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::connection::{ConnectionMachine, ConnectionState, TransportAction};
use super::error::DispatchError;
use crate::core::config::TransportConfig;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type SocketSink = SplitSink<Socket, Message>;

/// Called with every transport failure
pub type ErrorCallback = Arc<dyn Fn(&DispatchError) + Send + Sync>;

enum Request {
    Send { room: String, payload: String },
    Flush(oneshot::Sender<()>),
    Shutdown,
}

enum SocketEvent {
    Opened { generation: u64, sink: SocketSink },
    Failed { generation: u64, error: DispatchError },
    Closed { generation: u64 },
}

/// Handle to the dispatcher task
pub struct WebSocketDispatcher {
    requests: mpsc::UnboundedSender<Request>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl WebSocketDispatcher {
    /// Start the dispatcher task. Must be called inside a tokio runtime.
    pub fn spawn(config: &TransportConfig, on_error: Option<ErrorCallback>) -> Self {
        let (requests, request_rx) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Absent);

        let driver = Driver {
            machine: ConnectionMachine::new(config, Instant::now().into_std()),
            requests: request_rx,
            events,
            event_rx,
            sink: None,
            state: state_tx,
            on_error,
            flush_waiters: Vec::new(),
        };
        let task = tokio::spawn(driver.run());

        Self {
            requests,
            state,
            task,
        }
    }

    /// Queue a snapshot for `room`
    pub fn send(&self, room: &str, payload: String) -> Result<(), DispatchError> {
        self.requests
            .send(Request::Send {
                room: room.to_string(),
                payload,
            })
            .map_err(|_| DispatchError::ChannelClosed)
    }

    /// Latest connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver for state changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Wait until every queued snapshot has been sent and the connection has
    /// closed, either by idling out or by failing
    pub async fn flush(&self) -> Result<(), DispatchError> {
        let (done, wait) = oneshot::channel();
        self.requests
            .send(Request::Flush(done))
            .map_err(|_| DispatchError::ChannelClosed)?;
        wait.await.map_err(|_| DispatchError::ChannelClosed)
    }

    /// Close any open connection and stop the task
    pub async fn shutdown(self) {
        if self.requests.send(Request::Shutdown).is_ok() {
            if let Err(e) = self.task.await {
                log::error!("dispatcher task ended abnormally: {e}");
            }
        }
    }
}

struct Driver {
    machine: ConnectionMachine,
    requests: mpsc::UnboundedReceiver<Request>,
    events: mpsc::UnboundedSender<SocketEvent>,
    event_rx: mpsc::UnboundedReceiver<SocketEvent>,
    sink: Option<(u64, SocketSink)>,
    state: watch::Sender<ConnectionState>,
    on_error: Option<ErrorCallback>,
    flush_waiters: Vec<oneshot::Sender<()>>,
}

impl Driver {
    async fn run(mut self) {
        loop {
            let deadline = self.machine.next_deadline().map(Instant::from_std);
            tokio::select! {
                request = self.requests.recv() => match request {
                    Some(Request::Send { room, payload }) => {
                        let now = Instant::now().into_std();
                        let actions = self.machine.submit(&room, payload, now);
                        self.execute(actions).await;
                    }
                    Some(Request::Flush(done)) => self.flush_waiters.push(done),
                    Some(Request::Shutdown) | None => break,
                },
                Some(event) = self.event_rx.recv() => self.handle_event(event).await,
                () = sleep_until(deadline) => {
                    let actions = self.machine.poll(Instant::now().into_std());
                    self.execute(actions).await;
                }
            }
            self.publish();
        }

        if let Some((_, mut sink)) = self.sink.take() {
            if let Err(e) = sink.close().await {
                log::debug!("close on shutdown failed: {e}");
            }
        }
        self.flush_waiters.clear();
        log::debug!("dispatcher stopped");
    }

    fn publish(&mut self) {
        let state = self.machine.state();
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });

        if self.machine.is_settled() {
            for done in self.flush_waiters.drain(..) {
                let _ = done.send(());
            }
        }
    }

    async fn execute(&mut self, actions: Vec<TransportAction>) {
        for action in actions {
            match action {
                TransportAction::Connect { url, generation } => self.connect(url, generation),
                TransportAction::SendText { generation, text } => {
                    self.send_text(generation, text).await;
                }
                TransportAction::Close { generation } => self.close(generation).await,
            }
        }
    }

    fn connect(&self, url: String, generation: u64) {
        let events = self.events.clone();
        tokio::spawn(async move {
            let stream = match tokio_tungstenite::connect_async(url.as_str()).await {
                Ok((stream, _response)) => stream,
                Err(e) => {
                    let error = DispatchError::Connect {
                        url,
                        message: e.to_string(),
                    };
                    let _ = events.send(SocketEvent::Failed { generation, error });
                    return;
                }
            };

            let (sink, mut reader) = stream.split();
            if events.send(SocketEvent::Opened { generation, sink }).is_err() {
                return;
            }
            while let Some(frame) = reader.next().await {
                match frame {
                    Ok(Message::Close(_)) => break,
                    Ok(other) => log::trace!("ignoring inbound frame: {other:?}"),
                    Err(e) => {
                        let error = DispatchError::Connection(e.to_string());
                        let _ = events.send(SocketEvent::Failed { generation, error });
                        return;
                    }
                }
            }
            let _ = events.send(SocketEvent::Closed { generation });
        });
    }

    async fn send_text(&mut self, generation: u64, text: String) {
        let result = match self.sink.as_mut() {
            Some((current, sink)) if *current == generation => {
                sink.send(Message::Text(text.into())).await
            }
            _ => {
                log::warn!("no open socket for generation {generation}; frame dropped");
                return;
            }
        };
        if let Err(e) = result {
            self.fail(generation, DispatchError::Send(e.to_string()));
        }
    }

    async fn close(&mut self, generation: u64) {
        if !matches!(&self.sink, Some((current, _)) if *current == generation) {
            return;
        }
        if let Some((_, mut sink)) = self.sink.take() {
            if let Err(e) = sink.close().await {
                log::debug!("close of connection {generation} failed: {e}");
            }
        }
    }

    async fn handle_event(&mut self, event: SocketEvent) {
        match event {
            SocketEvent::Opened { generation, mut sink } => {
                if !self.machine.is_current(generation)
                    || self.machine.state() != ConnectionState::Connecting
                {
                    log::debug!("closing stale connection {generation}");
                    let _ = sink.close().await;
                    return;
                }
                self.sink = Some((generation, sink));
                let actions = self.machine.on_open(generation, Instant::now().into_std());
                self.execute(actions).await;
            }
            SocketEvent::Failed { generation, error } => self.fail(generation, error),
            SocketEvent::Closed { generation } => {
                if self.machine.on_remote_close(generation) {
                    self.sink = None;
                }
            }
        }
    }

    fn fail(&mut self, generation: u64, error: DispatchError) {
        if !self.machine.on_failure(generation) {
            log::debug!("ignoring failure of stale connection {generation}: {error}");
            return;
        }
        self.sink = None;
        log::error!("{error}");
        if let Some(callback) = &self.on_error {
            callback(&error);
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
