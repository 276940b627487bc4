//! Connection lifecycle
//!
//! `ConnectionMachine` decides what happens to each snapshot without touching
//! a socket. It is fed requests, socket events and the current instant, and
//! answers with [`TransportAction`]s for the driver to carry out. Every
//! connection attempt gets a new generation number; events carrying an older
//! generation are ignored.
//!
//! Under [`PendingPolicy::Chain`] a snapshot for another room that arrives
//! while a connection is opening waits in a deferred queue. Once the opening
//! connection has joined and flushed its own queue, the deferred snapshots are
//! replayed, which closes it and connects to the next room.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::core::config::{DispatchMode, PendingPolicy, TransportConfig};
use crate::foundation::time::{IdleTimer, IntervalTimer};

/// Socket state as seen by callers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection has been attempted yet
    #[default]
    Absent,
    /// Handshake in progress
    Connecting,
    /// Joined and ready to send
    Open,
    /// Closed after idling or after an error
    Closed,
}

/// Work for the socket driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportAction {
    /// Open a new connection
    Connect { url: String, generation: u64 },
    /// Write one text frame on the connection of `generation`
    SendText { generation: u64, text: String },
    /// Close the connection of `generation`
    Close { generation: u64 },
}

struct IntervalQueue {
    timer: IntervalTimer,
    queue: VecDeque<(String, String)>,
}

/// Pure connection state machine
pub struct ConnectionMachine {
    url: String,
    policy: PendingPolicy,
    max_pending: usize,
    state: ConnectionState,
    generation: u64,
    room: String,
    pending: VecDeque<String>,
    deferred: VecDeque<(String, String)>,
    idle: IdleTimer,
    interval: Option<IntervalQueue>,
    dropped: usize,
}

impl ConnectionMachine {
    /// Machine with no connection
    pub fn new(config: &TransportConfig, now: Instant) -> Self {
        let interval = match config.mode {
            DispatchMode::Direct => None,
            DispatchMode::IntervalQueue { period_ms } => Some(IntervalQueue {
                timer: IntervalTimer::new(Duration::from_millis(period_ms), now),
                queue: VecDeque::new(),
            }),
        };
        Self {
            url: config.server_url.clone(),
            policy: config.pending_policy,
            max_pending: config.max_pending.max(1),
            state: ConnectionState::Absent,
            generation: 0,
            room: String::new(),
            pending: VecDeque::new(),
            deferred: VecDeque::new(),
            idle: IdleTimer::new(config.idle_timeout()),
            interval,
            dropped: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Generation of the latest connection attempt
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `generation` is the latest attempt
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation && self.state != ConnectionState::Absent
    }

    /// Snapshots waiting for a socket to open, including those held for the next room
    pub fn pending_len(&self) -> usize {
        self.pending.len() + self.deferred.len()
    }

    /// Snapshots lost to the pending bound or to a failed connection
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Room joined by the current connection
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Nothing in flight and nothing queued
    pub fn is_settled(&self) -> bool {
        matches!(self.state, ConnectionState::Absent | ConnectionState::Closed)
            && self.interval.as_ref().map_or(true, |i| i.queue.is_empty())
    }

    /// Earliest instant at which [`poll`](Self::poll) has work
    pub fn next_deadline(&self) -> Option<Instant> {
        let tick = self
            .interval
            .as_ref()
            .filter(|i| !i.queue.is_empty())
            .map(|i| i.timer.deadline());
        match (self.idle.deadline(), tick) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Accept a snapshot for `room`
    pub fn submit(&mut self, room: &str, payload: String, now: Instant) -> Vec<TransportAction> {
        match self.interval.as_mut() {
            Some(interval) => {
                if interval.queue.is_empty() {
                    // Idle ticker: first message waits one full period
                    interval.timer = IntervalTimer::new(interval.timer.period(), now);
                }
                interval.queue.push_back((room.to_string(), payload));
                Vec::new()
            }
            None => self.dispatch(room, payload, now),
        }
    }

    fn dispatch(&mut self, room: &str, payload: String, now: Instant) -> Vec<TransportAction> {
        match self.state {
            ConnectionState::Open if self.room == room => {
                self.idle.restart(now);
                vec![TransportAction::SendText {
                    generation: self.generation,
                    text: payload,
                }]
            }
            ConnectionState::Open => {
                log::info!("room changed from {} to {room}; reconnecting", self.room);
                let mut actions = vec![TransportAction::Close {
                    generation: self.generation,
                }];
                actions.extend(self.connect(room, payload));
                actions
            }
            ConnectionState::Connecting if self.room == room => {
                self.enqueue(payload);
                Vec::new()
            }
            ConnectionState::Connecting if self.policy == PendingPolicy::Chain => {
                self.defer(room, payload);
                Vec::new()
            }
            ConnectionState::Connecting | ConnectionState::Absent | ConnectionState::Closed => {
                self.connect(room, payload)
            }
        }
    }

    fn connect(&mut self, room: &str, payload: String) -> Vec<TransportAction> {
        self.generation += 1;
        self.state = ConnectionState::Connecting;
        self.room = room.to_string();
        self.idle.cancel();
        if !self.pending.is_empty() {
            log::debug!("replacing {} pending snapshot(s) with the latest", self.pending.len());
        }
        self.pending.clear();
        self.pending.push_back(payload);
        log::info!("connecting to {} (room {room}, generation {})", self.url, self.generation);
        vec![TransportAction::Connect {
            url: self.url.clone(),
            generation: self.generation,
        }]
    }

    fn enqueue(&mut self, payload: String) {
        match self.policy {
            PendingPolicy::Coalesce => {
                if !self.pending.is_empty() {
                    log::debug!(
                        "replacing {} pending snapshot(s) with the latest",
                        self.pending.len()
                    );
                }
                self.pending.clear();
            }
            PendingPolicy::Chain => {
                if self.pending.len() >= self.max_pending {
                    self.pending.pop_front();
                    self.dropped += 1;
                    log::warn!(
                        "pending queue full ({} snapshots); dropped the oldest",
                        self.max_pending
                    );
                }
            }
        }
        self.pending.push_back(payload);
    }

    fn defer(&mut self, room: &str, payload: String) {
        if self.deferred.len() >= self.max_pending {
            self.deferred.pop_front();
            self.dropped += 1;
            log::warn!(
                "deferred queue full ({} snapshots); dropped the oldest",
                self.max_pending
            );
        }
        log::debug!("snapshot for room {room} waits for room {} to flush", self.room);
        self.deferred.push_back((room.to_string(), payload));
    }

    /// Handshake finished: join the room, then flush the queue in order
    pub fn on_open(&mut self, generation: u64, now: Instant) -> Vec<TransportAction> {
        if generation != self.generation || self.state != ConnectionState::Connecting {
            log::debug!("ignoring open of stale connection {generation}");
            return Vec::new();
        }
        self.state = ConnectionState::Open;
        log::info!("connected; joining room {}", self.room);

        let mut actions = Vec::with_capacity(self.pending.len() + 1);
        actions.push(TransportAction::SendText {
            generation,
            text: self.room.clone(),
        });
        actions.extend(
            self.pending
                .drain(..)
                .map(|text| TransportAction::SendText { generation, text }),
        );
        self.idle.restart(now);

        // Snapshots held for other rooms go out in submission order
        for (room, payload) in std::mem::take(&mut self.deferred) {
            actions.extend(self.dispatch(&room, payload, now));
        }
        actions
    }

    /// The connection of `generation` failed. Returns false for stale events.
    pub fn on_failure(&mut self, generation: u64) -> bool {
        if generation != self.generation
            || !matches!(self.state, ConnectionState::Connecting | ConnectionState::Open)
        {
            return false;
        }
        let lost = self.pending_len();
        if lost > 0 {
            log::warn!("dropping {lost} pending snapshot(s) after failure");
            self.dropped += lost;
        }
        self.abandon();
        true
    }

    /// The peer closed the connection of `generation`. Returns false for stale events.
    pub fn on_remote_close(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.state != ConnectionState::Open {
            return false;
        }
        log::info!("server closed the connection");
        self.abandon();
        true
    }

    fn abandon(&mut self) {
        self.state = ConnectionState::Closed;
        self.pending.clear();
        self.deferred.clear();
        self.idle.cancel();
    }

    /// Fire due timers
    pub fn poll(&mut self, now: Instant) -> Vec<TransportAction> {
        let mut actions = Vec::new();

        if self.idle.take_expired(now) && self.state == ConnectionState::Open {
            log::info!("idle for {:?}; closing connection", self.idle.delay());
            self.state = ConnectionState::Closed;
            actions.push(TransportAction::Close {
                generation: self.generation,
            });
        }

        let mut next = None;
        if let Some(interval) = self.interval.as_mut() {
            if !interval.queue.is_empty() && interval.timer.take_tick(now) {
                next = interval.queue.pop_front();
            }
        }
        if let Some((room, payload)) = next {
            actions.extend(self.dispatch(&room, payload, now));
        }
        actions
    }
}
