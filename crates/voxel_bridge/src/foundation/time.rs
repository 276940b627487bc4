//! Time management utilities
//!
//! Deadline-style timers. They never sleep themselves; the owner asks for the
//! next deadline and polls with the current instant, which keeps the
//! connection state machine deterministic under test.

use std::time::{Duration, Instant};

/// Countdown that is restarted on activity and expires after a quiet period
#[derive(Debug, Clone)]
pub struct IdleTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl IdleTimer {
    /// Create a stopped timer with the given quiet period
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Start the countdown, or push it back if already running
    pub fn restart(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Stop the countdown
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Whether the countdown is running
    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    /// Instant at which the timer fires, if running
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true once when the deadline has passed, stopping the timer
    pub fn take_expired(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// The configured quiet period
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Fixed-period ticker
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    period: Duration,
    next_tick: Instant,
}

impl IntervalTimer {
    /// Create a ticker whose first tick is one period after `now`
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            next_tick: now + period,
        }
    }

    /// Time between ticks
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Instant of the next tick
    pub fn deadline(&self) -> Instant {
        self.next_tick
    }

    /// Returns true if a tick is due, scheduling the following one
    pub fn take_tick(&mut self, now: Instant) -> bool {
        if now < self.next_tick {
            return false;
        }
        self.next_tick = now + self.period;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_timer_restart_pushes_deadline() {
        let start = Instant::now();
        let mut timer = IdleTimer::new(Duration::from_secs(2));
        assert!(!timer.is_running());

        timer.restart(start);
        timer.restart(start + Duration::from_secs(1));
        assert!(!timer.take_expired(start + Duration::from_secs(2)));
        assert!(timer.take_expired(start + Duration::from_secs(3)));
        // Fires once
        assert!(!timer.take_expired(start + Duration::from_secs(4)));
        assert!(!timer.is_running());
    }

    #[test]
    fn test_idle_timer_cancel() {
        let start = Instant::now();
        let mut timer = IdleTimer::new(Duration::from_millis(10));
        timer.restart(start);
        timer.cancel();
        assert!(!timer.take_expired(start + Duration::from_secs(1)));
    }

    #[test]
    fn test_interval_timer_ticks() {
        let start = Instant::now();
        let mut ticker = IntervalTimer::new(Duration::from_millis(100), start);
        assert!(!ticker.take_tick(start + Duration::from_millis(50)));
        assert!(ticker.take_tick(start + Duration::from_millis(100)));
        assert_eq!(ticker.deadline(), start + Duration::from_millis(200));
    }
}
