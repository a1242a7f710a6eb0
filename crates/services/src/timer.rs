use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use quiz_core::Clock;

/// How often a host should call `QuizTimer::poll` (or `QuizSession::tick`) for a
/// smooth countdown display.
pub const TIMER_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

type ExpiryCallback = Box<dyn FnOnce() + Send>;

/// Lifecycle of a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Expired,
    Stopped,
}

/// Single-shot countdown measured from wall-clock elapsed time.
///
/// The timer does not spawn anything; the owner samples it with `poll`. Remaining
/// time is always derived from the clock, so a late poll never under-counts.
pub struct QuizTimer {
    clock: Clock,
    state: TimerState,
    limit: Duration,
    started_at: Option<DateTime<Utc>>,
    frozen_elapsed: Option<Duration>,
    on_expired: Option<ExpiryCallback>,
}

impl QuizTimer {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            state: TimerState::Idle,
            limit: Duration::ZERO,
            started_at: None,
            frozen_elapsed: None,
            on_expired: None,
        }
    }

    /// Begin a countdown of `limit`, replacing any countdown in progress.
    ///
    /// A pending callback from a previous `start` is dropped without being called.
    pub fn start(&mut self, limit: Duration, on_expired: impl FnOnce() + Send + 'static) {
        self.state = TimerState::Running;
        self.limit = limit;
        self.started_at = Some(self.clock.now());
        self.frozen_elapsed = None;
        self.on_expired = Some(Box::new(on_expired));
        debug!(limit_ms = limit.as_millis(), "timer started");
    }

    /// Stop the countdown. No-op unless running.
    pub fn stop(&mut self) {
        if self.state != TimerState::Running {
            return;
        }
        self.frozen_elapsed = Some(self.running_elapsed());
        self.state = TimerState::Stopped;
        self.on_expired = None;
        debug!("timer stopped");
    }

    /// Sample the clock, firing the expiry callback if the countdown has run out.
    pub fn poll(&mut self) -> TimerState {
        if self.state == TimerState::Running && self.running_elapsed() >= self.limit {
            self.state = TimerState::Expired;
            self.frozen_elapsed = Some(self.limit);
            debug!("timer expired");
            if let Some(callback) = self.on_expired.take() {
                callback();
            }
        }
        self.state
    }

    #[must_use]
    pub fn state(&self) -> TimerState {
        self.state
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    #[must_use]
    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Time elapsed in the current (or last) countdown, capped at the limit.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        match self.state {
            TimerState::Idle => Duration::ZERO,
            TimerState::Running => self.running_elapsed().min(self.limit),
            TimerState::Expired | TimerState::Stopped => self.frozen_elapsed.unwrap_or(self.limit),
        }
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        match self.state {
            TimerState::Idle => Duration::ZERO,
            _ => self.limit.saturating_sub(self.elapsed()),
        }
    }

    fn running_elapsed(&self) -> Duration {
        self.started_at
            .map(|at| self.clock.elapsed_since(at))
            .unwrap_or_default()
    }
}

impl fmt::Debug for QuizTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizTimer")
            .field("state", &self.state)
            .field("limit", &self.limit)
            .field("started_at", &self.started_at)
            .field("callback_pending", &self.on_expired.is_some())
            .finish_non_exhaustive()
    }
}
