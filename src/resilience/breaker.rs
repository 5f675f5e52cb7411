//! Circuit breaker for backend node protection.
//!
//! # States
//! - Closed: normal operation, calls pass through, failures counted
//! - Open: node assumed down, calls fail fast without reaching the node
//! - Half-Open: a bounded number of trial calls test whether the node recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= error_threshold
//! Open → Half-Open: first call after cool_down has elapsed since opened_at
//! Half-Open → Closed: consecutive trial successes >= success_threshold
//! Half-Open → Open: any trial fails (opened_at reset)
//! ```
//!
//! # Design Decisions
//! - One breaker per node, owned by the registry
//! - The lock guards state transitions only; the protected call runs unlocked
//! - At most `success_threshold` trials in flight while Half-Open; extra calls
//!   get [`BreakerError::Busy`], not `Open`
//! - Every transition starts a new generation; outcomes of calls admitted in
//!   an earlier generation are discarded
//! - Uses tokio's clock so paused-time tests are deterministic

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::BreakerConfig;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakerState::Closed => write!(f, "closed"),
            BreakerState::Open => write!(f, "open"),
            BreakerState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Result of a call made through [`Breaker::run`].
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The breaker rejected the call; the protected function was not invoked.
    #[error("circuit breaker is open")]
    Open,

    /// The breaker is half-open and every trial slot is taken.
    #[error("circuit breaker is half-open with all trial slots busy")]
    Busy,

    /// The protected function ran and failed.
    #[error(transparent)]
    Call(E),
}

/// Point-in-time view of a breaker, for logs and the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub trials_in_flight: u32,
    /// Milliseconds since the breaker last opened.
    pub open_for_ms: Option<u64>,
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
    trials_in_flight: u32,
    generation: u64,
}

/// Per-node tri-state failure detector.
#[derive(Debug)]
pub struct Breaker {
    node_id: String,
    config: Arc<BreakerConfig>,
    inner: Mutex<BreakerInner>,
}

impl Breaker {
    /// Create a closed breaker for `node_id`.
    pub fn new(node_id: impl Into<String>, config: Arc<BreakerConfig>) -> Self {
        Self {
            node_id: node_id.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
                trials_in_flight: 0,
                generation: 0,
            }),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn cool_down(&self) -> Duration {
        self.config.cool_down()
    }

    /// Current stored state. An open breaker whose cool-down has elapsed still
    /// reports `Open` until the next call moves it to half-open.
    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.lock();
        BreakerSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
            trials_in_flight: inner.trials_in_flight,
            open_for_ms: inner
                .opened_at
                .map(|at| at.elapsed().as_millis() as u64),
        }
    }

    /// Run `call` under breaker protection.
    ///
    /// Returns [`BreakerError::Open`] (or [`BreakerError::Busy`] when half-open
    /// with no free trial slot) without invoking `call`. Otherwise the call's
    /// own result is passed through and its outcome recorded: `Ok` is a
    /// success, `Err` a failure.
    pub async fn run<T, E, F, Fut>(&self, call: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut admission = self.admit::<E>()?;

        let result = call().await;
        admission.settle(result.is_ok());

        result.map_err(BreakerError::Call)
    }

    fn admit<E>(&self) -> Result<Admission<'_>, BreakerError<E>> {
        let mut inner = self.inner.lock();

        if inner.state == BreakerState::Open {
            let elapsed = inner.opened_at.map(|at| at.elapsed());
            match elapsed {
                Some(elapsed) if elapsed < self.config.cool_down() => {
                    tracing::debug!(
                        node_id = %self.node_id,
                        remaining_ms = (self.config.cool_down() - elapsed).as_millis() as u64,
                        "Circuit breaker is open, rejecting call"
                    );
                    return Err(BreakerError::Open);
                }
                _ => {
                    tracing::info!(node_id = %self.node_id, "Circuit breaker transitioning to half-open");
                    Self::transition(&mut inner, BreakerState::HalfOpen);
                }
            }
        }

        let generation = inner.generation;
        match inner.state {
            BreakerState::Closed => Ok(Admission {
                breaker: self,
                trial: false,
                generation,
                settled: false,
            }),
            BreakerState::HalfOpen => {
                if inner.trials_in_flight >= self.config.success_threshold {
                    tracing::debug!(
                        node_id = %self.node_id,
                        trials_in_flight = inner.trials_in_flight,
                        "Circuit breaker half-open with all trial slots busy, rejecting call"
                    );
                    return Err(BreakerError::Busy);
                }
                inner.trials_in_flight += 1;
                Ok(Admission {
                    breaker: self,
                    trial: true,
                    generation,
                    settled: false,
                })
            }
            BreakerState::Open => Err(BreakerError::Open),
        }
    }

    fn record(&self, admission: &Admission<'_>, success: bool) {
        let mut inner = self.inner.lock();
        if admission.generation != inner.generation {
            tracing::debug!(
                node_id = %self.node_id,
                admitted_in = admission.generation,
                current = inner.generation,
                "Discarding outcome of a call admitted before the last transition"
            );
            return;
        }
        if admission.trial {
            inner.trials_in_flight = inner.trials_in_flight.saturating_sub(1);
        }

        match (inner.state, success) {
            (BreakerState::Closed, true) => {
                inner.consecutive_failures = 0;
            }
            (BreakerState::Closed, false) => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.error_threshold {
                    tracing::warn!(
                        node_id = %self.node_id,
                        failures = inner.consecutive_failures,
                        threshold = self.config.error_threshold,
                        cool_down_ms = self.config.cool_down_ms,
                        "Circuit breaker opening due to failures"
                    );
                    Self::open(&mut inner);
                }
            }
            (BreakerState::HalfOpen, true) => {
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.config.success_threshold {
                    tracing::info!(
                        node_id = %self.node_id,
                        successes = inner.consecutive_successes,
                        "Circuit breaker closing after successful trials"
                    );
                    Self::transition(&mut inner, BreakerState::Closed);
                    inner.opened_at = None;
                }
            }
            (BreakerState::HalfOpen, false) => {
                tracing::warn!(node_id = %self.node_id, "Circuit breaker reopening after trial failure");
                Self::open(&mut inner);
            }
            (BreakerState::Open, _) => {}
        }
    }

    fn open(inner: &mut BreakerInner) {
        Self::transition(inner, BreakerState::Open);
        inner.opened_at = Some(Instant::now());
    }

    fn transition(inner: &mut BreakerInner, state: BreakerState) {
        inner.state = state;
        inner.generation += 1;
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;
        inner.trials_in_flight = 0;
    }
}

/// Permission to make one call. Releases its trial slot if dropped before the
/// outcome is recorded (e.g. the caller's future was cancelled).
struct Admission<'a> {
    breaker: &'a Breaker,
    trial: bool,
    generation: u64,
    settled: bool,
}

impl Admission<'_> {
    fn settle(&mut self, success: bool) {
        self.settled = true;
        self.breaker.record(self, success);
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            let mut inner = self.breaker.inner.lock();
            if inner.generation == self.generation {
                inner.trials_in_flight = inner.trials_in_flight.saturating_sub(1);
            }
        }
    }
}
