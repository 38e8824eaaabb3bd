//! Per-provider circuit breaker.
//!
//! ## States
//! - **Closed**: normal operation; consecutive failures are counted
//! - **Open**: provider failing; requests are refused until the recovery
//!   timeout elapses
//! - **Half-Open**: exactly one trial request is in flight; its outcome
//!   closes or re-opens the breaker
//!
//! There are no background timers. The Open → Half-Open transition happens
//! lazily inside [`CircuitBreaker::allow_request`], under the breaker's lock,
//! so concurrent callers agree on a single trial winner.
//!
//! An admitted call holds a [`BreakerPermit`] and reports its outcome
//! through it. Each permit is stamped with the breaker's epoch at admission;
//! outcomes from an earlier epoch are ignored, so only the trial holder can
//! close or re-open a Half-Open breaker. A permit dropped without an
//! outcome (the caller's future was dropped) gives the trial back.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use vigil_core::config::BreakerConfig;

/// Current state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BreakerState::Closed => "CLOSED",
            BreakerState::Open => "OPEN",
            BreakerState::HalfOpen => "HALF_OPEN",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    /// Bumped on every state transition.
    epoch: u64,
}

impl Inner {
    fn transition(&mut self, state: BreakerState) {
        self.state = state;
        self.epoch = self.epoch.wrapping_add(1);
    }
}

/// Point-in-time view of a breaker, for observability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerSnapshot {
    pub provider_id: String,
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    #[serde(skip)]
    pub recovery_timeout: Duration,
}

/// Circuit breaker guarding one provider.
///
/// All state sits behind a single mutex; the three operations are
/// linearizable and callers cannot observe or corrupt intermediate state.
#[derive(Debug)]
pub struct CircuitBreaker {
    provider_id: String,
    failure_threshold: u32,
    recovery_timeout: Duration,
    inner: Mutex<Inner>,
}

/// Admission to call a provider, returned by [`CircuitBreaker::allow_request`].
///
/// Consume it with [`record_success`](Self::record_success) or
/// [`record_failure`](Self::record_failure). Dropping it unconsumed records
/// no verdict; if it was the Half-Open trial, the trial is released.
#[must_use = "report the call outcome through the permit"]
#[derive(Debug)]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    epoch: u64,
    trial: bool,
    settled: bool,
}

impl BreakerPermit<'_> {
    /// Whether this permit is the Half-Open trial.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.epoch);
    }

    /// Record a failure attributable to the provider.
    pub fn record_failure(self) {
        self.record_failure_at(Instant::now());
    }

    pub(crate) fn record_failure_at(mut self, now: Instant) {
        self.settled = true;
        self.breaker.on_failure(self.epoch, now);
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            self.breaker.release_trial(self.epoch);
        }
    }
}

impl CircuitBreaker {
    /// Create a closed breaker.
    ///
    /// A `failure_threshold` of 0 is treated as 1.
    pub fn new(
        provider_id: impl Into<String>,
        failure_threshold: u32,
        recovery_timeout: Duration,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                epoch: 0,
            }),
        }
    }

    pub fn from_config(provider_id: impl Into<String>, config: &BreakerConfig) -> Self {
        Self::new(
            provider_id,
            config.failure_threshold,
            config.recovery_timeout(),
        )
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// A permit to call this provider now, or `None` if refused.
    ///
    /// In Open state, the first call after the recovery timeout moves the
    /// breaker to Half-Open and gets the trial permit; every other caller is
    /// refused until that trial resolves or is dropped.
    pub fn allow_request(&self) -> Option<BreakerPermit<'_>> {
        self.allow_request_at(Instant::now())
    }

    pub(crate) fn allow_request_at(&self, now: Instant) -> Option<BreakerPermit<'_>> {
        let mut inner = self.inner.lock();
        let trial = match inner.state {
            BreakerState::Closed => false,
            BreakerState::HalfOpen => {
                debug!(provider = %self.provider_id, "breaker: trial in flight, refusing");
                return None;
            }
            BreakerState::Open if self.cooled_down(&inner, now) => {
                inner.transition(BreakerState::HalfOpen);
                info!(provider = %self.provider_id, "breaker: half-open, admitting trial request");
                true
            }
            BreakerState::Open => {
                debug!(provider = %self.provider_id, "breaker: open, refusing");
                return None;
            }
        };
        Some(BreakerPermit {
            breaker: self,
            epoch: inner.epoch,
            trial,
            settled: false,
        })
    }

    fn on_success(&self, epoch: u64) {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            debug!(provider = %self.provider_id, "breaker: stale success ignored");
            return;
        }
        match inner.state {
            BreakerState::Closed => inner.consecutive_failures = 0,
            BreakerState::HalfOpen => {
                inner.transition(BreakerState::Closed);
                inner.consecutive_failures = 0;
                inner.opened_at = None;
                info!(provider = %self.provider_id, "breaker: closing (trial succeeded)");
            }
            BreakerState::Open => {}
        }
    }

    fn on_failure(&self, epoch: u64, now: Instant) {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            debug!(provider = %self.provider_id, "breaker: stale failure ignored");
            return;
        }
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        match inner.state {
            BreakerState::Closed if inner.consecutive_failures >= self.failure_threshold => {
                inner.transition(BreakerState::Open);
                inner.opened_at = Some(now);
                warn!(
                    provider = %self.provider_id,
                    failures = inner.consecutive_failures,
                    threshold = self.failure_threshold,
                    "breaker: opening (threshold reached)"
                );
            }
            BreakerState::Closed => {
                debug!(
                    provider = %self.provider_id,
                    failures = inner.consecutive_failures,
                    threshold = self.failure_threshold,
                    "breaker: failure recorded"
                );
            }
            BreakerState::HalfOpen => {
                inner.transition(BreakerState::Open);
                inner.opened_at = Some(now);
                warn!(provider = %self.provider_id, "breaker: reopening (trial failed)");
            }
            BreakerState::Open => {}
        }
    }

    /// Back to Open with the original `opened_at`, so the next caller is
    /// admitted as the new trial.
    fn release_trial(&self, epoch: u64) {
        let mut inner = self.inner.lock();
        if inner.epoch == epoch && inner.state == BreakerState::HalfOpen {
            inner.transition(BreakerState::Open);
            debug!(provider = %self.provider_id, "breaker: trial released without verdict");
        }
    }

    /// Current state, re-evaluated lazily: an Open breaker whose recovery
    /// timeout has elapsed reports `HalfOpen`. Does not mutate.
    pub fn state(&self) -> BreakerState {
        self.state_at(Instant::now())
    }

    pub(crate) fn state_at(&self, now: Instant) -> BreakerState {
        let inner = self.inner.lock();
        self.effective_state(&inner, now)
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.lock();
        BreakerSnapshot {
            provider_id: self.provider_id.clone(),
            state: self.effective_state(&inner, Instant::now()),
            consecutive_failures: inner.consecutive_failures,
            failure_threshold: self.failure_threshold,
            recovery_timeout: self.recovery_timeout,
        }
    }

    fn effective_state(&self, inner: &Inner, now: Instant) -> BreakerState {
        match inner.state {
            BreakerState::Open if self.cooled_down(inner, now) => BreakerState::HalfOpen,
            state => state,
        }
    }

    fn cooled_down(&self, inner: &Inner, now: Instant) -> bool {
        match inner.opened_at {
            Some(opened) => now.saturating_duration_since(opened) >= self.recovery_timeout,
            None => true,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
