//! Live-connection state machine.
//!
//! Pure, synchronous model of the one logical store subscription:
//! `Disconnected → Connecting → Connected → Reconnecting → Failed`. The
//! async driver in `services::live_service` owns the timers and the actual
//! subscription; this machine only decides what happens next, which keeps
//! the reconnect policy unit-testable without a runtime.

use std::time::Duration;

/// Exponential backoff schedule for reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub base: Duration,
    /// Upper bound on any single delay.
    pub cap: Duration,
    /// Attempts allowed before the link gives up for good.
    pub max_attempts: u32,
}

impl BackoffPolicy {
    // Beyond this shift the doubled delay is past any sane cap anyway.
    const MAX_SHIFT: u32 = 16;

    /// Delay to wait before reconnect attempt `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(Self::MAX_SHIFT);
        self.base.saturating_mul(factor).min(self.cap)
    }
}

/// Phase of the single live store connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkPhase {
    /// No connection and none requested yet.
    Disconnected,
    /// A subscription attempt is in flight.
    Connecting,
    /// The subscription is live and delivering pushes.
    Connected,
    /// Waiting out the backoff delay before the next attempt.
    Reconnecting {
        /// 0-based index of the upcoming retry.
        attempt: u32,
    },
    /// Terminal: attempts exhausted. Only an external trigger (restart)
    /// recovers from here.
    Failed,
}

/// What the driver must do after reporting a lost connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDirective {
    /// Sleep for `delay`, then call [`LinkStateMachine::retry_due`].
    Retry {
        /// 0-based index of the upcoming retry.
        attempt: u32,
        /// Backoff delay to wait before retrying.
        delay: Duration,
    },
    /// Stop for good and surface the failure.
    GiveUp,
}

/// State machine guarding the single live subscription.
#[derive(Debug, Clone)]
pub struct LinkStateMachine {
    phase: LinkPhase,
    attempts: u32,
    policy: BackoffPolicy,
}

impl LinkStateMachine {
    /// Start disconnected under the given backoff policy.
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            phase: LinkPhase::Disconnected,
            attempts: 0,
            policy,
        }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> LinkPhase {
        self.phase.clone()
    }

    /// Whether the link has permanently given up.
    pub fn is_failed(&self) -> bool {
        self.phase == LinkPhase::Failed
    }

    /// Request a connection attempt.
    ///
    /// Returns `true` when an attempt should actually be started. While a
    /// prior attempt is connecting, connected, or waiting out its backoff,
    /// this is a no-op: at most one attempt is ever in flight.
    pub fn connect(&mut self) -> bool {
        match self.phase {
            LinkPhase::Disconnected => {
                self.phase = LinkPhase::Connecting;
                true
            }
            _ => false,
        }
    }

    /// The in-flight attempt succeeded; resets the retry counter.
    pub fn opened(&mut self) {
        if self.phase == LinkPhase::Connecting {
            self.phase = LinkPhase::Connected;
            self.attempts = 0;
        }
    }

    /// The connection attempt failed or an established connection dropped.
    pub fn lost(&mut self) -> LinkDirective {
        if !matches!(self.phase, LinkPhase::Connecting | LinkPhase::Connected) {
            return LinkDirective::GiveUp;
        }

        if self.attempts >= self.policy.max_attempts {
            self.phase = LinkPhase::Failed;
            return LinkDirective::GiveUp;
        }

        let attempt = self.attempts;
        self.attempts += 1;
        self.phase = LinkPhase::Reconnecting { attempt };
        LinkDirective::Retry {
            attempt,
            delay: self.policy.delay(attempt),
        }
    }

    /// The backoff timer fired; move back into `Connecting`.
    ///
    /// Returns `true` when a new attempt should be started now.
    pub fn retry_due(&mut self) -> bool {
        match self.phase {
            LinkPhase::Reconnecting { .. } => {
                self.phase = LinkPhase::Connecting;
                true
            }
            _ => false,
        }
    }
}
