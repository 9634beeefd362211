//! # Simulated Peers
//!
//! Behavioural models of the controller's collaborators. Each peer sees
//! the controller's registered outputs from the previous step and produces
//! inputs for the next one.
//!
//! | Peer               | Controller output       | Controller input         |
//! |--------------------|-------------------------|--------------------------|
//! | [`HashService`]    | `hash_req`              | `hash_ack`               |
//! | [`AckResponder`]   | `clock_bypass_req`      | `clock_bypass_ack` (raw) |
//! | [`AckResponder`]   | `wipe_req`              | `wipe_ack` (raw)         |
//! | [`PowerManager`]   | `init_done`             | `init_req` (raw)         |
//! | [`EscalationSender`] | `escalation_acks`     | `wipe_secrets`, `scrap_state` |

use lcc_core::{HashedToken, Token};
use lcc_crypto::TokenHasher;
use lcc_state::{DiffPair, EscalationCause};

/// Hashing service with a fixed latency. One acknowledge per request; a
/// request dropped before completion is abandoned.
#[derive(Debug)]
pub struct HashService<H> {
    hasher: H,
    latency: u32,
    state: HashState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HashState {
    Idle,
    Busy(u32),
    Answered,
}

impl<H: TokenHasher> HashService<H> {
    /// Service answering after `latency` steps.
    pub fn new(hasher: H, latency: u32) -> Self {
        Self {
            hasher,
            latency: latency.max(1),
            state: HashState::Idle,
        }
    }

    /// Underlying hasher.
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Abandon any request in progress.
    pub fn reset(&mut self) {
        self.state = HashState::Idle;
    }

    /// Advance one step.
    pub fn tick(&mut self, request: Option<&Token>) -> Option<HashedToken> {
        let Some(token) = request else {
            self.state = HashState::Idle;
            return None;
        };
        let remaining = match self.state {
            HashState::Answered => return None,
            HashState::Idle => self.latency - 1,
            HashState::Busy(n) => n.saturating_sub(1),
        };
        if remaining > 0 {
            self.state = HashState::Busy(remaining);
            return None;
        }
        self.state = HashState::Answered;
        tracing::trace!(algorithm = self.hasher.algorithm(), "token hashed");
        Some(self.hasher.hash(token))
    }
}

/// Four-phase level responder: raises its acknowledge once the request
/// has been held for `latency` steps and drops it as soon as the request
/// drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckResponder {
    latency: u32,
    held: u32,
}

impl AckResponder {
    /// Responder with the given latency.
    pub fn new(latency: u32) -> Self {
        Self {
            latency: latency.max(1),
            held: 0,
        }
    }

    /// Drop the acknowledge.
    pub fn reset(&mut self) {
        self.held = 0;
    }

    /// Advance one step; returns the acknowledge level.
    pub fn tick(&mut self, request: bool) -> bool {
        if !request {
            self.held = 0;
            return false;
        }
        self.held = self.held.saturating_add(1);
        self.held >= self.latency
    }
}

/// Raises the init request a fixed number of steps after reset and holds
/// it until the controller reports init done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerManager {
    delay: u32,
    elapsed: u32,
}

impl PowerManager {
    /// Power manager with the given delay.
    pub fn new(delay: u32) -> Self {
        Self { delay, elapsed: 0 }
    }

    /// Restart the power-up sequence.
    pub fn reset(&mut self) {
        self.elapsed = 0;
    }

    /// Advance one step; returns the raw init request.
    pub fn tick(&mut self, init_done: bool) -> bool {
        if init_done {
            return false;
        }
        self.elapsed = self.elapsed.saturating_add(1);
        self.elapsed > self.delay
    }
}

/// Drives the two escalation pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EscalationSender {
    wipe_secrets: Option<DiffPair>,
    scrap_state: Option<DiffPair>,
}

impl EscalationSender {
    /// Assert or release one line.
    pub fn set(&mut self, cause: EscalationCause, asserted: bool) {
        *self.line(cause) = asserted.then_some(DiffPair::ASSERTED);
    }

    /// Drive both wires of a line to the same value.
    pub fn break_pair(&mut self, cause: EscalationCause) {
        *self.line(cause) = Some(DiffPair { p: true, n: true });
    }

    /// Release both lines.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Current wire values: `(wipe_secrets, scrap_state)`.
    pub fn wires(&self) -> (DiffPair, DiffPair) {
        (
            self.wipe_secrets.unwrap_or_default(),
            self.scrap_state.unwrap_or_default(),
        )
    }

    fn line(&mut self, cause: EscalationCause) -> &mut Option<DiffPair> {
        match cause {
            EscalationCause::WipeSecrets => &mut self.wipe_secrets,
            EscalationCause::ScrapState => &mut self.scrap_state,
        }
    }
}
