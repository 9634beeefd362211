//! # Write-Once State Store
//!
//! Models the one-time-programmable partition that persists the lifecycle
//! words. Programming can only set bits: a request whose words would
//! clear a bit already set is refused with an error acknowledge and the
//! contents stay as they were.
//!
//! Programming takes a configurable number of steps and is atomic: the
//! readout changes on the same step the acknowledge is returned.
//!
//! Faults can be injected to exercise the controller's error paths.

use lcc_core::{
    encoding::is_bitwise_superset, CountWord, HashedToken, IdentityState, IdentityWord,
    LifecycleState, StateWord, TokenKind, TransitionCount,
};
use lcc_state::{ProgramAck, ProgramRequest, ReferenceTokens, StoreReadout};

/// Simulated state store.
#[derive(Debug, Clone)]
pub struct OtpStore {
    state: StateWord,
    count: CountWord,
    identity: IdentityWord,
    tokens: ReferenceTokens,
    latency: u32,
    in_flight: Option<u32>,
    fail_next_program: bool,
    read_error: bool,
}

impl OtpStore {
    /// Store holding `state` with `count` transitions consumed.
    pub fn new(state: LifecycleState, count: TransitionCount, identity: IdentityState) -> Self {
        Self {
            state: StateWord::encode(state),
            count: CountWord::encode(count),
            identity: IdentityWord::encode(identity),
            tokens: ReferenceTokens::new(),
            latency: 1,
            in_flight: None,
            fail_next_program: false,
            read_error: false,
        }
    }

    /// Factory-fresh store: RAW, zero count, blank identity.
    pub fn blank() -> Self {
        Self::new(LifecycleState::Raw, TransitionCount::ZERO, IdentityState::Blank)
    }

    /// Set the programming latency.
    pub fn with_latency(mut self, latency: u32) -> Self {
        self.latency = latency.max(1);
        self
    }

    /// Provision a reference digest.
    pub fn provision_token(&mut self, kind: TokenKind, digest: HashedToken) {
        tracing::debug!(kind = kind.name(), "reference token provisioned");
        self.tokens.insert(kind, digest);
    }

    /// Mark the identity as personalized (sets every identity bit).
    pub fn personalize(&mut self) {
        self.identity = IdentityWord::encode(IdentityState::Personalized);
    }

    /// Raw state word.
    pub fn state_word(&self) -> StateWord {
        self.state
    }

    /// Raw count word.
    pub fn count_word(&self) -> CountWord {
        self.count
    }

    /// Overwrite the state word with an arbitrary value, bypassing the
    /// write-once rule.
    pub fn corrupt_state_word(&mut self, word: u32) {
        tracing::warn!(word = %format!("{word:#010x}"), "state word corrupted");
        self.state = StateWord(word);
    }

    /// Refuse the next program request with an error acknowledge.
    pub fn fail_next_program(&mut self) {
        self.fail_next_program = true;
    }

    /// Raise or clear the read-side error flag.
    pub fn set_read_error(&mut self, error: bool) {
        self.read_error = error;
    }

    /// What the controller sees.
    pub fn readout(&self) -> StoreReadout {
        StoreReadout {
            valid: true,
            error: self.read_error,
            state: self.state,
            count: self.count,
            identity: self.identity,
            tokens: self.tokens.clone(),
        }
    }

    /// Drop any programming in progress (power cycle).
    pub fn reset(&mut self) {
        self.in_flight = None;
    }

    /// Advance one step with the controller's current program request.
    pub fn tick(&mut self, request: Option<ProgramRequest>) -> Option<ProgramAck> {
        let Some(request) = request else {
            self.in_flight = None;
            return None;
        };
        let remaining = self.in_flight.unwrap_or(self.latency).saturating_sub(1);
        if remaining > 0 {
            self.in_flight = Some(remaining);
            return None;
        }
        self.in_flight = None;
        Some(self.program(request))
    }

    fn program(&mut self, request: ProgramRequest) -> ProgramAck {
        if std::mem::take(&mut self.fail_next_program) {
            tracing::warn!(state = %request.state, "injected programming failure");
            return ProgramAck::Error;
        }
        let (state, count) = request.words();
        if !is_bitwise_superset(state.0, self.state.0) || !is_bitwise_superset(count.0, self.count.0) {
            tracing::warn!(
                state = %request.state,
                count = %request.count,
                "program would clear bits, refused"
            );
            return ProgramAck::Error;
        }
        self.state = state;
        self.count = count;
        tracing::debug!(state = %request.state, count = %request.count, "store programmed");
        ProgramAck::Ok
    }
}
