//! # Lifecycle Transition State Machine
//!
//! Drives one transition attempt at a time from request to commit:
//!
//! ```text
//!  Reset ──init──▶ Idle ──go──▶ [ClockBypass] ─▶ [TokenHash] ─▶ [Wipe] ─▶ StoreCommit
//!                   ▲                                                          │
//!                   └──────────────────── outcome pulse ◀──────────────────────┘
//!
//!  any ──escalation──▶ Escalated(cause)        any ──bad store readout──▶ Invalid
//! ```
//!
//! Bracketed phases are entered only when they apply: clock bypass when
//! the request asked for the external clock from RAW or a TEST state,
//! token hashing when the rule names a reference token, wipe when the rule
//! demands it.
//!
//! [`step`] is a pure function of the previous state and this step's
//! inputs. Every wait phase has exactly one outstanding request to a
//! collaborator and no timeout of its own; outcome pulses are emitted on
//! the step the outcome is decided, and the machine is already back in
//! `Idle` on that step.
//!
//! ## Terminal States
//!
//! `Escalated` and `Invalid` are left only by a hard reset of the whole
//! controller. Escalation pre-empts every phase, `Invalid` included.

use lcc_core::{
    HashedToken, LifecycleState, OutcomeFlags, Port, Token, TransitionCount, TransitionRule,
    TransitionTable,
};

use crate::arbiter::ArmedRequest;
use crate::escalation::EscalationCause;
use crate::store::{ProgramAck, ProgramRequest, StoreContents, StoreReadout};

/// A transition attempt that passed request validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransition {
    /// Port that armed the request.
    pub port: Port,
    /// State at the time of the request.
    pub from: LifecycleState,
    /// The matched table rule.
    pub rule: TransitionRule,
    /// Count to persist on commit.
    pub next_count: TransitionCount,
    /// The attempt runs on the external clock.
    pub external_clock: bool,
    token: Token,
    authenticated: bool,
    wiped: bool,
}

impl PendingTransition {
    /// Target state.
    pub fn target(&self) -> LifecycleState {
        self.rule.to
    }

    /// Latched copy of the token.
    pub fn token(&self) -> &Token {
        &self.token
    }
}

/// State machine state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FsmState {
    /// Waiting for the power-domain init handshake.
    #[default]
    Reset,
    /// Accepting requests.
    Idle,
    /// Waiting for the clock manager to switch to the external clock.
    ClockBypass {
        /// Attempt in flight.
        pending: PendingTransition,
        /// The acknowledge has been seen low since entering, so a high
        /// value now belongs to this request.
        ack_released: bool,
    },
    /// Waiting for the hashing service.
    TokenHash(PendingTransition),
    /// Waiting for the destructive-wipe acknowledge.
    Wipe {
        /// Attempt in flight.
        pending: PendingTransition,
        /// See [`FsmState::ClockBypass`].
        ack_released: bool,
    },
    /// Waiting for the store to program the new words.
    StoreCommit(PendingTransition),
    /// Terminal: an escalation was received.
    Escalated(EscalationCause),
    /// Terminal: the store readout could not be trusted.
    Invalid,
}

impl FsmState {
    /// Phase name for logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reset => "RESET",
            Self::Idle => "IDLE",
            Self::ClockBypass { .. } => "CLOCK_BYPASS",
            Self::TokenHash(_) => "TOKEN_HASH",
            Self::Wipe { .. } => "WIPE",
            Self::StoreCommit(_) => "STORE_COMMIT",
            Self::Escalated(_) => "ESCALATED",
            Self::Invalid => "INVALID",
        }
    }

    /// Whether the machine accepts a request.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Whether the machine is in a state only a hard reset leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Escalated(_) | Self::Invalid)
    }

    /// Attempt in flight, if any.
    pub fn pending(&self) -> Option<&PendingTransition> {
        match self {
            Self::ClockBypass { pending, .. }
            | Self::Wipe { pending, .. }
            | Self::TokenHash(pending)
            | Self::StoreCommit(pending) => Some(pending),
            _ => None,
        }
    }

    /// Clock-bypass request, held from entering `ClockBypass` until the
    /// attempt ends.
    pub fn clock_bypass_req(&self) -> bool {
        self.pending().is_some_and(|p| p.external_clock)
    }

    /// Destructive-wipe request.
    pub fn wipe_req(&self) -> bool {
        matches!(self, Self::Wipe { .. })
    }

    /// Token presented to the hashing service.
    pub fn hash_request(&self) -> Option<&Token> {
        match self {
            Self::TokenHash(pending) => Some(&pending.token),
            _ => None,
        }
    }

    /// Words presented to the store for programming.
    pub fn program_request(&self) -> Option<ProgramRequest> {
        match self {
            Self::StoreCommit(pending) => Some(ProgramRequest {
                state: pending.target(),
                count: pending.next_count,
            }),
            _ => None,
        }
    }
}

/// Everything the state machine samples on one step.
#[derive(Debug, Clone, Copy)]
pub struct FsmInputs<'a> {
    /// Synchronized power-domain init request.
    pub init_req: bool,
    /// Request armed by the mutex owner.
    pub request: Option<&'a ArmedRequest>,
    /// Store readout.
    pub store: &'a StoreReadout,
    /// Hashing-service acknowledge with its result.
    pub hash_ack: Option<HashedToken>,
    /// Store programming acknowledge.
    pub program_ack: Option<ProgramAck>,
    /// Synchronized clock-bypass acknowledge.
    pub clock_bypass_ack: bool,
    /// Synchronized destructive-wipe acknowledge.
    pub wipe_ack: bool,
    /// Registered escalation level.
    pub escalation: Option<EscalationCause>,
    /// Configured transition graph.
    pub table: &'a TransitionTable,
}

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsmStep {
    /// Next state.
    pub next: FsmState,
    /// Outcome pulses decided on this step.
    pub pulses: OutcomeFlags,
}

impl FsmStep {
    fn to(next: FsmState) -> Self {
        Self {
            next,
            pulses: OutcomeFlags::NONE,
        }
    }

    fn outcome(next: FsmState, set: impl FnOnce(&mut OutcomeFlags)) -> Self {
        let mut pulses = OutcomeFlags::NONE;
        set(&mut pulses);
        Self { next, pulses }
    }
}

/// Advance the state machine by one step.
pub fn step(state: &FsmState, inputs: &FsmInputs<'_>) -> FsmStep {
    if let FsmState::Escalated(_) = state {
        return FsmStep::to(state.clone());
    }
    if let Some(cause) = inputs.escalation {
        tracing::error!(%cause, phase = state.name(), "escalation received, entering terminal state");
        return FsmStep::to(FsmState::Escalated(cause));
    }

    match state {
        FsmState::Escalated(_) | FsmState::Invalid => FsmStep::to(state.clone()),
        FsmState::Reset => initialize(inputs),
        active => {
            let contents = match check_store(inputs.store) {
                Ok(contents) => contents,
                Err(pulses) => {
                    return FsmStep {
                        next: FsmState::Invalid,
                        pulses,
                    }
                }
            };
            match active {
                FsmState::Idle => accept(&contents, inputs),
                FsmState::ClockBypass {
                    pending,
                    ack_released,
                } => clock_bypass(pending, *ack_released, inputs.clock_bypass_ack),
                FsmState::TokenHash(pending) => token_hash(pending, inputs),
                FsmState::Wipe {
                    pending,
                    ack_released,
                } => wipe(pending, *ack_released, inputs.wipe_ack),
                FsmState::StoreCommit(pending) => store_commit(pending, inputs.program_ack),
                FsmState::Reset | FsmState::Escalated(_) | FsmState::Invalid => {
                    FsmStep::to(active.clone())
                }
            }
        }
    }
}

fn check_store(store: &StoreReadout) -> Result<StoreContents, OutcomeFlags> {
    let mut pulses = OutcomeFlags::NONE;
    if !store.valid {
        tracing::error!("state store readout lost");
        pulses.state_error = true;
        return Err(pulses);
    }
    if store.error {
        tracing::error!("state store reported a read error");
        pulses.store_error = true;
        pulses.state_error = true;
        return Err(pulses);
    }
    store.decode().map_err(|e| {
        tracing::error!(error = %e, "persisted lifecycle words failed to decode");
        pulses.state_error = true;
        pulses
    })
}

fn initialize(inputs: &FsmInputs<'_>) -> FsmStep {
    if !inputs.init_req || !inputs.store.valid {
        return FsmStep::to(FsmState::Reset);
    }
    match check_store(inputs.store) {
        Ok(contents) => {
            tracing::info!(
                state = %contents.state,
                count = %contents.count,
                identity = %contents.identity,
                "lifecycle controller initialized"
            );
            FsmStep::to(FsmState::Idle)
        }
        Err(pulses) => FsmStep {
            next: FsmState::Invalid,
            pulses,
        },
    }
}

fn accept(contents: &StoreContents, inputs: &FsmInputs<'_>) -> FsmStep {
    let Some(request) = inputs.request else {
        return FsmStep::to(FsmState::Idle);
    };
    let port = request.port.name();

    let target = match LifecycleState::from_index(request.target) {
        Ok(target) => target,
        Err(_) => {
            tracing::warn!(port, target = request.target, "transition target is not a lifecycle state");
            return FsmStep::outcome(FsmState::Idle, |p| p.transition_error = true);
        }
    };
    let Some(rule) = inputs.table.lookup(contents.state, target).copied() else {
        tracing::warn!(port, from = %contents.state, to = %target, "transition not permitted");
        return FsmStep::outcome(FsmState::Idle, |p| p.transition_error = true);
    };
    let Some(next_count) = contents.count.incremented() else {
        tracing::warn!(port, count = %contents.count, "transition count exhausted");
        return FsmStep::outcome(FsmState::Idle, |p| p.count_error = true);
    };

    let external_clock =
        request.external_clock && (contents.state == LifecycleState::Raw || contents.state.is_test());
    tracing::debug!(
        port,
        from = %contents.state,
        to = %target,
        token = rule.token.map(|k| k.name()),
        wipe = rule.wipe,
        external_clock,
        "transition request accepted"
    );

    let pending = PendingTransition {
        port: request.port,
        from: contents.state,
        rule,
        next_count,
        external_clock,
        token: request.token.clone(),
        authenticated: false,
        wiped: false,
    };
    if external_clock {
        FsmStep::to(FsmState::ClockBypass {
            pending,
            ack_released: false,
        })
    } else {
        FsmStep::to(advance(pending))
    }
}

/// The next phase for an attempt whose clock (if requested) is settled.
fn advance(pending: PendingTransition) -> FsmState {
    if pending.rule.token.is_some() && !pending.authenticated {
        FsmState::TokenHash(pending)
    } else if pending.rule.wipe && !pending.wiped {
        FsmState::Wipe {
            pending,
            ack_released: false,
        }
    } else {
        FsmState::StoreCommit(pending)
    }
}

fn clock_bypass(pending: &PendingTransition, ack_released: bool, ack: bool) -> FsmStep {
    if ack && ack_released {
        tracing::debug!("external clock engaged");
        return FsmStep::to(advance(pending.clone()));
    }
    FsmStep::to(FsmState::ClockBypass {
        pending: pending.clone(),
        ack_released: ack_released || !ack,
    })
}

fn token_hash(pending: &PendingTransition, inputs: &FsmInputs<'_>) -> FsmStep {
    let Some(hashed) = inputs.hash_ack else {
        return FsmStep::to(FsmState::TokenHash(pending.clone()));
    };
    let Some(kind) = pending.rule.token else {
        return FsmStep::to(advance(pending.clone()));
    };
    let matches = inputs
        .store
        .tokens
        .get(kind)
        .is_some_and(|reference| *reference == hashed);
    if !matches {
        tracing::warn!(
            kind = kind.name(),
            from = %pending.from,
            to = %pending.target(),
            "transition token rejected"
        );
        return FsmStep::outcome(FsmState::Idle, |p| p.token_error = true);
    }
    tracing::debug!(kind = kind.name(), "transition token accepted");
    let mut next = pending.clone();
    next.authenticated = true;
    FsmStep::to(advance(next))
}

fn wipe(pending: &PendingTransition, ack_released: bool, ack: bool) -> FsmStep {
    if ack && ack_released {
        tracing::debug!(to = %pending.target(), "destructive wipe complete");
        let mut next = pending.clone();
        next.wiped = true;
        return FsmStep::to(advance(next));
    }
    FsmStep::to(FsmState::Wipe {
        pending: pending.clone(),
        ack_released: ack_released || !ack,
    })
}

fn store_commit(pending: &PendingTransition, ack: Option<ProgramAck>) -> FsmStep {
    match ack {
        None => FsmStep::to(FsmState::StoreCommit(pending.clone())),
        Some(ProgramAck::Ok) => {
            tracing::info!(
                port = pending.port.name(),
                from = %pending.from,
                to = %pending.target(),
                count = %pending.next_count,
                "lifecycle transition committed"
            );
            FsmStep::outcome(FsmState::Idle, |p| p.success = true)
        }
        Some(ProgramAck::Error) => {
            tracing::error!(
                from = %pending.from,
                to = %pending.target(),
                "state store programming failed"
            );
            FsmStep::outcome(FsmState::Idle, |p| p.programming_error = true)
        }
    }
}
