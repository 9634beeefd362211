//! # Interface Arbiter
//!
//! Two ports can drive the transition registers: the software bus and the
//! test-access port. A hardware mutex decides which of them may write.
//!
//! ## Claim Protocol
//!
//! - A port requests the mutex by writing `Claim(true)`; it releases it by
//!   writing `Claim(false)`.
//! - When the mutex is free and both ports claim on the same step, the
//!   test-access port wins.
//! - A claim against a held mutex is ignored; the requester must retry
//!   after the owner releases.
//!
//! ## Write Gating
//!
//! Target, token, external-clock and go writes land only when the writer
//! holds the mutex *and* the state machine is idle. Anything else is
//! dropped silently. `go` is a strobe: the request it arms is captured
//! with the issuing port on the step it lands and is gone on the next, so
//! a release in the same step cannot cancel it.
//!
//! Every change of ownership clears the register file. A new owner never
//! reads the target, token or clock request left by the previous one.

use lcc_core::{MutexOwner, Port, Token, TOKEN_WORDS};
use serde::{Deserialize, Serialize};

use crate::alert::AlertTest;

/// One bus write from a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reg", content = "value")]
pub enum RegWrite {
    /// Request (`true`) or release (`false`) the mutex.
    Claim(bool),
    /// Raw target-state index.
    Target(u32),
    /// One 32-bit word of the transition token.
    TokenWord {
        /// Word index, `0..4`.
        index: usize,
        /// Word value.
        value: u32,
    },
    /// Request that the transition run on the external clock.
    ExternalClock(bool),
    /// Start the transition.
    Go,
    /// Fire alert test pulses. Not gated by the mutex.
    AlertTest(AlertTest),
}

/// The mutex-protected transition registers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransitionRegisters {
    /// Raw target index as written.
    pub target: u32,
    /// Token as written.
    pub token: Token,
    /// External-clock request.
    pub external_clock: bool,
}

/// A transition request armed by the mutex owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmedRequest {
    /// Port that issued it.
    pub port: Port,
    /// Raw target index, not yet validated.
    pub target: u32,
    /// Token as written.
    pub token: Token,
    /// External-clock request.
    pub external_clock: bool,
}

/// Mutex and register file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Arbiter {
    owner: MutexOwner,
    regs: TransitionRegisters,
    armed: Option<ArmedRequest>,
}

fn last_claim(writes: &[RegWrite]) -> Option<bool> {
    writes.iter().rev().find_map(|w| match w {
        RegWrite::Claim(claim) => Some(*claim),
        _ => None,
    })
}

impl Arbiter {
    /// Current mutex owner.
    pub fn owner(&self) -> MutexOwner {
        self.owner
    }

    /// Register contents.
    pub fn registers(&self) -> &TransitionRegisters {
        &self.regs
    }

    /// Whether `port` may write the transition registers.
    pub fn write_enabled(&self, port: Port, fsm_idle: bool) -> bool {
        fsm_idle && self.owner.is_held_by(port)
    }

    /// The request presented to the state machine this step, if the owner
    /// has strobed go.
    pub fn armed_request(&self) -> Option<ArmedRequest> {
        self.armed.clone()
    }

    /// Apply one step of bus traffic from both ports.
    pub fn next(&self, software: &[RegWrite], test_port: &[RegWrite], fsm_idle: bool) -> Self {
        let owner = self.arbitrate(last_claim(test_port), last_claim(software));
        if owner != self.owner {
            tracing::debug!(from = %self.owner, to = %owner, "mutex ownership changed");
        }

        let mut regs = self.regs.clone();
        let mut go = None;
        for port in Port::BY_PRIORITY {
            let writes = match port {
                Port::Software => software,
                Port::TestPort => test_port,
            };
            let enabled = self.write_enabled(port, fsm_idle);
            for write in writes {
                let gated = matches!(
                    write,
                    RegWrite::Target(_)
                        | RegWrite::TokenWord { .. }
                        | RegWrite::ExternalClock(_)
                        | RegWrite::Go
                );
                if gated && !enabled {
                    tracing::trace!(port = port.name(), ?write, "register write dropped");
                    continue;
                }
                match *write {
                    RegWrite::Target(target) => regs.target = target,
                    RegWrite::TokenWord { index, value } => {
                        if !regs.token.set_word(index, value) {
                            tracing::trace!(index, max = TOKEN_WORDS, "token word index out of range");
                        }
                    }
                    RegWrite::ExternalClock(external) => regs.external_clock = external,
                    RegWrite::Go => go = Some(port),
                    RegWrite::Claim(_) | RegWrite::AlertTest(_) => {}
                }
            }
        }

        let armed = go.map(|port| ArmedRequest {
            port,
            target: regs.target,
            token: regs.token.clone(),
            external_clock: regs.external_clock,
        });
        if owner != self.owner {
            regs = TransitionRegisters::default();
        }

        Self { owner, regs, armed }
    }

    fn arbitrate(&self, test_port: Option<bool>, software: Option<bool>) -> MutexOwner {
        match self.owner {
            MutexOwner::Unclaimed => {
                if test_port == Some(true) {
                    MutexOwner::TestPort
                } else if software == Some(true) {
                    MutexOwner::Software
                } else {
                    MutexOwner::Unclaimed
                }
            }
            MutexOwner::TestPort if test_port == Some(false) => MutexOwner::Unclaimed,
            MutexOwner::Software if software == Some(false) => MutexOwner::Unclaimed,
            held => held,
        }
    }
}
