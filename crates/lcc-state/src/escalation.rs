//! # Escalation Monitors
//!
//! Each escalation input is a differential pair driven by the alert
//! handler. The monitor decodes the pair into a registered level and
//! echoes that level back as the acknowledge. It keeps no history: once
//! the controller has seen the level, the latching happens in the
//! transition state machine, which never leaves its escalated state.
//!
//! A pair whose two wires agree is an integrity failure and is treated
//! as an asserted escalation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One differential escalation wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiffPair {
    /// Positive wire.
    pub p: bool,
    /// Negative wire.
    pub n: bool,
}

/// Decoded level of a [`DiffPair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireLevel {
    /// `p = 0, n = 1`.
    Idle,
    /// `p = 1, n = 0`.
    Asserted,
    /// `p == n`.
    IntegrityFault,
}

impl DiffPair {
    /// Quiescent encoding.
    pub const IDLE: Self = Self { p: false, n: true };
    /// Asserted encoding.
    pub const ASSERTED: Self = Self { p: true, n: false };

    /// Decode the pair.
    pub fn level(self) -> WireLevel {
        match (self.p, self.n) {
            (false, true) => WireLevel::Idle,
            (true, false) => WireLevel::Asserted,
            _ => WireLevel::IntegrityFault,
        }
    }
}

impl Default for DiffPair {
    fn default() -> Self {
        Self::IDLE
    }
}

impl From<bool> for DiffPair {
    fn from(asserted: bool) -> Self {
        if asserted {
            Self::ASSERTED
        } else {
            Self::IDLE
        }
    }
}

/// Which escalation line moved the controller into its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscalationCause {
    /// Secret-wipe escalation.
    WipeSecrets,
    /// Scrap-state escalation.
    ScrapState,
}

impl EscalationCause {
    /// Lines in the order the state machine consults them.
    pub const ALL: [EscalationCause; 2] = [Self::ScrapState, Self::WipeSecrets];

    /// Wire name.
    pub fn name(self) -> &'static str {
        match self {
            Self::WipeSecrets => "wipe_secrets",
            Self::ScrapState => "scrap_state",
        }
    }
}

impl fmt::Display for EscalationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Registered decoder for one escalation line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EscalationMonitor {
    active: bool,
}

impl EscalationMonitor {
    /// Sample the pair.
    pub fn next(&self, cause: EscalationCause, wire: DiffPair) -> Self {
        let level = wire.level();
        if level == WireLevel::IntegrityFault && !self.active {
            tracing::warn!(line = %cause, p = wire.p, n = wire.n, "escalation pair integrity failure");
        }
        Self {
            active: level != WireLevel::Idle,
        }
    }

    /// Whether the line is asserted.
    pub fn active(&self) -> bool {
        self.active
    }

    /// Acknowledge returned to the sender.
    pub fn ack(&self) -> bool {
        self.active
    }
}

/// The controller's two escalation monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EscalationInputs {
    wipe_secrets: EscalationMonitor,
    scrap_state: EscalationMonitor,
}

/// Acknowledge outputs, one per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EscalationAcks {
    /// Echo of the wipe-secrets line.
    pub wipe_secrets: bool,
    /// Echo of the scrap-state line.
    pub scrap_state: bool,
}

impl EscalationInputs {
    /// Sample both lines.
    pub fn next(&self, wipe_secrets: DiffPair, scrap_state: DiffPair) -> Self {
        Self {
            wipe_secrets: self.wipe_secrets.next(EscalationCause::WipeSecrets, wipe_secrets),
            scrap_state: self.scrap_state.next(EscalationCause::ScrapState, scrap_state),
        }
    }

    /// The asserted line, scrap-state first when both are up.
    pub fn cause(&self) -> Option<EscalationCause> {
        EscalationCause::ALL
            .into_iter()
            .find(|cause| self.monitor(*cause).active())
    }

    /// Monitor for one line.
    pub fn monitor(&self, cause: EscalationCause) -> &EscalationMonitor {
        match cause {
            EscalationCause::WipeSecrets => &self.wipe_secrets,
            EscalationCause::ScrapState => &self.scrap_state,
        }
    }

    /// Acknowledges for both lines.
    pub fn acks(&self) -> EscalationAcks {
        EscalationAcks {
            wipe_secrets: self.wipe_secrets.ack(),
            scrap_state: self.scrap_state.ack(),
        }
    }
}
