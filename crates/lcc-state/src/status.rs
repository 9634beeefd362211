//! # Sticky Status
//!
//! Every outcome pulse the state machine emits is OR-ed into a latch bank.
//! Bits never clear on their own, and no port write clears them; only a
//! hard reset of the whole controller does.

use lcc_core::OutcomeFlags;
use serde::{Deserialize, Serialize};

/// OR-accumulating latch over [`OutcomeFlags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusLatch {
    latched: OutcomeFlags,
}

impl StatusLatch {
    /// Accumulate one step's pulses.
    pub fn latch(&self, pulses: OutcomeFlags) -> Self {
        Self {
            latched: self.latched | pulses,
        }
    }

    /// Latched flags.
    pub fn flags(&self) -> OutcomeFlags {
        self.latched
    }
}

/// The status register as a port reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusRegister {
    /// The power-up handshake has completed.
    pub initialized: bool,
    /// The state machine is idle and will accept a request.
    pub ready: bool,
    /// Sticky outcome flags.
    pub flags: OutcomeFlags,
}
