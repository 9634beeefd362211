//! # Clock-Domain Synchronizers
//!
//! Signals arriving from independently clocked peers (the power manager's
//! init request, the clock-bypass and destructive-wipe acknowledges) pass
//! through a chain of flops before the state machine may look at them.
//!
//! A [`Synchronizer`] is a fixed-length delay line: the value sampled on
//! step `t` becomes visible at the output on step `t + STAGES`. The
//! consumer only ever sees a registered value, never the raw input.

use serde::{Deserialize, Serialize};

/// N-stage flop chain. The default of two stages is the usual
/// metastability guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Synchronizer<const STAGES: usize = 2> {
    stages: [bool; STAGES],
}

impl<const STAGES: usize> Synchronizer<STAGES> {
    /// All stages cleared (reset value).
    pub const fn new() -> Self {
        Self {
            stages: [false; STAGES],
        }
    }

    /// Latency in steps.
    pub const fn latency() -> usize {
        STAGES
    }

    /// Value presented to the consumer.
    pub fn output(&self) -> bool {
        self.stages.last().copied().unwrap_or(false)
    }

    /// Shift `input` into the first stage.
    pub fn next(&self, input: bool) -> Self {
        let mut stages = [false; STAGES];
        if let Some(first) = stages.first_mut() {
            *first = input;
        }
        for i in 1..STAGES {
            stages[i] = self.stages[i - 1];
        }
        Self { stages }
    }
}

impl<const STAGES: usize> Default for Synchronizer<STAGES> {
    fn default() -> Self {
        Self::new()
    }
}

/// The controller's three inbound crossings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncBank {
    init_req: Synchronizer,
    clock_bypass_ack: Synchronizer,
    wipe_ack: Synchronizer,
}

/// Raw (unsynchronized) values of the inbound crossings for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CrossingInputs {
    /// Power-domain initialization request.
    pub init_req: bool,
    /// Clock-bypass acknowledge from the clock manager.
    pub clock_bypass_ack: bool,
    /// Destructive-wipe acknowledge from the NVM controller.
    pub wipe_ack: bool,
}

impl SyncBank {
    /// Advance every synchronizer by one step.
    pub fn next(&self, raw: CrossingInputs) -> Self {
        Self {
            init_req: self.init_req.next(raw.init_req),
            clock_bypass_ack: self.clock_bypass_ack.next(raw.clock_bypass_ack),
            wipe_ack: self.wipe_ack.next(raw.wipe_ack),
        }
    }

    /// Synchronized values.
    pub fn outputs(&self) -> CrossingInputs {
        CrossingInputs {
            init_req: self.init_req.output(),
            clock_bypass_ack: self.clock_bypass_ack.output(),
            wipe_ack: self.wipe_ack.output(),
        }
    }
}
