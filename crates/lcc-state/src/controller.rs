//! # Lifecycle Controller
//!
//! Ties the components together into a single synchronous step function:
//!
//! ```text
//!   step(previous snapshot, inputs, table) → next snapshot
//! ```
//!
//! Every register in the next snapshot is computed from the previous
//! snapshot and this step's inputs only, so the order in which components
//! are evaluated inside [`step`] cannot change the result. Outputs are a
//! function of the snapshot alone.
//!
//! [`LifecycleController`] owns the current snapshot and the configured
//! transition table, and is the only place a hard reset can happen.

use lcc_core::{
    BroadcastEnables, DecodedState, HashedToken, IdentityState, MutexOwner, OutcomeFlags, Port,
    Token, TransitionCount, TransitionTable, TOKEN_WORDS,
};
use serde::{Deserialize, Serialize};

use crate::alert::{AlertAggregator, AlertOutputs, AlertTest};
use crate::arbiter::{Arbiter, RegWrite};
use crate::broadcast::{self, DecodedView};
use crate::escalation::{DiffPair, EscalationAcks, EscalationInputs};
use crate::fsm::{self, FsmInputs, FsmState};
use crate::status::{StatusLatch, StatusRegister};
use crate::store::{ProgramAck, ProgramRequest, StoreReadout};
use crate::sync::{CrossingInputs, SyncBank};

/// Everything sampled on one step.
#[derive(Debug, Clone, Default)]
pub struct ControllerInputs {
    /// Software bus writes, applied in order.
    pub software: Vec<RegWrite>,
    /// Test-access port writes, applied in order.
    pub test_port: Vec<RegWrite>,
    /// Raw values of the signals that need synchronizing.
    pub crossings: CrossingInputs,
    /// State store readout.
    pub store: StoreReadout,
    /// Hashing-service acknowledge.
    pub hash_ack: Option<HashedToken>,
    /// Store programming acknowledge.
    pub program_ack: Option<ProgramAck>,
    /// Wipe-secrets escalation pair.
    pub wipe_secrets: DiffPair,
    /// Scrap-state escalation pair.
    pub scrap_state: DiffPair,
}

/// Registered outputs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControllerOutputs {
    /// Capability enables.
    pub enables: BroadcastEnables,
    /// Token presented to the hashing service.
    pub hash_req: Option<Token>,
    /// Words presented to the store.
    pub program_req: Option<ProgramRequest>,
    /// Clock-bypass request to the clock manager.
    pub clock_bypass_req: bool,
    /// Destructive-wipe request to the NVM controller.
    pub wipe_req: bool,
    /// Fatal alert lines.
    pub alerts: AlertOutputs,
    /// Escalation acknowledges.
    pub escalation_acks: EscalationAcks,
    /// One-step outcome pulses of the last transition attempt.
    pub outcome: OutcomeFlags,
    /// Power-up handshake complete.
    pub init_done: bool,
    /// No transition in flight.
    pub idle: bool,
}

/// What one port reads back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortView {
    /// Mutex owner.
    pub owner: MutexOwner,
    /// This port may write the transition registers now.
    pub write_enabled: bool,
    /// Target register (owner only, else zero).
    pub target: u32,
    /// Token registers (owner only, else zero).
    pub token: [u32; TOKEN_WORDS],
    /// External-clock control bit (owner only, else zero).
    pub external_clock: bool,
    /// Status register.
    pub status: StatusRegister,
    /// Decoded lifecycle state.
    pub state: DecodedState,
    /// Decoded transition count.
    pub count: Option<TransitionCount>,
    /// Decoded identity state.
    pub identity: Option<IdentityState>,
}

/// All controller registers at the end of a step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    cycle: u64,
    arbiter: Arbiter,
    fsm: FsmState,
    sync: SyncBank,
    escalation: EscalationInputs,
    status: StatusLatch,
    alerts: AlertAggregator,
    view: DecodedView,
    outcome: OutcomeFlags,
}

impl Snapshot {
    /// Steps taken since the last hard reset.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// State machine state.
    pub fn fsm(&self) -> &FsmState {
        &self.fsm
    }

    /// Mutex and transition registers.
    pub fn arbiter(&self) -> &Arbiter {
        &self.arbiter
    }

    /// Decoded-state registers.
    pub fn view(&self) -> &DecodedView {
        &self.view
    }

    /// Outcome pulses emitted on the step that produced this snapshot.
    pub fn outcome(&self) -> OutcomeFlags {
        self.outcome
    }

    /// Status register.
    pub fn status(&self) -> StatusRegister {
        StatusRegister {
            initialized: !matches!(self.fsm, FsmState::Reset),
            ready: self.fsm.is_idle(),
            flags: self.status.flags(),
        }
    }

    /// Registered outputs.
    pub fn outputs(&self) -> ControllerOutputs {
        ControllerOutputs {
            enables: broadcast::enables(&self.view),
            hash_req: self.fsm.hash_request().cloned(),
            program_req: self.fsm.program_request(),
            clock_bypass_req: self.fsm.clock_bypass_req(),
            wipe_req: self.fsm.wipe_req(),
            alerts: self.alerts.outputs(),
            escalation_acks: self.escalation.acks(),
            outcome: self.outcome,
            init_done: !matches!(self.fsm, FsmState::Reset),
            idle: self.fsm.pending().is_none() && !matches!(self.fsm, FsmState::Reset),
        }
    }

    /// Register view for `port`.
    pub fn port_view(&self, port: Port) -> PortView {
        let owner = self.arbiter.owner();
        let regs = self.arbiter.registers();
        let mut view = PortView {
            owner,
            write_enabled: self.arbiter.write_enabled(port, self.fsm.is_idle()),
            target: 0,
            token: [0; TOKEN_WORDS],
            external_clock: false,
            status: self.status(),
            state: self.view.state,
            count: self.view.count,
            identity: self.view.identity,
        };
        if owner.is_held_by(port) {
            view.target = regs.target;
            view.token = regs.token.words();
            view.external_clock = regs.external_clock;
        }
        view
    }
}

/// Advance the whole controller by one step.
pub fn step(prev: &Snapshot, inputs: &ControllerInputs, table: &TransitionTable) -> Snapshot {
    let crossings = prev.sync.outputs();
    let request = prev.arbiter.armed_request();
    let fsm = fsm::step(
        &prev.fsm,
        &FsmInputs {
            init_req: crossings.init_req,
            request: request.as_ref(),
            store: &inputs.store,
            hash_ack: inputs.hash_ack,
            program_ack: inputs.program_ack,
            clock_bypass_ack: crossings.clock_bypass_ack,
            wipe_ack: crossings.wipe_ack,
            escalation: prev.escalation.cause(),
            table,
        },
    );
    if fsm.next.name() != prev.fsm.name() {
        tracing::debug!(
            cycle = prev.cycle + 1,
            from = prev.fsm.name(),
            to = fsm.next.name(),
            "phase change"
        );
    }

    let alert_test = inputs
        .software
        .iter()
        .chain(&inputs.test_port)
        .filter_map(|write| match write {
            RegWrite::AlertTest(test) => Some(*test),
            _ => None,
        })
        .fold(AlertTest::default(), |acc, test| acc | test);
    let status = prev.status.latch(fsm.pulses);

    Snapshot {
        cycle: prev.cycle + 1,
        arbiter: prev
            .arbiter
            .next(&inputs.software, &inputs.test_port, prev.fsm.is_idle()),
        sync: prev.sync.next(inputs.crossings),
        escalation: prev.escalation.next(inputs.wipe_secrets, inputs.scrap_state),
        alerts: prev.alerts.next(&status.flags(), alert_test),
        status,
        view: DecodedView::derive(&fsm.next, &inputs.store),
        outcome: fsm.pulses,
        fsm: fsm.next,
    }
}

/// The controller with its configuration.
#[derive(Debug, Clone)]
pub struct LifecycleController {
    table: TransitionTable,
    snapshot: Snapshot,
}

impl LifecycleController {
    /// Worst-case steps from an escalation wire asserting to the
    /// controller reporting `Escalate`: one for the monitor register, one
    /// for the state machine.
    pub const ESCALATION_LATENCY: u64 = 2;

    /// Controller in reset, using `table`.
    pub fn new(table: TransitionTable) -> Self {
        Self {
            table,
            snapshot: Snapshot::default(),
        }
    }

    /// Configured transition graph.
    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// Current registers.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Advance one step and return the new outputs.
    pub fn tick(&mut self, inputs: &ControllerInputs) -> ControllerOutputs {
        self.snapshot = step(&self.snapshot, inputs, &self.table);
        self.snapshot.outputs()
    }

    /// Current outputs.
    pub fn outputs(&self) -> ControllerOutputs {
        self.snapshot.outputs()
    }

    /// Register view for `port`.
    pub fn port_view(&self, port: Port) -> PortView {
        self.snapshot.port_view(port)
    }

    /// Return every register to its reset value. This is the only way to
    /// clear sticky status or leave a terminal state.
    pub fn hard_reset(&mut self) {
        tracing::info!(
            cycle = self.snapshot.cycle,
            phase = self.snapshot.fsm.name(),
            "hard reset"
        );
        self.snapshot = Snapshot::default();
    }
}

impl Default for LifecycleController {
    fn default() -> Self {
        Self::new(TransitionTable::standard())
    }
}
