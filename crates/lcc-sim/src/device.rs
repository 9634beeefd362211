//! # Device Harness
//!
//! A [`LifecycleController`] wired to simulated peers. Each [`Device::tick`]
//! lets every peer react to the controller's registered outputs, then
//! advances the controller by one step with the queued port writes.
//!
//! Higher-level helpers (`boot`, `claim`, `transition`) drive common
//! sequences and bound every wait by [`SimConfig::max_wait_steps`],
//! reporting [`SimError::Stall`] instead of spinning forever.

use lcc_core::{OutcomeFlags, Port, Token, TransitionTable, TOKEN_WORDS};
use lcc_crypto::{Sha256TokenHasher, TokenHasher};
use lcc_state::{
    ControllerInputs, ControllerOutputs, CrossingInputs, EscalationCause, LifecycleController,
    PortView, RegWrite,
};

use crate::config::SimConfig;
use crate::error::SimError;
use crate::otp::OtpStore;
use crate::peers::{AckResponder, EscalationSender, HashService, PowerManager};

/// One transition request as issued by a port.
#[derive(Debug, Clone, Default)]
pub struct TransitionRequest {
    /// Raw target index.
    pub target: u32,
    /// Token to present.
    pub token: Token,
    /// Ask for the external clock.
    pub external_clock: bool,
}

/// Controller plus peers.
#[derive(Debug)]
pub struct Device<H: TokenHasher = Sha256TokenHasher> {
    config: SimConfig,
    controller: LifecycleController,
    store: OtpStore,
    hash: HashService<H>,
    clock: AckResponder,
    nvm: AckResponder,
    power: PowerManager,
    escalation: EscalationSender,
    software: Vec<RegWrite>,
    test_port: Vec<RegWrite>,
    outcomes: OutcomeFlags,
}

impl Device<Sha256TokenHasher> {
    /// Device with the standard table and the default SHA-256 hasher.
    pub fn new(config: SimConfig, store: OtpStore) -> Self {
        Self::with_parts(
            config,
            TransitionTable::standard(),
            store,
            Sha256TokenHasher::default(),
        )
    }
}

impl<H: TokenHasher> Device<H> {
    /// Device from explicit parts.
    pub fn with_parts(
        config: SimConfig,
        table: TransitionTable,
        store: OtpStore,
        hasher: H,
    ) -> Self {
        Self {
            controller: LifecycleController::new(table),
            store: store.with_latency(config.program_latency),
            hash: HashService::new(hasher, config.hash_latency),
            clock: AckResponder::new(config.clock_bypass_latency),
            nvm: AckResponder::new(config.wipe_latency),
            power: PowerManager::new(config.init_delay),
            escalation: EscalationSender::default(),
            software: Vec::new(),
            test_port: Vec::new(),
            outcomes: OutcomeFlags::NONE,
            config,
        }
    }

    /// Harness configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The controller.
    pub fn controller(&self) -> &LifecycleController {
        &self.controller
    }

    /// The simulated store.
    pub fn store(&self) -> &OtpStore {
        &self.store
    }

    /// Mutable access for fault injection.
    pub fn store_mut(&mut self) -> &mut OtpStore {
        &mut self.store
    }

    /// The hasher used by the simulated hashing service.
    pub fn hasher(&self) -> &H {
        self.hash.hasher()
    }

    /// Steps since the last hard reset.
    pub fn cycle(&self) -> u64 {
        self.controller.snapshot().cycle()
    }

    /// Queue a register write for the next step.
    pub fn write(&mut self, port: Port, write: RegWrite) {
        match port {
            Port::Software => self.software.push(write),
            Port::TestPort => self.test_port.push(write),
        }
    }

    /// What `port` reads back now.
    pub fn read(&self, port: Port) -> PortView {
        self.controller.port_view(port)
    }

    /// Current registered outputs.
    pub fn outputs(&self) -> ControllerOutputs {
        self.controller.outputs()
    }

    /// Assert or release an escalation line.
    pub fn escalate(&mut self, cause: EscalationCause, asserted: bool) {
        tracing::debug!(%cause, asserted, "escalation line driven");
        self.escalation.set(cause, asserted);
    }

    /// Drive both wires of an escalation pair to the same level.
    pub fn break_escalation_pair(&mut self, cause: EscalationCause) {
        self.escalation.break_pair(cause);
    }

    /// Reset the controller and every peer. Store contents persist.
    pub fn hard_reset(&mut self) {
        self.controller.hard_reset();
        self.store.reset();
        self.hash.reset();
        self.clock.reset();
        self.nvm.reset();
        self.power.reset();
        self.escalation.reset();
        self.software.clear();
        self.test_port.clear();
        self.outcomes = OutcomeFlags::NONE;
    }

    /// Advance one step.
    pub fn tick(&mut self) -> ControllerOutputs {
        let prev = self.controller.outputs();
        let program_ack = self.store.tick(prev.program_req);
        let hash_ack = self.hash.tick(prev.hash_req.as_ref());
        let (wipe_secrets, scrap_state) = self.escalation.wires();
        let inputs = ControllerInputs {
            software: std::mem::take(&mut self.software),
            test_port: std::mem::take(&mut self.test_port),
            crossings: CrossingInputs {
                init_req: self.power.tick(prev.init_done),
                clock_bypass_ack: self.clock.tick(prev.clock_bypass_req),
                wipe_ack: self.nvm.tick(prev.wipe_req),
            },
            store: self.store.readout(),
            hash_ack,
            program_ack,
            wipe_secrets,
            scrap_state,
        };
        let before = self.controller.snapshot().status().flags;
        let outputs = self.controller.tick(&inputs);
        self.outcomes = self.controller.snapshot().outcome();
        let after = self.controller.snapshot().status().flags;
        if after != before {
            tracing::debug!(cycle = self.cycle(), status = %after, "status changed");
        }
        outputs
    }

    /// Outcome pulses emitted on the most recent step.
    pub fn last_outcome(&self) -> OutcomeFlags {
        self.outcomes
    }

    /// Advance `steps` steps.
    pub fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            self.tick();
        }
    }

    /// Tick until `done` holds, at most `max_wait_steps` times. Returns
    /// the number of steps taken.
    pub fn run_until(&mut self, mut done: impl FnMut(&Self) -> bool) -> Result<u64, SimError> {
        for taken in 0..self.config.max_wait_steps {
            if done(self) {
                return Ok(taken);
            }
            self.tick();
        }
        if done(self) {
            return Ok(self.config.max_wait_steps);
        }
        Err(SimError::Stall {
            phase: self.controller.snapshot().fsm().name(),
            steps: self.config.max_wait_steps,
        })
    }

    /// Run until the power-up handshake completes.
    pub fn boot(&mut self) -> Result<u64, SimError> {
        let steps = self.run_until(|d| d.outputs().init_done)?;
        tracing::info!(steps, state = %self.read(Port::Software).state, "device booted");
        Ok(steps)
    }

    /// Acquire the mutex for `port`.
    pub fn claim(&mut self, port: Port) -> Result<(), SimError> {
        if self.read(port).owner.is_held_by(port) {
            return Ok(());
        }
        self.write(port, RegWrite::Claim(true));
        self.tick();
        let owner = self.read(port).owner;
        if owner.is_held_by(port) {
            Ok(())
        } else {
            Err(SimError::MutexUnavailable { port, owner })
        }
    }

    /// Release the mutex held by `port`.
    pub fn release(&mut self, port: Port) {
        self.write(port, RegWrite::Claim(false));
        self.tick();
    }

    /// Issue a complete transition attempt from `port` and wait for its
    /// outcome. The mutex is claimed if needed and left held afterwards.
    pub fn transition(
        &mut self,
        port: Port,
        request: &TransitionRequest,
    ) -> Result<OutcomeFlags, SimError> {
        let fsm = self.controller.snapshot().fsm();
        if !fsm.is_idle() {
            return Err(SimError::NotReady(format!("state machine in {}", fsm.name())));
        }
        self.claim(port)?;

        self.write(port, RegWrite::Target(request.target));
        for index in 0..TOKEN_WORDS {
            self.write(
                port,
                RegWrite::TokenWord {
                    index,
                    value: request.token.word(index),
                },
            );
        }
        self.write(port, RegWrite::ExternalClock(request.external_clock));
        self.write(port, RegWrite::Go);
        self.tick();

        let started = self.cycle();
        self.run_until(|d| {
            let fsm = d.controller.snapshot().fsm();
            (fsm.is_idle() || fsm.is_terminal()) && d.cycle() > started
        })?;
        Ok(self.outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lcc_core::{DecodedState, IdentityState, LifecycleState, TokenKind, TransitionCount};

    fn device(state: LifecycleState, count: u32) -> Device {
        let store = OtpStore::new(
            state,
            TransitionCount::new(count).unwrap(),
            IdentityState::Blank,
        );
        let mut d = Device::new(SimConfig::default(), store);
        d.boot().unwrap();
        d
    }

    #[test]
    fn boots_into_store_state() {
        let d = device(LifecycleState::Dev, 2);
        assert_eq!(
            d.read(Port::Software).state,
            DecodedState::Valid(LifecycleState::Dev)
        );
        assert!(d.outputs().idle);
    }

    #[test]
    fn unauthenticated_transition_commits() {
        let mut d = device(LifecycleState::TestUnlocked0, 1);
        let outcome = d
            .transition(
                Port::TestPort,
                &TransitionRequest {
                    target: LifecycleState::TestLocked0.index(),
                    ..TransitionRequest::default()
                },
            )
            .unwrap();
        assert_eq!(outcome, OutcomeFlags::success());
        let view = d.read(Port::TestPort);
        assert_eq!(view.state, DecodedState::Valid(LifecycleState::TestLocked0));
        assert_eq!(view.count.map(TransitionCount::value), Some(2));
    }

    #[test]
    fn claim_fails_when_held() {
        let mut d = device(LifecycleState::Dev, 1);
        d.claim(Port::TestPort).unwrap();
        assert!(matches!(
            d.claim(Port::Software),
            Err(SimError::MutexUnavailable { .. })
        ));
    }

    #[test]
    fn waits_are_bounded() {
        let config = SimConfig {
            max_wait_steps: 16,
            ..SimConfig::default()
        };
        let mut d = Device::new(config, OtpStore::blank());
        d.boot().unwrap();
        let err = d.run_until(|_| false).unwrap_err();
        assert!(matches!(err, SimError::Stall { phase: "IDLE", steps: 16 }));
    }

    #[test]
    fn injected_program_failure_surfaces() {
        let mut d = device(LifecycleState::Dev, 1);
        let token = Token::from_words([5; 4]);
        d.store_mut()
            .provision_token(TokenKind::Rma, Sha256TokenHasher::default().hash(&token));
        d.store_mut().fail_next_program();
        let outcome = d
            .transition(
                Port::Software,
                &TransitionRequest {
                    target: LifecycleState::Rma.index(),
                    token,
                    external_clock: false,
                },
            )
            .unwrap();
        assert!(outcome.programming_error);
    }
}
