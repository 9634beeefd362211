//! # Scenarios
//!
//! A scenario is a YAML script: an initial store, optional harness config
//! and transition table, and a list of steps. Running it produces a
//! [`ScenarioReport`]; failed `expect` steps are collected in the report
//! rather than aborting the run, while harness errors (stalls, unusable
//! tokens) abort with a [`SimError`].
//!
//! ```yaml
//! name: leave test
//! store:
//!   state: TEST_LOCKED1
//!   count: 5
//!   tokens:
//!     TEST_EXIT: 00112233445566778899aabbccddeeff
//! steps:
//!   - boot
//!   - transition: { port: SOFTWARE, target: PROD, token: 00112233445566778899aabbccddeeff }
//!   - expect: { state: PROD, count: 6, outcome: [SUCCESS] }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use lcc_core::{
    DecodedState, IdentityState, LifecycleState, MutexOwner, OutcomeFlags, Port, TokenKind,
    TransitionCount, TransitionTable,
};
use lcc_crypto::{parse_token_hex, Sha256TokenHasher, TokenHasher};
use lcc_state::{EscalationCause, PortView, RegWrite};
use serde::{Deserialize, Serialize};

use crate::config::{read_file, SimConfig};
use crate::device::{Device, TransitionRequest};
use crate::error::SimError;
use crate::otp::OtpStore;

/// Initial store contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSetup {
    /// Persisted lifecycle state.
    pub state: LifecycleState,
    /// Transitions already consumed.
    #[serde(default)]
    pub count: TransitionCount,
    /// Identity state.
    #[serde(default = "blank_identity")]
    pub identity: IdentityState,
    /// Raw tokens (hex); their hashes are provisioned as references.
    #[serde(default)]
    pub tokens: BTreeMap<TokenKind, String>,
}

fn blank_identity() -> IdentityState {
    IdentityState::Blank
}

fn asserted() -> bool {
    true
}

/// Injected fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    /// Overwrite the persisted state word.
    CorruptStateWord(u32),
    /// Refuse the next program request.
    FailNextProgram,
    /// Raise or clear the store's read-side error flag.
    ReadError(bool),
    /// Drive both wires of an escalation pair to the same level.
    BreakEscalationPair(EscalationCause),
}

/// Checks against the port view and outputs. Absent fields are not checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectation {
    /// Port whose view is checked (default software).
    #[serde(default)]
    pub port: Option<Port>,
    /// Decoded state, e.g. `PROD`, `ESCALATE`, `INVALID`.
    #[serde(default)]
    pub state: Option<String>,
    /// Decoded count.
    #[serde(default)]
    pub count: Option<u32>,
    /// Decoded identity.
    #[serde(default)]
    pub identity: Option<IdentityState>,
    /// Mutex owner.
    #[serde(default)]
    pub owner: Option<MutexOwner>,
    /// Exact set of sticky status flags.
    #[serde(default)]
    pub flags: Option<Vec<String>>,
    /// Exact outcome of the most recent transition step.
    #[serde(default)]
    pub outcome: Option<Vec<String>>,
    /// Exact set of asserted broadcast enables.
    #[serde(default)]
    pub enables: Option<Vec<String>>,
    /// Live target register as read by `port`.
    #[serde(default)]
    pub target: Option<u32>,
}

/// One scenario step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Run until init done.
    Boot,
    /// Advance a number of steps.
    Tick(u64),
    /// Write claim = 1 from a port and advance one step.
    Claim(Port),
    /// Write claim = 0 from a port and advance one step.
    Release(Port),
    /// Queue raw register writes from a port and advance one step.
    Write {
        /// Writing port.
        port: Port,
        /// Writes, applied in order.
        writes: Vec<RegWrite>,
    },
    /// A complete transition attempt.
    Transition {
        /// Issuing port.
        port: Port,
        /// Target state.
        target: LifecycleState,
        /// Raw token (hex).
        #[serde(default)]
        token: Option<String>,
        /// Request the external clock.
        #[serde(default)]
        external_clock: bool,
    },
    /// Drive an escalation line.
    Escalate {
        /// Line.
        line: EscalationCause,
        /// Level (default asserted).
        #[serde(default = "asserted")]
        asserted: bool,
    },
    /// Inject a fault.
    Fault(Fault),
    /// Hard-reset the device and run until init done.
    HardReset,
    /// Check the current view.
    Expect(Expectation),
}

impl ScenarioStep {
    fn label(&self) -> String {
        match self {
            Self::Boot => "boot".to_string(),
            Self::Tick(n) => format!("tick {n}"),
            Self::Claim(port) => format!("claim {port}"),
            Self::Release(port) => format!("release {port}"),
            Self::Write { port, writes } => format!("write {port} ({} regs)", writes.len()),
            Self::Transition { port, target, .. } => format!("transition {port} -> {target}"),
            Self::Escalate { line, asserted } => format!("escalate {line}={asserted}"),
            Self::Fault(fault) => format!("fault {fault:?}"),
            Self::HardReset => "hard reset".to_string(),
            Self::Expect(_) => "expect".to_string(),
        }
    }
}

/// A complete scenario document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Harness configuration.
    #[serde(default)]
    pub config: SimConfig,
    /// Transition table (standard table when absent).
    #[serde(default)]
    pub table: Option<TransitionTable>,
    /// Initial store.
    pub store: StoreSetup,
    /// Steps.
    pub steps: Vec<ScenarioStep>,
}

/// Record of one executed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// Zero-based index.
    pub index: usize,
    /// Human-readable action.
    pub action: String,
    /// Controller cycle after the step.
    pub cycle: u64,
    /// Outcome pulses of a transition step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

/// Result of running a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Executed steps.
    pub steps: Vec<StepRecord>,
    /// Failed expectations.
    pub failures: Vec<String>,
    /// Software-port view at the end.
    pub final_view: PortView,
}

impl ScenarioReport {
    /// Whether every expectation held.
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Scenario {
    /// Parse and validate a YAML scenario.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SimError> {
        let scenario: Self =
            serde_yaml::from_str(yaml).map_err(|e| SimError::Config(e.to_string()))?;
        scenario.config.validate()?;
        Ok(scenario)
    }

    /// Load and validate a YAML scenario file.
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let content = read_file(path)?;
        let scenario: Self = serde_yaml::from_str(&content).map_err(|e| SimError::YamlParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        scenario.config.validate()?;
        Ok(scenario)
    }

    /// Build the device described by the scenario header.
    pub fn device(&self) -> Result<Device, SimError> {
        let hasher = Sha256TokenHasher::default();
        let mut store = OtpStore::new(self.store.state, self.store.count, self.store.identity);
        for (kind, raw) in &self.store.tokens {
            let token = parse_token_hex(raw)?;
            store.provision_token(*kind, hasher.hash(&token));
        }
        Ok(Device::with_parts(
            self.config,
            self.table.clone().unwrap_or_default(),
            store,
            hasher,
        ))
    }

    /// Execute every step.
    pub fn run(&self) -> Result<ScenarioReport, SimError> {
        let name = self.name.clone().unwrap_or_else(|| "scenario".to_string());
        let _span = tracing::info_span!("scenario", %name).entered();
        let mut device = self.device()?;
        let mut records = Vec::with_capacity(self.steps.len());
        let mut failures = Vec::new();

        for (index, step) in self.steps.iter().enumerate() {
            let mut outcome = None;
            match step {
                ScenarioStep::Boot => {
                    device.boot()?;
                }
                ScenarioStep::Tick(n) => device.run(*n),
                ScenarioStep::Claim(port) => {
                    device.write(*port, RegWrite::Claim(true));
                    device.tick();
                }
                ScenarioStep::Release(port) => device.release(*port),
                ScenarioStep::Write { port, writes } => {
                    for write in writes {
                        device.write(*port, *write);
                    }
                    device.tick();
                }
                ScenarioStep::Transition {
                    port,
                    target,
                    token,
                    external_clock,
                } => {
                    let token = match token {
                        Some(raw) => parse_token_hex(raw)?,
                        None => Default::default(),
                    };
                    let flags = device.transition(
                        *port,
                        &TransitionRequest {
                            target: target.index(),
                            token,
                            external_clock: *external_clock,
                        },
                    )?;
                    outcome = Some(flags.to_string());
                }
                ScenarioStep::Escalate { line, asserted } => {
                    device.escalate(*line, *asserted);
                    device.tick();
                }
                ScenarioStep::Fault(fault) => {
                    apply_fault(&mut device, *fault);
                    device.tick();
                }
                ScenarioStep::HardReset => {
                    device.hard_reset();
                    device.boot()?;
                }
                ScenarioStep::Expect(expectation) => {
                    for message in check(&device, expectation) {
                        tracing::warn!(step = index, %message, "expectation failed");
                        failures.push(format!("step {index}: {message}"));
                    }
                }
            }
            records.push(StepRecord {
                index,
                action: step.label(),
                cycle: device.cycle(),
                outcome,
            });
        }

        Ok(ScenarioReport {
            name,
            steps: records,
            failures,
            final_view: device.read(Port::Software),
        })
    }
}

fn apply_fault<H: TokenHasher>(device: &mut Device<H>, fault: Fault) {
    match fault {
        Fault::CorruptStateWord(word) => device.store_mut().corrupt_state_word(word),
        Fault::FailNextProgram => device.store_mut().fail_next_program(),
        Fault::ReadError(error) => device.store_mut().set_read_error(error),
        Fault::BreakEscalationPair(line) => device.break_escalation_pair(line),
    }
}

fn parse_flags(names: &[String]) -> Result<OutcomeFlags, String> {
    let mut flags = OutcomeFlags::NONE;
    for name in names {
        if !flags.set_by_name(name) {
            return Err(format!("unknown flag {name}"));
        }
    }
    Ok(flags)
}

fn check<H: TokenHasher>(device: &Device<H>, expect: &Expectation) -> Vec<String> {
    let mut failures = Vec::new();
    let port = expect.port.unwrap_or(Port::Software);
    let view = device.read(port);

    if let Some(state) = &expect.state {
        match state.parse::<DecodedState>() {
            Ok(want) if want == view.state => {}
            Ok(want) => failures.push(format!("state: expected {want}, got {}", view.state)),
            Err(e) => failures.push(format!("state: {e}")),
        }
    }
    if let Some(count) = expect.count {
        let got = view.count.map(TransitionCount::value);
        if got != Some(count) {
            failures.push(format!("count: expected {count}, got {got:?}"));
        }
    }
    if let Some(identity) = expect.identity {
        if view.identity != Some(identity) {
            failures.push(format!("identity: expected {identity}, got {:?}", view.identity));
        }
    }
    if let Some(owner) = expect.owner {
        if view.owner != owner {
            failures.push(format!("owner: expected {owner}, got {}", view.owner));
        }
    }
    if let Some(target) = expect.target {
        if view.target != target {
            failures.push(format!("target: expected {target}, got {}", view.target));
        }
    }
    for (label, names, got) in [
        ("flags", &expect.flags, view.status.flags),
        ("outcome", &expect.outcome, device.last_outcome()),
    ] {
        let Some(names) = names else { continue };
        match parse_flags(names) {
            Ok(want) if want == got => {}
            Ok(want) => failures.push(format!("{label}: expected {want}, got {got}")),
            Err(e) => failures.push(format!("{label}: {e}")),
        }
    }
    if let Some(names) = &expect.enables {
        let mut want: Vec<&str> = names.iter().map(String::as_str).collect();
        want.sort_unstable();
        let mut got: Vec<&str> = device
            .outputs()
            .enables
            .entries()
            .into_iter()
            .filter_map(|(name, on)| on.then_some(name))
            .collect();
        got.sort_unstable();
        if want != got {
            failures.push(format!("enables: expected {want:?}, got {got:?}"));
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXIT_TOKEN: &str = "00112233445566778899aabbccddeeff";

    #[test]
    fn test_exit_with_token() {
        let yaml = format!(
            r#"
name: leave test
store:
  state: TEST_LOCKED1
  count: 5
  tokens:
    TEST_EXIT: {EXIT_TOKEN}
steps:
  - boot
  - transition: {{ port: SOFTWARE, target: PROD, token: {EXIT_TOKEN} }}
  - expect: {{ state: PROD, count: 6, outcome: [SUCCESS], owner: SOFTWARE }}
  - transition: {{ port: SOFTWARE, target: DEV }}
  - expect: {{ state: PROD, count: 6, outcome: [TRANSITION_ERROR] }}
"#
        );
        let report = Scenario::from_yaml_str(&yaml).unwrap().run().unwrap();
        assert!(report.passed(), "{:?}", report.failures);
        assert_eq!(report.name, "leave test");
        assert_eq!(report.steps[1].outcome.as_deref(), Some("SUCCESS"));
        assert_eq!(report.steps[3].outcome.as_deref(), Some("TRANSITION_ERROR"));
    }

    #[test]
    fn failed_expectations_are_collected() {
        let yaml = r#"
store: { state: PROD }
steps:
  - boot
  - expect: { state: DEV, owner: TEST_PORT }
"#;
        let report = Scenario::from_yaml_str(yaml).unwrap().run().unwrap();
        assert!(!report.passed());
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures[0].contains("expected DEV, got PROD"));
    }

    #[test]
    fn rma_with_wipe_and_enables() {
        let yaml = r#"
store:
  state: PROD
  count: 3
  identity: PERSONALIZED
  tokens:
    RMA: 0x0f0e0d0c_0b0a0908_07060504_03020100
steps:
  - boot
  - expect: { enables: [cpu, key_manager, provision_read] }
  - transition: { port: TEST_PORT, target: RMA, token: 0f0e0d0c0b0a090807060504030201ff }
  - expect: { port: TEST_PORT, state: PROD, outcome: [TOKEN_ERROR], flags: [TOKEN_ERROR] }
  - transition: { port: TEST_PORT, target: RMA, token: 0f0e0d0c0b0a09080706050403020100 }
  - expect: { port: TEST_PORT, state: RMA, count: 4, outcome: [SUCCESS], flags: [SUCCESS, TOKEN_ERROR] }
"#;
        let report = Scenario::from_yaml_str(yaml).unwrap().run().unwrap();
        assert!(report.passed(), "{:?}", report.failures);
        assert_eq!(report.final_view.state, DecodedState::Valid(LifecycleState::Rma));
    }

    #[test]
    fn faults_and_escalation() {
        let yaml = r#"
store: { state: DEV, count: 1 }
steps:
  - boot
  - fault: { read_error: true }
  - tick: 2
  - expect: { state: INVALID, flags: [STATE_ERROR, STORE_ERROR], enables: [escalate] }
  - escalate: { line: SCRAP_STATE }
  - tick: 2
  - expect: { state: ESCALATE }
  - hard_reset
  - expect: { state: INVALID, flags: [STATE_ERROR, STORE_ERROR] }
  - fault: { read_error: false }
  - hard_reset
  - expect: { state: DEV, flags: [] }
"#;
        let report = Scenario::from_yaml_str(yaml).unwrap().run().unwrap();
        assert!(report.passed(), "{:?}", report.failures);
    }

    #[test]
    fn rejects_bad_documents() {
        assert!(Scenario::from_yaml_str("steps: []\n").is_err());
        assert!(Scenario::from_yaml_str("store: { state: DEV }\nsteps: [ { explode: 1 } ]\n").is_err());
        let bad_token = "store: { state: RAW, tokens: { RAW_UNLOCK: abcd } }\nsteps: []\n";
        let scenario = Scenario::from_yaml_str(bad_token).unwrap();
        assert!(matches!(scenario.run(), Err(SimError::Crypto(_))));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boot.yaml");
        std::fs::write(&path, "store: { state: RAW }\nsteps: [ boot, { expect: { state: RAW } } ]\n").unwrap();
        let report = Scenario::load(&path).unwrap().run().unwrap();
        assert!(report.passed());
        assert_eq!(report.steps.len(), 2);
    }
}
