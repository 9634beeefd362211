//! # lcc-sim: Lifecycle Controller Simulation Harness
//!
//! Wraps the synchronous controller core in behavioural models of its
//! collaborators so complete transition sequences can be driven and
//! observed:
//!
//! - **[`OtpStore`]**: the write-once state store, with programming
//!   latency and fault injection.
//! - **[`peers`]**: hashing service, clock-bypass and wipe responders,
//!   power manager, escalation sender.
//! - **[`Device`]**: the controller wired to all of the above, with
//!   bounded waits for multi-step sequences.
//! - **[`Scenario`]**: YAML-scripted runs producing a report.
//!
//! ## Crate Policy
//!
//! - The controller core is never modified from here; the harness only
//!   feeds it inputs and reads its outputs.
//! - Every wait is bounded by [`SimConfig::max_wait_steps`].

pub mod config;
pub mod device;
pub mod error;
pub mod otp;
pub mod peers;
pub mod scenario;

pub use config::SimConfig;
pub use device::{Device, TransitionRequest};
pub use error::SimError;
pub use otp::OtpStore;
pub use scenario::{Scenario, ScenarioReport, ScenarioStep};
