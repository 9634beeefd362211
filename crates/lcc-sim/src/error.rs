//! # Simulation Error Types

use std::path::PathBuf;

use lcc_core::{LccError, MutexOwner, Port, TableError};
use lcc_crypto::CryptoError;
use thiserror::Error;

/// Errors raised by the simulation harness.
///
/// The controller itself never fails; these describe the harness noticing
/// that something it was asked to drive did not happen, or that its own
/// configuration is unusable.
#[derive(Error, Debug)]
pub enum SimError {
    /// A wait exceeded the configured step limit.
    #[error("stalled in {phase} after {steps} steps")]
    Stall {
        /// State machine phase at the time of the stall.
        phase: &'static str,
        /// Steps waited.
        steps: u64,
    },

    /// The port could not obtain the mutex.
    #[error("{port} could not acquire the transition mutex (held by {owner})")]
    MutexUnavailable {
        /// Requesting port.
        port: Port,
        /// Current owner.
        owner: MutexOwner,
    },

    /// The controller is in a state that cannot accept the operation.
    #[error("controller not ready: {0}")]
    NotReady(String),

    /// A scenario expectation did not hold.
    #[error("expectation failed at step {step}: {message}")]
    Expectation {
        /// Zero-based scenario step index.
        step: usize,
        /// What differed.
        message: String,
    },

    /// Invalid harness configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Scenario or config file not found.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Missing path.
        path: PathBuf,
    },

    /// YAML parsing failed.
    #[error("YAML parse error in {}: {source}", path.display())]
    YamlParse {
        /// File being parsed.
        path: PathBuf,
        /// Underlying error.
        source: serde_yaml::Error,
    },

    /// Transition table error.
    #[error(transparent)]
    Table(#[from] TableError),

    /// Token parsing error.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Core error.
    #[error(transparent)]
    Core(#[from] LccError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
