//! # Error Types: Structured Error Hierarchy
//!
//! Errors for the configuration and decoding surfaces of the controller.
//! The synchronous core itself never returns these: inside a clock step
//! every failure is a named outcome pulse. These types cover what happens
//! around the core (parsing states, loading tables, decoding words).

use thiserror::Error;

use crate::state::LifecycleState;

/// Top-level error type for the lifecycle controller stack.
#[derive(Error, Debug)]
pub enum LccError {
    /// A persisted or register word did not decode.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// The transition table failed validation.
    #[error("transition table error: {0}")]
    Table(#[from] TableError),

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A word that does not map to any member of its enumeration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// Lifecycle state word is not a valid thermometer code.
    #[error("invalid lifecycle state word {0:#010x}")]
    StateWord(u32),

    /// Transition count word is not a valid thermometer code.
    #[error("invalid transition count word {0:#010x}")]
    CountWord(u32),

    /// Identity state word is neither blank nor personalized.
    #[error("invalid identity state word {0:#010x}")]
    IdentityWord(u32),

    /// Register value used as a lifecycle state index is out of range.
    #[error("lifecycle state index {0} out of range")]
    StateIndex(u32),

    /// State name is not recognized.
    #[error("unknown lifecycle state name: {0}")]
    StateName(String),

    /// Identity state name is not recognized.
    #[error("unknown identity state name: {0}")]
    IdentityName(String),

    /// Transition count exceeds the maximum.
    #[error("transition count {0} exceeds maximum")]
    Count(u32),
}

/// Transition table validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// A rule does not move strictly forward in the lifecycle order.
    #[error("non-monotonic rule {from} -> {to}")]
    NonMonotonic {
        /// Source state of the offending rule.
        from: LifecycleState,
        /// Target state of the offending rule.
        to: LifecycleState,
    },

    /// The same edge was listed twice.
    #[error("duplicate rule {from} -> {to}")]
    Duplicate {
        /// Source state of the duplicated rule.
        from: LifecycleState,
        /// Target state of the duplicated rule.
        to: LifecycleState,
    },

    /// SCRAP is terminal and may not have outgoing edges.
    #[error("rule leaves terminal state SCRAP -> {0}")]
    LeavesScrap(LifecycleState),

    /// YAML parsing failed.
    #[error("failed to parse transition table: {0}")]
    Parse(String),
}
