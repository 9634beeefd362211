//! # lcc-cli: Lifecycle Controller Command Line
//!
//! Provides the `lcc` binary. Every subcommand is a thin shell over the
//! library crates; no controller behaviour lives here.
//!
//! ## Subcommands
//!
//! - `lcc run`: execute a YAML scenario against the simulated device.
//! - `lcc table`: validate and print a transition table.
//! - `lcc enables`: print the broadcast decode of a lifecycle state.
//! - `lcc hash-token`: print the reference digest of a raw token.
//!
//! ```bash
//! lcc run scenarios/rma.yaml --json
//! lcc table --file board-table.yaml --from DEV
//! lcc enables PROD --identity personalized
//! ```
//!
//! Handlers return a process exit code: 0 on success, 1 when the checked
//! artifact fails (failed expectations, invalid table).

pub mod enables;
pub mod run;
pub mod table;
pub mod token;

/// Output format shared by the reporting subcommands.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON document on stdout.
    Json,
}
