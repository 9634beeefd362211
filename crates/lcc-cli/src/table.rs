//! # Table Subcommand
//!
//! Validates a transition table and prints its edges. Without `--file`
//! the shipped standard table is printed, which is a convenient starting
//! point for a board-specific table:
//!
//! ```bash
//! lcc table --yaml > board-table.yaml
//! lcc table --file board-table.yaml --from TEST_LOCKED0
//! ```

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use lcc_core::{LifecycleState, TransitionTable};

/// Arguments for the `lcc table` subcommand.
#[derive(Args, Debug)]
pub struct TableArgs {
    /// Table file (YAML). Defaults to the standard table.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Only list edges leaving this state.
    #[arg(long, value_name = "STATE")]
    pub from: Option<LifecycleState>,

    /// Print the table as YAML instead of a listing.
    #[arg(long)]
    pub yaml: bool,
}

/// Execute the table subcommand.
///
/// Returns 1 when the file parses but fails validation.
pub fn run_table(args: &TableArgs) -> Result<u8> {
    let table = match &args.file {
        None => TransitionTable::standard(),
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            match TransitionTable::from_yaml_str(&content) {
                Ok(table) => table,
                Err(e) => {
                    println!("INVALID: {}: {e}", path.display());
                    return Ok(1);
                }
            }
        }
    };
    tracing::info!(rules = table.len(), "transition table loaded");

    if args.yaml {
        let yaml = table.to_yaml_string().context("failed to serialize table")?;
        print!("{yaml}");
    } else {
        print!("{}", render_table(&table, args.from));
    }
    Ok(0)
}

/// One line per edge, optionally restricted to a source state.
pub fn render_table(table: &TransitionTable, from: Option<LifecycleState>) -> String {
    let mut out = String::new();
    let mut shown = 0usize;
    for rule in table.rules().filter(|r| from.map_or(true, |f| r.from == f)) {
        let _ = write!(out, "{:<16} -> {:<16}", rule.from.name(), rule.to.name());
        match rule.token {
            Some(kind) => {
                let _ = write!(out, " token={kind}");
            }
            None => out.push_str(" open"),
        }
        if rule.wipe {
            out.push_str(" wipe");
        }
        out.push('\n');
        shown += 1;
    }
    let _ = writeln!(out, "{shown} of {} rules", table.len());
    out
}
