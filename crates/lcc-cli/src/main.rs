//! # lcc CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lcc_cli::enables::{run_enables, EnablesArgs};
use lcc_cli::run::{run_scenario, RunArgs};
use lcc_cli::table::{run_table, TableArgs};
use lcc_cli::token::{run_hash_token, HashTokenArgs};

/// Lifecycle controller toolchain.
///
/// Runs scripted transition scenarios against a simulated device and
/// inspects the configuration the controller is built from.
#[derive(Parser, Debug)]
#[command(name = "lcc", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit log lines as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute a YAML scenario and report failed expectations.
    Run(RunArgs),

    /// Validate and print a transition table.
    Table(TableArgs),

    /// Print the capability enables broadcast for a lifecycle state.
    Enables(EnablesArgs),

    /// Hash a raw transition token for provisioning.
    HashToken(HashTokenArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v when set.
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "lcc starting");

    let result = match cli.command {
        Commands::Run(args) => run_scenario(&args),
        Commands::Table(args) => run_table(&args),
        Commands::Enables(args) => run_enables(&args),
        Commands::HashToken(args) => run_hash_token(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
