//! # Run Subcommand
//!
//! Loads a scenario file, runs it against a simulated device and prints
//! the report. Failed expectations give exit code 1; a scenario that
//! cannot be loaded or stalls is an operational error.
//!
//! `--config` replaces the harness configuration embedded in the scenario
//! with one loaded from its own YAML file.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use lcc_sim::{Scenario, ScenarioReport, SimConfig};

use crate::OutputFormat;

/// Arguments for the `lcc run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario file (YAML).
    #[arg(value_name = "SCENARIO")]
    pub path: PathBuf,

    /// Harness configuration file, overriding the scenario's own.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Execute the run subcommand.
pub fn run_scenario(args: &RunArgs) -> Result<u8> {
    let mut scenario = Scenario::load(&args.path)
        .with_context(|| format!("failed to load scenario {}", args.path.display()))?;
    if let Some(path) = &args.config {
        scenario.config = SimConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "harness config overridden");
    }
    let name = scenario.name.as_deref().unwrap_or("scenario");
    tracing::info!(name, steps = scenario.steps.len(), "running scenario");

    let report = scenario
        .run()
        .with_context(|| format!("scenario '{name}' aborted"))?;

    match args.format {
        OutputFormat::Text => print!("{}", render_report(&report)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize report")?
        ),
    }

    Ok(if report.passed() { 0 } else { 1 })
}

/// Text rendering of a report.
pub fn render_report(report: &ScenarioReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Scenario: {}", report.name);
    for step in &report.steps {
        let _ = write!(out, "  [{:>3}] cycle {:>5}  {}", step.index, step.cycle, step.action);
        if let Some(outcome) = &step.outcome {
            let _ = write!(out, " -> {outcome}");
        }
        out.push('\n');
    }

    let view = &report.final_view;
    let count = view
        .count
        .map_or_else(|| "invalid".to_string(), |c| c.to_string());
    let identity = view
        .identity
        .map_or_else(|| "invalid".to_string(), |i| i.to_string());
    let _ = writeln!(
        out,
        "Final: state={} count={count} identity={identity} owner={} status={}",
        view.state, view.owner, view.status.flags
    );

    if report.passed() {
        let _ = writeln!(out, "PASS");
    } else {
        let _ = writeln!(out, "FAIL ({} failed expectations)", report.failures.len());
        for failure in &report.failures {
            let _ = writeln!(out, "  - {failure}");
        }
    }
    out
}
