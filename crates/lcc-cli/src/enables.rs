//! # Enables Subcommand
//!
//! Prints the capability enables the controller broadcasts for a given
//! decoded state, using the same decode the controller runs every step.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use clap::Args;

use lcc_core::{BroadcastEnables, DecodedState, IdentityState};
use lcc_state::{broadcast, DecodedView};

use crate::OutputFormat;

/// Arguments for the `lcc enables` subcommand.
#[derive(Args, Debug)]
pub struct EnablesArgs {
    /// Lifecycle state, or INITIALIZING / ESCALATE / INVALID.
    #[arg(value_name = "STATE")]
    pub state: DecodedState,

    /// Identity state the provisioning enables are derived from.
    #[arg(long, default_value = "BLANK")]
    pub identity: IdentityState,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Execute the enables subcommand.
pub fn run_enables(args: &EnablesArgs) -> Result<u8> {
    let view = DecodedView {
        state: args.state,
        count: None,
        identity: Some(args.identity),
    };
    let enables = broadcast::enables(&view);
    match args.format {
        OutputFormat::Text => print!("{}", render_enables(args.state, &enables)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&enables).context("failed to serialize enables")?
        ),
    }
    Ok(0)
}

/// One line per signal.
pub fn render_enables(state: DecodedState, enables: &BroadcastEnables) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{state}");
    for (name, on) in enables.entries() {
        let _ = writeln!(out, "  {name:<16} {}", if on { "on" } else { "off" });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lcc_core::LifecycleState;

    fn decode(state: &str, identity: &str) -> BroadcastEnables {
        let view = DecodedView {
            state: state.parse().unwrap(),
            count: None,
            identity: Some(identity.parse().unwrap()),
        };
        broadcast::enables(&view)
    }

    #[test]
    fn prod_follows_identity() {
        let blank = decode("PROD", "BLANK");
        assert!(blank.provision_write && !blank.provision_read);
        let personalized = decode("PROD", "PERSONALIZED");
        assert!(!personalized.provision_write && personalized.provision_read);
        assert!(!personalized.hw_debug);
    }

    #[test]
    fn escalate_is_safe() {
        assert_eq!(decode("ESCALATE", "BLANK"), BroadcastEnables::SAFE);
        assert_eq!(decode("INITIALIZING", "BLANK"), BroadcastEnables::DISABLED);
    }

    #[test]
    fn text_lists_every_signal() {
        let state = DecodedState::Valid(LifecycleState::TestUnlocked2);
        let enables = decode("TEST_UNLOCKED2", "BLANK");
        let text = render_enables(state, &enables);
        assert!(text.starts_with("TEST_UNLOCKED2\n"));
        assert_eq!(text.lines().count(), 9);
        assert!(text.contains("debug            on"));
        assert!(text.contains("escalate         off"));
    }

    #[test]
    fn handler_succeeds() {
        let args = EnablesArgs {
            state: DecodedState::Valid(LifecycleState::Rma),
            identity: IdentityState::Personalized,
            format: OutputFormat::Json,
        };
        assert_eq!(run_enables(&args).unwrap(), 0);
    }
}
