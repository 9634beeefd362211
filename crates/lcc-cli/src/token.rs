//! # Hash-Token Subcommand
//!
//! Computes the reference digest to provision for a raw transition token.
//! The raw token is read from the command line or, with `-`, from stdin so
//! it stays out of shell history. Raw token text is wiped once hashed.

use std::io::Read;

use anyhow::{Context, Result};
use clap::Args;

use lcc_crypto::{parse_token_hex, Sha256TokenHasher, TokenHasher};
use zeroize::Zeroizing;

/// Arguments for the `lcc hash-token` subcommand.
#[derive(Args, Debug)]
pub struct HashTokenArgs {
    /// Raw token as 32 hex digits, or `-` to read it from stdin.
    #[arg(value_name = "HEX")]
    pub token: String,

    /// Domain tag for the hash. Must match the device hashing service.
    #[arg(long)]
    pub domain: Option<String>,
}

/// Execute the hash-token subcommand.
pub fn run_hash_token(args: &HashTokenArgs) -> Result<u8> {
    let input = read_token(&args.token, std::io::stdin())?;
    println!("{}", hash_token(&input, args.domain.as_deref())?);
    Ok(0)
}

/// The raw token text: `arg` itself, or everything on `stdin` when `arg`
/// is `-`.
fn read_token(arg: &str, mut stdin: impl Read) -> Result<Zeroizing<String>> {
    if arg != "-" {
        return Ok(Zeroizing::new(arg.to_string()));
    }
    let mut buf = Zeroizing::new(String::new());
    stdin
        .read_to_string(&mut buf)
        .context("failed to read token from stdin")?;
    Ok(buf)
}

/// Hex digest of a raw hex token.
pub fn hash_token(hex_token: &str, domain: Option<&str>) -> Result<String> {
    let token = parse_token_hex(hex_token).context("invalid token")?;
    let hasher = match domain {
        Some(domain) => Sha256TokenHasher::with_domain(domain),
        None => Sha256TokenHasher::default(),
    };
    tracing::debug!(algorithm = hasher.algorithm(), "hashing token");
    Ok(hasher.hash(&token).to_hex())
}
