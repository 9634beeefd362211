//! # lcc-crypto: Token Hashing
//!
//! The controller authenticates privileged transitions by sending the raw
//! token to a hashing service and comparing the result with a reference
//! digest held in the state store. This crate provides:
//!
//! - **[`TokenHasher`]**: the hashing-service abstraction. The controller
//!   core is algorithm-agnostic; it only ever sees [`HashedToken`] values.
//! - **[`Sha256TokenHasher`]**: the default, domain-separated SHA-256
//!   implementation used by the simulation harness and the CLI.
//! - **Hex parsing** for raw tokens supplied by operators and config files.
//!
//! ## Crate Policy
//!
//! - Depends only on `lcc-core` internally.
//! - Raw token material is zeroized after use.
//!
//! [`HashedToken`]: lcc_core::HashedToken

pub mod error;
pub mod hasher;

pub use error::CryptoError;
pub use hasher::{parse_token_hex, Sha256TokenHasher, TokenHasher};
