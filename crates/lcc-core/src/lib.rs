//! # lcc-core: Foundational Types for the Lifecycle Controller
//!
//! This crate is the leaf of the `lcc-*` workspace. It defines the value
//! types every other crate exchanges: lifecycle and identity states, their
//! persisted encodings, authentication tokens, the broadcast/outcome signal
//! sets, and the configurable transition table.
//!
//! ## Key Design Principles
//!
//! 1. **Decoded values are enums, never raw integers.** A persisted word is
//!    decoded into [`LifecycleState`] / [`IdentityState`] /
//!    [`TransitionCount`] or into an explicit invalid result. The register
//!    view exposes [`DecodedState`], which has dedicated `Escalate`,
//!    `Invalid` and `Initializing` variants.
//!
//! 2. **Monotone encodings.** Persisted words use a thermometer code: a
//!    forward transition only ever sets bits, which is what a write-once
//!    store can physically do.
//!
//! 3. **Tokens are secrets.** [`Token`] zeroizes on drop and never prints
//!    its contents; [`HashedToken`] compares in constant time.
//!
//! 4. **The transition graph is configuration.** [`TransitionTable`] is
//!    loaded from YAML and validated; [`TransitionTable::standard()`] is the
//!    shipped default.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `lcc-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod encoding;
pub mod error;
pub mod signals;
pub mod state;
pub mod table;
pub mod token;

pub use encoding::{CountWord, IdentityWord, StateWord};
pub use error::{EncodingError, LccError, TableError};
pub use signals::{BroadcastEnables, MutexOwner, OutcomeFlags, Port};
pub use state::{DecodedState, IdentityState, LifecycleState, TransitionCount};
pub use table::{TransitionRule, TransitionTable};
pub use token::{HashedToken, Token, TokenKind, HASHED_TOKEN_BYTES, TOKEN_BYTES, TOKEN_WORDS};
