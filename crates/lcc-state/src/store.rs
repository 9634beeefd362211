//! # State Store Interface
//!
//! The controller never owns the persisted lifecycle words. It observes a
//! readout of the write-once store every step and, when committing a
//! transition, raises a program request and waits for the store's
//! acknowledge.

use std::collections::BTreeMap;

use lcc_core::{
    CountWord, EncodingError, HashedToken, IdentityState, IdentityWord, LifecycleState, StateWord,
    TokenKind, TransitionCount,
};
use serde::{Deserialize, Serialize};

/// Reference digests provisioned in the store, one per token kind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceTokens(BTreeMap<TokenKind, HashedToken>);

impl ReferenceTokens {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a digest, replacing any existing one.
    pub fn insert(&mut self, kind: TokenKind, digest: HashedToken) {
        self.0.insert(kind, digest);
    }

    /// The digest for `kind`.
    pub fn get(&self, kind: TokenKind) -> Option<&HashedToken> {
        self.0.get(&kind)
    }

    /// Provisioned kinds.
    pub fn kinds(&self) -> impl Iterator<Item = TokenKind> + '_ {
        self.0.keys().copied()
    }
}

impl FromIterator<(TokenKind, HashedToken)> for ReferenceTokens {
    fn from_iter<I: IntoIterator<Item = (TokenKind, HashedToken)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// What the store presents to the controller on one step.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreReadout {
    /// Readout is populated. Low until the store has finished its own
    /// power-up read.
    pub valid: bool,
    /// The store detected an internal error (ECC, integrity) on read.
    pub error: bool,
    /// Persisted lifecycle state word.
    pub state: StateWord,
    /// Persisted transition-count word.
    pub count: CountWord,
    /// Persisted identity word.
    pub identity: IdentityWord,
    /// Reference digests.
    pub tokens: ReferenceTokens,
}

/// Fully decoded store contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreContents {
    /// Lifecycle state.
    pub state: LifecycleState,
    /// Transitions already consumed.
    pub count: TransitionCount,
    /// Identity provisioning state.
    pub identity: IdentityState,
}

impl StoreReadout {
    /// Decode all three words. The first word that fails decides the error.
    pub fn decode(&self) -> Result<StoreContents, EncodingError> {
        Ok(StoreContents {
            state: self.state.decode()?,
            count: self.count.decode()?,
            identity: self.identity.decode()?,
        })
    }
}

/// Request to persist a new state and count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramRequest {
    /// State to persist.
    pub state: LifecycleState,
    /// Count to persist.
    pub count: TransitionCount,
}

impl ProgramRequest {
    /// Store words carrying this request.
    pub fn words(&self) -> (StateWord, CountWord) {
        (StateWord::encode(self.state), CountWord::encode(self.count))
    }
}

/// Store acknowledge for a [`ProgramRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgramAck {
    /// The new words are persisted.
    Ok,
    /// Programming failed; the store contents are unchanged.
    Error,
}
