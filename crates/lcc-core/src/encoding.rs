//! # Persisted Word Encodings
//!
//! The state store is write-once: programming can set bits but never clear
//! them. Lifecycle state and transition count are therefore stored as
//! thermometer codes, where the n-th value has its low n bits set. Moving
//! forward only ever sets bits, and any word that is not of the form
//! `2^n - 1` (or whose n is out of range) decodes as invalid.
//!
//! The identity word is two-valued: all zeros (blank) or all ones
//! (personalized).

use serde::{Deserialize, Serialize};

use crate::error::EncodingError;
use crate::state::{IdentityState, LifecycleState, TransitionCount};

/// Number of set bits in `word` if it is a thermometer code, else `None`.
fn thermometer_level(word: u32) -> Option<u32> {
    if word & word.wrapping_add(1) == 0 {
        Some(word.count_ones())
    } else {
        None
    }
}

fn thermometer(level: u32) -> u32 {
    if level >= 32 {
        u32::MAX
    } else {
        (1u32 << level) - 1
    }
}

/// Whether `new` can be programmed over `old` in a write-once store.
pub fn is_bitwise_superset(new: u32, old: u32) -> bool {
    new & old == old
}

/// Raw persisted lifecycle state word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StateWord(pub u32);

impl StateWord {
    /// Encode a lifecycle state.
    pub fn encode(state: LifecycleState) -> Self {
        Self(thermometer(state.index()))
    }

    /// Decode into a lifecycle state.
    pub fn decode(self) -> Result<LifecycleState, EncodingError> {
        thermometer_level(self.0)
            .and_then(|level| LifecycleState::from_index(level).ok())
            .ok_or(EncodingError::StateWord(self.0))
    }
}

/// Raw persisted transition count word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CountWord(pub u32);

impl CountWord {
    /// Encode a transition count.
    pub fn encode(count: TransitionCount) -> Self {
        Self(thermometer(count.value()))
    }

    /// Decode into a transition count.
    pub fn decode(self) -> Result<TransitionCount, EncodingError> {
        thermometer_level(self.0)
            .and_then(|level| TransitionCount::new(level).ok())
            .ok_or(EncodingError::CountWord(self.0))
    }
}

/// Raw persisted identity state word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IdentityWord(pub u32);

impl IdentityWord {
    const BLANK: u32 = 0;
    const PERSONALIZED: u32 = u32::MAX;

    /// Encode an identity state. `Invalid` has no persisted form and
    /// encodes as a word that fails to decode.
    pub fn encode(state: IdentityState) -> Self {
        match state {
            IdentityState::Blank => Self(Self::BLANK),
            IdentityState::Personalized => Self(Self::PERSONALIZED),
            IdentityState::Invalid => Self(0x5A5A_5A5A),
        }
    }

    /// Decode into a (valid) identity state.
    pub fn decode(self) -> Result<IdentityState, EncodingError> {
        match self.0 {
            Self::BLANK => Ok(IdentityState::Blank),
            Self::PERSONALIZED => Ok(IdentityState::Personalized),
            other => Err(EncodingError::IdentityWord(other)),
        }
    }
}
