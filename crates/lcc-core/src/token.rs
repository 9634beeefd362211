//! # Transition Tokens
//!
//! A [`Token`] is the 128-bit secret a command port writes (as four 32-bit
//! words) to authenticate a privileged transition. The controller never
//! compares raw tokens: it sends the token to the hashing service and
//! compares the returned [`HashedToken`] against the reference value the
//! state store broadcasts for the rule's [`TokenKind`].
//!
//! ## Security Invariant
//!
//! - `Token` zeroizes on drop and its `Debug` output is redacted.
//! - `HashedToken` equality is constant time (`subtle`).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of 32-bit register words in a token.
pub const TOKEN_WORDS: usize = 4;

/// Size of a raw token in bytes.
pub const TOKEN_BYTES: usize = TOKEN_WORDS * 4;

/// Size of a hashed token in bytes.
pub const HASHED_TOKEN_BYTES: usize = 32;

/// Raw 128-bit transition token.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct Token([u8; TOKEN_BYTES]);

impl Token {
    /// Token from raw bytes.
    pub fn from_bytes(bytes: [u8; TOKEN_BYTES]) -> Self {
        Self(bytes)
    }

    /// Token from register words, word 0 holding the least significant
    /// bytes.
    pub fn from_words(words: [u32; TOKEN_WORDS]) -> Self {
        let mut token = Self::default();
        for (index, word) in words.into_iter().enumerate() {
            token.set_word(index, word);
        }
        token
    }

    /// Overwrite one register word. Out-of-range indices are ignored and
    /// reported as `false`.
    pub fn set_word(&mut self, index: usize, value: u32) -> bool {
        if index >= TOKEN_WORDS {
            return false;
        }
        self.0[index * 4..index * 4 + 4].copy_from_slice(&value.to_le_bytes());
        true
    }

    /// Read one register word (zero for out-of-range indices).
    pub fn word(&self, index: usize) -> u32 {
        if index >= TOKEN_WORDS {
            return 0;
        }
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.0[index * 4..index * 4 + 4]);
        u32::from_le_bytes(bytes)
    }

    /// All four register words.
    pub fn words(&self) -> [u32; TOKEN_WORDS] {
        [self.word(0), self.word(1), self.word(2), self.word(3)]
    }

    /// Raw token bytes.
    pub fn as_bytes(&self) -> &[u8; TOKEN_BYTES] {
        &self.0
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        bool::from(self.0.ct_eq(&other.0))
    }
}

impl Eq for Token {}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// Output of the token-hashing service, compared against the reference
/// values held in the state store.
#[derive(Clone, Copy, Default)]
pub struct HashedToken([u8; HASHED_TOKEN_BYTES]);

impl HashedToken {
    /// Wrap a digest.
    pub fn new(bytes: [u8; HASHED_TOKEN_BYTES]) -> Self {
        Self(bytes)
    }

    /// Digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASHED_TOKEN_BYTES] {
        &self.0
    }

    /// Lowercase hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the lowercase or uppercase hex form.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; HASHED_TOKEN_BYTES];
        hex::decode_to_slice(s.trim(), &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl PartialEq for HashedToken {
    fn eq(&self, other: &Self) -> bool {
        bool::from(self.0.ct_eq(&other.0))
    }
}

impl Eq for HashedToken {}

impl fmt::Debug for HashedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashedToken({})", self.to_hex())
    }
}

impl Serialize for HashedToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for HashedToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Which reference token authenticates a transition rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    /// Leaves RAW into a test state.
    RawUnlock,
    /// Re-opens a locked test state.
    TestUnlock,
    /// Leaves the test states for a mission state.
    TestExit,
    /// Enters RMA from a mission state.
    Rma,
}

impl TokenKind {
    /// Every token kind.
    pub const ALL: [TokenKind; 4] = [Self::RawUnlock, Self::TestUnlock, Self::TestExit, Self::Rma];

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Self::RawUnlock => "RAW_UNLOCK",
            Self::TestUnlock => "TEST_UNLOCK",
            Self::TestExit => "TEST_EXIT",
            Self::Rma => "RMA",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
