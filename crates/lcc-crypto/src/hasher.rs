//! # Token Hashing Service
//!
//! [`TokenHasher`] is the request/response contract of the hashing
//! collaborator: one raw [`Token`] in, one [`HashedToken`] out. The
//! simulation harness wraps an implementation in a latency model; the
//! controller core never calls it directly.

use lcc_core::{HashedToken, Token, HASHED_TOKEN_BYTES, TOKEN_BYTES};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Hashing backend for transition tokens.
///
/// Implementations must be deterministic: the same token always hashes to
/// the same value, since reference digests are provisioned ahead of time.
pub trait TokenHasher: Send + Sync {
    /// Hash a raw token.
    fn hash(&self, token: &Token) -> HashedToken;

    /// Human-readable algorithm name.
    fn algorithm(&self) -> &'static str;
}

/// Domain-separated SHA-256 over the raw token bytes.
#[derive(Debug, Clone)]
pub struct Sha256TokenHasher {
    domain: Vec<u8>,
}

impl Sha256TokenHasher {
    /// Domain tag used by [`Default`].
    pub const DEFAULT_DOMAIN: &'static [u8] = b"lcc.transition-token.v1";

    /// Hasher with a custom domain tag.
    pub fn with_domain(domain: impl Into<Vec<u8>>) -> Self {
        Self {
            domain: domain.into(),
        }
    }
}

impl Default for Sha256TokenHasher {
    fn default() -> Self {
        Self::with_domain(Self::DEFAULT_DOMAIN)
    }
}

impl TokenHasher for Sha256TokenHasher {
    fn hash(&self, token: &Token) -> HashedToken {
        let mut hasher = Sha256::new();
        hasher.update((self.domain.len() as u32).to_le_bytes());
        hasher.update(&self.domain);
        hasher.update(token.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; HASHED_TOKEN_BYTES];
        bytes.copy_from_slice(&digest);
        HashedToken::new(bytes)
    }

    fn algorithm(&self) -> &'static str {
        "sha256"
    }
}

/// Parse a raw token from 32 hex digits (an optional `0x` prefix and `_`
/// separators are accepted).
pub fn parse_token_hex(s: &str) -> Result<Token, CryptoError> {
    let mut cleaned: String = s
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| *c != '_')
        .collect();
    let decoded = hex::decode(&cleaned);
    cleaned.zeroize();
    let mut decoded = decoded?;
    if decoded.len() != TOKEN_BYTES {
        let actual = decoded.len();
        decoded.zeroize();
        return Err(CryptoError::InvalidTokenLength {
            expected: TOKEN_BYTES,
            actual,
        });
    }
    let mut bytes = [0u8; TOKEN_BYTES];
    bytes.copy_from_slice(&decoded);
    decoded.zeroize();
    let token = Token::from_bytes(bytes);
    bytes.zeroize();
    Ok(token)
}
