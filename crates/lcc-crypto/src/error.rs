//! # Cryptographic Error Types

use thiserror::Error;

/// Errors from token parsing and hashing.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Token has the wrong length.
    #[error("invalid token length: expected {expected} bytes, got {actual}")]
    InvalidTokenLength {
        /// Required length in bytes.
        expected: usize,
        /// Supplied length in bytes.
        actual: usize,
    },
}
