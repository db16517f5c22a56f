//! Document hash implementation
//!
//! A [`DocumentHash`] is the 32-byte content address under which a document
//! is recorded by the contract. It renders as 64 lowercase hex characters,
//! and as a `0x`-prefixed `bytes32` when handed to the contract.
//!
//! ## Example Usage
//!
//! ```
//! use verichain_primitives::DocumentHash;
//!
//! let hash: DocumentHash = "AA".repeat(32).parse().unwrap();
//! assert_eq!(hash.to_hex(), "aa".repeat(32));
//! assert_eq!(hash.to_prefixed_hex(), format!("0x{}", "aa".repeat(32)));
//!
//! // Length is checked before anything else, so a prefixed hash is rejected
//! assert!("a".repeat(63).parse::<DocumentHash>().is_err());
//! assert!(hash.to_prefixed_hex().parse::<DocumentHash>().is_err());
//! ```

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use alloy_primitives::{B256, hex};

use crate::error::{PrimitivesError, Result};

/// Number of hex characters in a rendered document hash.
pub const HASH_HEX_LENGTH: usize = 64;

/// A 256-bit content address for a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DocumentHash(pub B256);

impl DocumentHash {
    /// Creates a new hash from raw digest bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(B256::new(bytes))
    }

    /// Returns the underlying bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Parses a hand-entered hash.
    ///
    /// Surrounding whitespace is ignored. What remains must be exactly
    /// [`HASH_HEX_LENGTH`] hex characters, so a `0x` prefix is rejected;
    /// case is not significant.
    pub fn from_hex(input: &str) -> Result<Self> {
        let digits = input.trim();

        if digits.len() != HASH_HEX_LENGTH {
            return Err(PrimitivesError::InvalidHashFormat(format!(
                "hash must be exactly {HASH_HEX_LENGTH} characters long, got {}",
                digits.len()
            )));
        }
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(PrimitivesError::InvalidHashFormat(
                "hash must contain only hexadecimal characters".to_owned(),
            ));
        }

        let bytes: [u8; 32] = hex::decode_to_array(digits).map_err(|e| {
            PrimitivesError::InvalidHashFormat(format!("hash is not valid hexadecimal: {e}"))
        })?;

        Ok(Self::new(bytes))
    }

    /// Returns the bare lowercase hex rendering (64 characters, no prefix)
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_slice())
    }

    /// Returns the `0x`-prefixed rendering used for `bytes32` arguments
    pub fn to_prefixed_hex(&self) -> String {
        hex::encode_prefixed(self.0.as_slice())
    }

    /// Returns the first `len` hex characters, for log lines
    pub fn short(&self, len: usize) -> String {
        let mut rendered = self.to_hex();
        rendered.truncate(len.min(HASH_HEX_LENGTH));
        rendered
    }
}

impl fmt::Display for DocumentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for DocumentHash {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Deref for DocumentHash {
    type Target = B256;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<B256> for DocumentHash {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl From<[u8; 32]> for DocumentHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self::new(bytes)
    }
}

impl From<DocumentHash> for B256 {
    fn from(hash: DocumentHash) -> Self {
        hash.0
    }
}

impl AsRef<[u8]> for DocumentHash {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}
