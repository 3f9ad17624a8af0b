//! Internal implementation of the identifier types.

use crate::{IdError, IdResult};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

/// Number of characters in a canonical [`ShortId`].
pub const SHORT_ID_LEN: usize = 8;

/// Characters a [`ShortId`] is drawn from.
pub const SHORT_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A short opaque record identifier (8 characters from `0-9a-z`).
///
/// Once constructed the contained token is guaranteed canonical.
///
/// # Construction
/// - [`ShortId::generate`] draws a fresh random token.
/// - [`ShortId::parse`] validates an externally supplied token.
///
/// Uniqueness is not guaranteed by this type: 36^8 tokens makes collisions rare, and the
/// record store retries generation when a token is already taken.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShortId(String);

impl ShortId {
    /// Generates a new random token from the thread-local RNG.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    /// Generates a new token from the supplied RNG.
    ///
    /// Useful in tests that need a deterministic sequence of identifiers.
    pub fn generate_with<R: Rng>(rng: &mut R) -> Self {
        let token = (0..SHORT_ID_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..SHORT_ID_ALPHABET.len());
                SHORT_ID_ALPHABET[idx] as char
            })
            .collect();
        Self(token)
    }

    /// Validates and wraps a token that must already be canonical.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidInput`] if `input` is not exactly 8 characters from `0-9a-z`.
    pub fn parse(input: &str) -> IdResult<Self> {
        if Self::is_canonical(input) {
            return Ok(Self(input.to_owned()));
        }
        Err(IdError::InvalidInput(format!(
            "short id must be {} characters from 0-9a-z, got: '{}'",
            SHORT_ID_LEN, input
        )))
    }

    /// Returns true if `input` is in canonical short-id form.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == SHORT_ID_LEN
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ShortId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShortId::parse(s)
    }
}

/// SHA-256 digest in canonical form (64 lowercase hex characters).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Sha256Hash(String);

impl Sha256Hash {
    /// Builds the canonical hex form from raw digest bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Validates a hex digest string.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidInput`] if `input` is not 64 lowercase hex characters.
    pub fn parse(input: &str) -> IdResult<Self> {
        let ok = input.len() == 64
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if ok {
            return Ok(Self(input.to_owned()));
        }
        Err(IdError::InvalidInput(format!(
            "sha256 hash must be 64 lowercase hex characters, got: '{}'",
            input
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `parent_dir/<s1>/<s2>/<hash>` where `s1`/`s2` are the first two pairs of
    /// hex characters.
    pub fn sharded_path(&self, parent_dir: &Path) -> PathBuf {
        parent_dir.join(&self.0[0..2]).join(&self.0[2..4]).join(&self.0)
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Sha256Hash {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sha256Hash::parse(s)
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::{Sha256Hash, ShortId};

    impl serde::Serialize for ShortId {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&self.0)
        }
    }

    impl<'de> serde::Deserialize<'de> for ShortId {
        fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let s = String::deserialize(deserializer)?;
            ShortId::parse(&s).map_err(serde::de::Error::custom)
        }
    }

    impl serde::Serialize for Sha256Hash {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&self.0)
        }
    }

    impl<'de> serde::Deserialize<'de> for Sha256Hash {
        fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let s = String::deserialize(deserializer)?;
            Sha256Hash::parse(&s).map_err(serde::de::Error::custom)
        }
    }
}
