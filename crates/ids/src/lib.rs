//! Identifier utilities.
//!
//! HealthDesk uses two kinds of generated identifier:
//!
//! - [`ShortId`]: the short opaque token assigned to a record when the store runs under the
//!   generated-identity scheme. Canonical form is **8 characters from `0-9a-z`**, for example
//!   `k3x9q0ab`. Short enough to read out over the phone, which is how patients log back in.
//! - [`Sha256Hash`]: the content address of an uploaded file. Canonical form is 64 lowercase
//!   hex characters.
//!
//! Externally supplied identifiers (CLI arguments, API paths) must already be canonical. Use
//! the `parse` constructors to validate them; non-canonical values are rejected rather than
//! normalised.
//!
//! ## Sharded directory layout
//! For a canonical hash `h`, uploads are stored under:
//! `parent_dir/<h[0..2]>/<h[2..4]>/<h>`
//!
//! This keeps the fan-out of any one directory small.

mod service;

pub use service::{Sha256Hash, ShortId, SHORT_ID_ALPHABET, SHORT_ID_LEN};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;
