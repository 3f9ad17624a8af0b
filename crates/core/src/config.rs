//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. The
//! binaries read environment variables and hand the raw values to the `*_from_env_value`
//! helpers here; nothing in the core reads the environment while handling a request.

use crate::constants::{
    DEFAULT_UPLOAD_KEYWORDS, RECORDS_CSV_FILENAME, RECORDS_JSON_FILENAME, UPLOADS_DIR_NAME,
};
use crate::{PatientError, PatientResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Where the record store keeps its snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// Process memory only; lost on restart
    Memory,
    /// One JSON object keyed by identity
    #[default]
    Json,
    /// One CSV row per record
    Csv,
}

impl FromStr for StoreBackend {
    type Err = PatientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StoreBackend::Memory),
            "json" => Ok(StoreBackend::Json),
            "csv" => Ok(StoreBackend::Csv),
            other => Err(PatientError::InvalidInput(format!(
                "unknown store backend '{other}' (expected memory, json or csv)"
            ))),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreBackend::Memory => "memory",
            StoreBackend::Json => "json",
            StoreBackend::Csv => "csv",
        })
    }
}

/// How a record's unique identity is derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum IdentityScheme {
    /// The normalised email address
    #[default]
    Email,
    /// The (name, phone) pair
    NamePhone,
    /// A generated 8-character token
    Generated,
}

impl FromStr for IdentityScheme {
    type Err = PatientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(IdentityScheme::Email),
            "name-phone" | "name_phone" | "namephone" => Ok(IdentityScheme::NamePhone),
            "generated" | "id" => Ok(IdentityScheme::Generated),
            other => Err(PatientError::InvalidInput(format!(
                "unknown identity scheme '{other}' (expected email, name-phone or generated)"
            ))),
        }
    }
}

impl fmt::Display for IdentityScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IdentityScheme::Email => "email",
            IdentityScheme::NamePhone => "name-phone",
            IdentityScheme::Generated => "generated",
        })
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    store_backend: StoreBackend,
    identity_scheme: IdentityScheme,
    upload_keywords: Vec<String>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::InvalidInput` if `data_dir` is empty.
    pub fn new(
        data_dir: PathBuf,
        store_backend: StoreBackend,
        identity_scheme: IdentityScheme,
        upload_keywords: Vec<String>,
    ) -> PatientResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(PatientError::InvalidInput(
                "data directory cannot be empty".into(),
            ));
        }

        Ok(Self {
            data_dir,
            store_backend,
            identity_scheme,
            upload_keywords,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn store_backend(&self) -> StoreBackend {
        self.store_backend
    }

    pub fn identity_scheme(&self) -> IdentityScheme {
        self.identity_scheme
    }

    pub fn upload_keywords(&self) -> &[String] {
        &self.upload_keywords
    }

    /// Path of the store file, or `None` for the in-memory backend.
    pub fn records_path(&self) -> Option<PathBuf> {
        match self.store_backend {
            StoreBackend::Memory => None,
            StoreBackend::Json => Some(self.data_dir.join(RECORDS_JSON_FILENAME)),
            StoreBackend::Csv => Some(self.data_dir.join(RECORDS_CSV_FILENAME)),
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.data_dir.join(UPLOADS_DIR_NAME)
    }
}

/// Parse the store backend from an optional string value. Unset or blank means JSON.
pub fn store_backend_from_env_value(value: Option<String>) -> PatientResult<StoreBackend> {
    non_blank(value)
        .map(|v| v.parse())
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Parse the identity scheme from an optional string value. Unset or blank means email.
pub fn identity_scheme_from_env_value(value: Option<String>) -> PatientResult<IdentityScheme> {
    non_blank(value)
        .map(|v| v.parse())
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Parse a comma-separated keyword list. Unset or blank means [`DEFAULT_UPLOAD_KEYWORDS`].
pub fn upload_keywords_from_env_value(value: Option<String>) -> Vec<String> {
    match non_blank(value) {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_owned)
            .collect(),
        None => DEFAULT_UPLOAD_KEYWORDS
            .iter()
            .map(|k| (*k).to_owned())
            .collect(),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
