//! # HealthDesk Core
//!
//! Core business logic for the HealthDesk patient record system.
//!
//! This crate contains pure data operations:
//! - Registration form validation and the patient record model
//! - The record store with its memory, JSON and CSV backends
//! - Identity resolution under the configured scheme
//! - The patient service tying the store to upload storage
//!
//! **No API concerns**: HTTP servers, command-line parsing and environment handling belong in
//! `api-rest`, `cli` and the `healthdesk-run` binary.

pub mod config;
pub mod constants;
pub mod error;
pub mod patient;
pub mod record;
pub mod store;
pub mod validation;

pub use config::{
    identity_scheme_from_env_value, store_backend_from_env_value, upload_keywords_from_env_value,
    CoreConfig, IdentityScheme, StoreBackend,
};
pub use error::{PatientError, PatientResult};
pub use patient::{Dashboard, PatientService};
pub use record::{Biometrics, Gender, NewRecord, PatientRecord, RecordId, Role};
pub use store::{CsvFileBackend, JsonFileBackend, MemoryBackend, Persistence, RecordStore};
pub use validation::RegistrationForm;

pub use healthdesk_files::{Attachment, UploadKind};
pub use healthdesk_triage::{BmiStatus, Triage};
pub use healthdesk_types::{EmailAddress, NonEmptyText};
