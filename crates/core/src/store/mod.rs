//! Patient record store.
//!
//! [`RecordStore`] owns every record in insertion order plus an identity index, and writes the
//! full snapshot through a [`Persistence`] backend after each mutation. The backend is chosen
//! by configuration:
//!
//! | Backend            | Snapshot                                           |
//! |--------------------|----------------------------------------------------|
//! | [`MemoryBackend`]  | none; records are lost when the process exits      |
//! | [`JsonFileBackend`]| one JSON object keyed by identity                  |
//! | [`CsvFileBackend`] | a header row plus one row per record               |
//!
//! ## Consistency
//!
//! A save overwrites the whole file. There is no locking between processes: two processes
//! sharing a file race and the last write wins. Within a process, if a save fails the
//! in-memory change is undone so memory and disk stay in step.

mod csv;
mod json;
mod memory;

pub use self::csv::CsvFileBackend;
pub use self::json::JsonFileBackend;
pub use self::memory::MemoryBackend;

use crate::config::{CoreConfig, IdentityScheme, StoreBackend};
use crate::constants::MAX_ID_GENERATION_ATTEMPTS;
use crate::record::{NewRecord, PatientRecord, RecordId};
use crate::{PatientError, PatientResult};
use chrono::Utc;
use healthdesk_files::Attachment;
use healthdesk_ids::ShortId;
use healthdesk_types::EmailAddress;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Loads and saves full store snapshots.
pub trait Persistence: fmt::Debug + Send {
    /// Reads every record in stored order. A store that does not exist yet is empty.
    fn load(&self) -> PatientResult<Vec<PatientRecord>>;

    /// Overwrites the stored snapshot with `records`.
    fn save(&self, records: &[PatientRecord]) -> PatientResult<()>;
}

/// Creates the parent directory of a store file if it is missing.
pub(crate) fn ensure_parent_dir(path: &Path) -> PatientResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(PatientError::StorageDirCreation)?;
    }
    Ok(())
}

#[derive(Debug)]
pub struct RecordStore {
    scheme: IdentityScheme,
    records: Vec<PatientRecord>,
    index: HashMap<RecordId, usize>,
    backend: Box<dyn Persistence>,
}

impl RecordStore {
    /// Opens a store over `backend`, loading its current snapshot.
    ///
    /// # Errors
    ///
    /// Returns the backend's load error, or `PatientError::CorruptStore` if the snapshot holds
    /// the same identity twice or an identity that the scheme could not have assigned.
    pub fn open(scheme: IdentityScheme, backend: Box<dyn Persistence>) -> PatientResult<Self> {
        let records = backend.load()?;

        let mut index = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            if !fits_scheme(scheme, &record.id) {
                tracing::warn!(
                    id = %record.id,
                    scheme = %scheme,
                    "stored identity does not fit the configured scheme"
                );
                return Err(PatientError::CorruptStore(format!(
                    "identity '{}' was not assigned under the {scheme} scheme",
                    record.id
                )));
            }
            if index.insert(record.id.clone(), position).is_some() {
                return Err(PatientError::CorruptStore(format!(
                    "identity '{}' appears more than once",
                    record.id
                )));
            }
        }

        tracing::info!(
            scheme = %scheme,
            records = records.len(),
            backend = ?backend,
            "opened record store"
        );

        Ok(Self {
            scheme,
            records,
            index,
            backend,
        })
    }

    /// Opens the store described by `cfg`.
    pub fn from_config(cfg: &CoreConfig) -> PatientResult<Self> {
        let backend: Box<dyn Persistence> = match (cfg.store_backend(), cfg.records_path()) {
            (StoreBackend::Json, Some(path)) => Box::new(JsonFileBackend::new(path)),
            (StoreBackend::Csv, Some(path)) => Box::new(CsvFileBackend::new(path)),
            _ => Box::new(MemoryBackend),
        };
        Self::open(cfg.identity_scheme(), backend)
    }

    /// Assigns an identity to `new` and persists the resulting record.
    ///
    /// # Errors
    ///
    /// - `PatientError::InvalidInput` if the scheme is email and `new` has no email
    /// - `PatientError::DuplicateIdentity` if the identity is already taken
    /// - `PatientError::IdGenerationExhausted` if no free short id could be drawn
    /// - any error from saving the snapshot (the record is not kept in that case)
    pub fn create(&mut self, new: NewRecord) -> PatientResult<RecordId> {
        let id = self.assign_identity(&new)?;

        if self.index.contains_key(&id) {
            tracing::warn!(id = %id, "rejected registration with duplicate identity");
            return Err(PatientError::DuplicateIdentity(id.to_string()));
        }

        let record = PatientRecord::from_new(id.clone(), new, Utc::now());
        self.records.push(record);
        self.index.insert(id.clone(), self.records.len() - 1);

        if let Err(e) = self.backend.save(&self.records) {
            self.records.pop();
            self.index.remove(&id);
            return Err(e);
        }

        tracing::info!(id = %id, total = self.records.len(), "created record");
        Ok(id)
    }

    /// Exact-match lookup by identity.
    pub fn find_by_identity(&self, id: &RecordId) -> Option<&PatientRecord> {
        let found = self.index.get(id).map(|&i| &self.records[i]);
        tracing::debug!(id = %id, found = found.is_some(), "lookup by identity");
        found
    }

    /// First record, in insertion order, whose name and phone both equal the given values
    /// after trimming surrounding whitespace.
    ///
    /// Several records can share a name and phone under the generated-id scheme; which one is
    /// returned then is only "the earliest registered".
    pub fn find_by_credentials(&self, name: &str, phone: &str) -> Option<&PatientRecord> {
        let found = self
            .records
            .iter()
            .find(|r| r.matches_credentials(name.trim(), phone.trim()));
        tracing::debug!(found = found.is_some(), "lookup by credentials");
        found
    }

    /// Appends `attachment` to the record with identity `id` and persists.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::NotFound` for an unknown identity, or the save error (the
    /// attachment is not kept in that case).
    pub fn append_attachment(&mut self, id: &RecordId, attachment: Attachment) -> PatientResult<()> {
        let position = *self
            .index
            .get(id)
            .ok_or_else(|| PatientError::NotFound(format!("identity '{id}'")))?;

        self.records[position].attachments.push(attachment);

        if let Err(e) = self.backend.save(&self.records) {
            self.records[position].attachments.pop();
            return Err(e);
        }

        tracing::info!(
            id = %id,
            attachments = self.records[position].attachments.len(),
            "appended attachment"
        );
        Ok(())
    }

    /// Every record, in insertion order.
    pub fn all(&self) -> &[PatientRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Turns user-supplied identity text into a [`RecordId`] under this store's scheme.
    ///
    /// Emails are normalised the same way as at registration, so lookups are
    /// case-insensitive. Generated ids must be canonical.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::InvalidInput` if the text cannot be an identity under the scheme.
    pub fn resolve_id(&self, raw: &str) -> PatientResult<RecordId> {
        let raw = raw.trim();
        match self.scheme {
            IdentityScheme::Email => EmailAddress::parse(raw)
                .map(|e| RecordId::from_email(&e))
                .map_err(|e| PatientError::InvalidInput(format!("identity: {e}"))),
            IdentityScheme::NamePhone if raw.is_empty() => {
                Err(PatientError::InvalidInput("identity cannot be empty".into()))
            }
            IdentityScheme::NamePhone => Ok(RecordId::from_persisted(raw.to_owned())),
            IdentityScheme::Generated => ShortId::parse(raw)
                .map(|id| RecordId::from_short_id(&id))
                .map_err(|e| PatientError::InvalidInput(format!("identity: {e}"))),
        }
    }

    fn assign_identity(&self, new: &NewRecord) -> PatientResult<RecordId> {
        match self.scheme {
            IdentityScheme::Email => new.email.as_ref().map(RecordId::from_email).ok_or_else(|| {
                PatientError::InvalidInput("email is required to register".into())
            }),
            IdentityScheme::NamePhone => Ok(RecordId::from_name_phone(&new.name, &new.phone)),
            IdentityScheme::Generated => (0..MAX_ID_GENERATION_ATTEMPTS)
                .map(|_| RecordId::from_short_id(&ShortId::generate()))
                .find(|id| !self.index.contains_key(id))
                .ok_or(PatientError::IdGenerationExhausted(MAX_ID_GENERATION_ATTEMPTS)),
        }
    }
}

/// Whether `id` has the shape `scheme` assigns, so stored records stay reachable by lookup.
fn fits_scheme(scheme: IdentityScheme, id: &RecordId) -> bool {
    let id = id.as_str();
    match scheme {
        IdentityScheme::Email => EmailAddress::parse(id).is_ok_and(|e| e.as_str() == id),
        IdentityScheme::NamePhone => id.contains('|'),
        IdentityScheme::Generated => ShortId::is_canonical(id),
    }
}
