//! Patient service.
//!
//! [`PatientService`] is what the CLI and REST front-ends talk to. It validates registration
//! forms, resolves logins, assembles dashboards and routes uploads into the record store.

use crate::config::CoreConfig;
use crate::record::PatientRecord;
use crate::store::RecordStore;
use crate::validation::RegistrationForm;
use crate::{PatientError, PatientResult};
use healthdesk_files::{Attachment, FilesError, UploadService};
use healthdesk_ids::Sha256Hash;
use healthdesk_triage::Triage;
use serde::Serialize;

/// A record together with its triage, as shown after login.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub record: PatientRecord,
    /// `None` when the record has no measurements
    pub triage: Option<Triage>,
}

impl Dashboard {
    fn of(record: &PatientRecord) -> Self {
        Self {
            triage: record.triage(),
            record: record.clone(),
        }
    }
}

/// Pure patient data operations - no API concerns
#[derive(Debug)]
pub struct PatientService {
    store: RecordStore,
    uploads: UploadService,
}

impl PatientService {
    pub fn new(store: RecordStore, uploads: UploadService) -> Self {
        Self { store, uploads }
    }

    /// Opens the store and upload directory described by `cfg`.
    ///
    /// # Errors
    ///
    /// Returns a `PatientError` if the store cannot be loaded or the upload directory cannot
    /// be created.
    pub fn open(cfg: &CoreConfig) -> PatientResult<Self> {
        let store = RecordStore::from_config(cfg)?;
        let uploads = UploadService::new(&cfg.upload_dir(), cfg.upload_keywords().to_vec())?;
        Ok(Self::new(store, uploads))
    }

    /// Validates `form`, creates the record and returns it.
    ///
    /// # Errors
    ///
    /// - `PatientError::InvalidInput` for any validation failure
    /// - `PatientError::DuplicateIdentity` if the derived identity is taken
    /// - storage errors from persisting the new record
    pub fn register(&mut self, form: &RegistrationForm) -> PatientResult<PatientRecord> {
        let new = form.validate()?;
        let id = self.store.create(new)?;
        self.store
            .find_by_identity(&id)
            .cloned()
            .ok_or_else(|| PatientError::NotFound(format!("identity '{id}'")))
    }

    /// Logs in by name and phone.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::NotFound` when no record carries that exact pair.
    pub fn login(&self, name: &str, phone: &str) -> PatientResult<Dashboard> {
        match self.store.find_by_credentials(name, phone) {
            Some(record) => {
                tracing::info!(id = %record.id, "login by credentials");
                Ok(Dashboard::of(record))
            }
            None => {
                tracing::warn!("login failed: no record matches the given name and phone");
                Err(PatientError::NotFound("the given name and phone".into()))
            }
        }
    }

    /// Logs in by identity (email or generated id, depending on the scheme).
    ///
    /// # Errors
    ///
    /// `PatientError::InvalidInput` if `raw_id` cannot be an identity, `PatientError::NotFound`
    /// if no record has it.
    pub fn login_by_id(&self, raw_id: &str) -> PatientResult<Dashboard> {
        let dashboard = self.dashboard(raw_id)?;
        tracing::info!(id = %dashboard.record.id, "login by identity");
        Ok(dashboard)
    }

    /// The dashboard of the record with identity `raw_id`.
    pub fn dashboard(&self, raw_id: &str) -> PatientResult<Dashboard> {
        self.record(raw_id).map(Dashboard::of)
    }

    /// The record with identity `raw_id`.
    pub fn record(&self, raw_id: &str) -> PatientResult<&PatientRecord> {
        let id = self.store.resolve_id(raw_id)?;
        self.store
            .find_by_identity(&id)
            .ok_or_else(|| PatientError::NotFound(format!("identity '{id}'")))
    }

    /// Stores an upload and attaches it to the record with identity `raw_id`.
    ///
    /// The record is looked up before anything is written, so uploads for unknown records
    /// leave no blob behind.
    ///
    /// # Errors
    ///
    /// - `PatientError::NotFound` for an unknown record
    /// - `PatientError::InvalidInput` for an empty upload, a bad filename or an unsupported type
    /// - storage errors from writing the blob or persisting the record
    pub fn upload(
        &mut self,
        raw_id: &str,
        filename: &str,
        declared_type: Option<&str>,
        content: &[u8],
    ) -> PatientResult<Attachment> {
        let id = self.record(raw_id)?.id.clone();
        let attachment = self.uploads.store(filename, declared_type, content)?;
        self.store.append_attachment(&id, attachment.clone())?;
        Ok(attachment)
    }

    /// An attachment of the record with identity `raw_id`, together with its stored bytes.
    ///
    /// # Errors
    ///
    /// - `PatientError::InvalidInput` if `hash` is not a SHA-256 hex digest
    /// - `PatientError::NotFound` for an unknown record, an attachment the record does not
    ///   carry, or a blob missing from the upload directory
    pub fn attachment_content(
        &self,
        raw_id: &str,
        hash: &str,
    ) -> PatientResult<(Attachment, Vec<u8>)> {
        let hash = Sha256Hash::parse(hash).map_err(FilesError::from)?;
        let record = self.record(raw_id)?;
        let attachment = record
            .attachments
            .iter()
            .find(|a| a.hash == hash)
            .cloned()
            .ok_or_else(|| {
                PatientError::NotFound(format!("attachment {hash} on '{}'", record.id))
            })?;
        let content = self.uploads.read(hash.as_str())?;
        Ok((attachment, content))
    }

    /// Every record, in registration order.
    pub fn list(&self) -> &[PatientRecord] {
        self.store.all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IdentityScheme, StoreBackend};
    use healthdesk_triage::BmiStatus;
    use std::fs;
    use tempfile::TempDir;

    fn open_service(
        temp: &TempDir,
        backend: StoreBackend,
        scheme: IdentityScheme,
    ) -> PatientService {
        let cfg = CoreConfig::new(
            temp.path().to_path_buf(),
            backend,
            scheme,
            vec!["diabetes".into(), "asthma".into()],
        )
        .unwrap();
        PatientService::open(&cfg).unwrap()
    }

    fn ada() -> RegistrationForm {
        RegistrationForm {
            name: "Ada".into(),
            phone: "0123".into(),
            email: Some("a@x.com".into()),
            height_cm: Some("170".into()),
            weight_kg: Some("70".into()),
            ..Default::default()
        }
    }

    #[test]
    fn register_login_and_dashboard() {
        let temp = TempDir::new().unwrap();
        let mut service = open_service(&temp, StoreBackend::Json, IdentityScheme::Email);

        let record = service.register(&ada()).unwrap();
        assert_eq!(record.id.as_str(), "a@x.com");

        let dashboard = service.login("Ada", "0123").unwrap();
        let triage = dashboard.triage.unwrap();
        assert_eq!(triage.bmi, 24.22);
        assert_eq!(triage.status, BmiStatus::Normal);
        assert!(!triage.advice.is_empty());

        assert!(matches!(
            service.login("Ada", "9999"),
            Err(PatientError::NotFound(_))
        ));
    }

    #[test]
    fn login_by_id_is_case_insensitive_for_email() {
        let temp = TempDir::new().unwrap();
        let mut service = open_service(&temp, StoreBackend::Memory, IdentityScheme::Email);
        service.register(&ada()).unwrap();

        let dashboard = service.login_by_id("A@X.COM").unwrap();
        assert_eq!(dashboard.record.name.as_str(), "Ada");
        assert!(matches!(
            service.login_by_id("b@x.com"),
            Err(PatientError::NotFound(_))
        ));
        assert!(matches!(
            service.login_by_id("not an email"),
            Err(PatientError::InvalidInput(_))
        ));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let temp = TempDir::new().unwrap();
        let mut service = open_service(&temp, StoreBackend::Csv, IdentityScheme::Email);
        service.register(&ada()).unwrap();

        let again = RegistrationForm {
            name: "Another Ada".into(),
            ..ada()
        };
        assert!(matches!(
            service.register(&again),
            Err(PatientError::DuplicateIdentity(_))
        ));
        assert_eq!(service.list().len(), 1);
    }

    #[test]
    fn upload_text_with_keyword_is_tagged() {
        let temp = TempDir::new().unwrap();
        let mut service = open_service(&temp, StoreBackend::Json, IdentityScheme::Email);
        service.register(&ada()).unwrap();

        let attachment = service
            .upload("a@x.com", "notes.txt", None, b"History of Diabetes.")
            .unwrap();
        assert_eq!(attachment.tag.as_deref(), Some("diabetes"));

        let blob = temp.path().join("uploads").join(attachment.stored_path.as_str());
        assert_eq!(fs::read(blob).unwrap(), b"History of Diabetes.");

        let dashboard = service.dashboard("a@x.com").unwrap();
        assert_eq!(dashboard.record.attachments, vec![attachment]);
    }

    #[test]
    fn upload_rejections() {
        let temp = TempDir::new().unwrap();
        let mut service = open_service(&temp, StoreBackend::Memory, IdentityScheme::Email);
        service.register(&ada()).unwrap();

        assert!(matches!(
            service.upload("a@x.com", "virus.exe", None, b"MZ"),
            Err(PatientError::InvalidInput(_))
        ));
        assert!(matches!(
            service.upload("a@x.com", "empty.txt", None, b""),
            Err(PatientError::InvalidInput(_))
        ));
        assert!(matches!(
            service.upload("nobody@x.com", "notes.txt", None, b"hi"),
            Err(PatientError::NotFound(_))
        ));
        assert!(service.dashboard("a@x.com").unwrap().record.attachments.is_empty());
    }

    #[test]
    fn attachment_content_is_read_back_per_record() {
        let temp = TempDir::new().unwrap();
        let mut service = open_service(&temp, StoreBackend::Json, IdentityScheme::Email);
        service.register(&ada()).unwrap();
        let bob = RegistrationForm {
            name: "Bob".into(),
            email: Some("b@x.com".into()),
            ..ada()
        };
        service.register(&bob).unwrap();

        let stored = service
            .upload("a@x.com", "notes.txt", None, b"asthma since 2010")
            .unwrap();
        let hash = stored.hash.as_str();

        let (attachment, content) = service.attachment_content("A@x.com", hash).unwrap();
        assert_eq!(attachment, stored);
        assert_eq!(content, b"asthma since 2010");

        assert!(matches!(
            service.attachment_content("b@x.com", hash),
            Err(PatientError::NotFound(_))
        ));
        assert!(matches!(
            service.attachment_content("a@x.com", "not-a-hash"),
            Err(PatientError::InvalidInput(_))
        ));

        fs::remove_file(temp.path().join("uploads").join(stored.stored_path.as_str())).unwrap();
        assert!(matches!(
            service.attachment_content("a@x.com", hash),
            Err(PatientError::NotFound(_))
        ));
    }

    #[test]
    fn generated_ids_allow_shared_credentials() {
        let temp = TempDir::new().unwrap();
        let mut service = open_service(&temp, StoreBackend::Memory, IdentityScheme::Generated);
        let no_email = RegistrationForm {
            email: None,
            ..ada()
        };
        let first = service.register(&no_email).unwrap();
        let second = service.register(&no_email).unwrap();
        assert_ne!(first.id, second.id);

        assert_eq!(service.login("Ada", "0123").unwrap().record.id, first.id);
        assert_eq!(
            service.login_by_id(second.id.as_str()).unwrap().record.id,
            second.id
        );
    }

    #[test]
    fn records_without_measurements_have_no_triage() {
        let temp = TempDir::new().unwrap();
        let mut service = open_service(&temp, StoreBackend::Memory, IdentityScheme::NamePhone);
        let form = RegistrationForm {
            height_cm: None,
            weight_kg: None,
            ..ada()
        };
        service.register(&form).unwrap();
        assert!(service.login(" Ada ", "0123").unwrap().triage.is_none());
    }

    #[test]
    fn state_survives_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let mut service = open_service(&temp, StoreBackend::Csv, IdentityScheme::Email);
            service.register(&ada()).unwrap();
            service
                .upload("a@x.com", "report.pdf", Some("application/pdf"), b"%PDF-1.4")
                .unwrap();
        }
        let service = open_service(&temp, StoreBackend::Csv, IdentityScheme::Email);
        let dashboard = service.login("Ada", "0123").unwrap();
        assert_eq!(dashboard.record.attachments.len(), 1);
        assert_eq!(dashboard.triage.unwrap().bmi, 24.22);
    }
}
