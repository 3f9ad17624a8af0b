use super::{ensure_parent_dir, Persistence};
use crate::record::PatientRecord;
use crate::{PatientError, PatientResult};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Stores all records as one pretty-printed JSON object keyed by identity.
///
/// ```json
/// {
///   "ada@example.com": { "id": "ada@example.com", "name": "Ada", ... }
/// }
/// ```
///
/// Keys keep insertion order, so a reload yields records in registration order.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Persistence for JsonFileBackend {
    fn load(&self) -> PatientResult<Vec<PatientRecord>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no JSON store yet, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(PatientError::FileRead(e)),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        let object: Map<String, Value> =
            serde_json::from_str(&contents).map_err(PatientError::Deserialization)?;

        object
            .into_iter()
            .map(|(key, value)| {
                let record: PatientRecord =
                    serde_json::from_value(value).map_err(PatientError::Deserialization)?;
                if record.id.as_str() != key {
                    return Err(PatientError::CorruptStore(format!(
                        "entry '{key}' holds a record with identity '{}'",
                        record.id
                    )));
                }
                Ok(record)
            })
            .collect()
    }

    fn save(&self, records: &[PatientRecord]) -> PatientResult<()> {
        ensure_parent_dir(&self.path)?;

        let mut object = Map::with_capacity(records.len());
        for record in records {
            let value = serde_json::to_value(record).map_err(PatientError::Serialization)?;
            object.insert(record.id.as_str().to_owned(), value);
        }

        let mut contents =
            serde_json::to_string_pretty(&object).map_err(PatientError::Serialization)?;
        contents.push('\n');

        // Write beside the target and rename so a crash never leaves a half-written store.
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, contents).map_err(PatientError::FileWrite)?;
        fs::rename(&staging, &self.path).map_err(PatientError::FileWrite)?;

        tracing::debug!(path = %self.path.display(), records = records.len(), "saved JSON store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdentityScheme;
    use crate::record::RecordId;
    use crate::store::RecordStore;
    use crate::validation::RegistrationForm;
    use healthdesk_files::UploadService;
    use tempfile::TempDir;

    fn form(name: &str, phone: &str, email: &str) -> RegistrationForm {
        RegistrationForm {
            name: name.into(),
            phone: phone.into(),
            email: Some(email.into()),
            height_cm: Some("170".into()),
            weight_kg: Some("70".into()),
            ..Default::default()
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let temp = TempDir::new().unwrap();
        let backend = JsonFileBackend::new(temp.path().join("absent.json"));
        assert!(backend.load().unwrap().is_empty());
    }

    #[test]
    fn records_survive_reopen_in_order() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("records.json");
        let uploads = UploadService::new(&temp.path().join("uploads"), vec!["asthma".into()])
            .unwrap();

        let ada_id;
        {
            let mut store = RecordStore::open(
                IdentityScheme::Email,
                Box::new(JsonFileBackend::new(&path)),
            )
            .unwrap();
            store
                .create(form("Zed", "0999", "z@x.com").validate().unwrap())
                .unwrap();
            ada_id = store
                .create(form("Ada", "0123", "a@x.com").validate().unwrap())
                .unwrap();
            let attachment = uploads.store("notes.txt", None, b"Has ASTHMA").unwrap();
            store.append_attachment(&ada_id, attachment).unwrap();
        }

        let reopened =
            RecordStore::open(IdentityScheme::Email, Box::new(JsonFileBackend::new(&path)))
                .unwrap();
        let ids: Vec<_> = reopened.all().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["z@x.com", "a@x.com"]);

        let ada = reopened.find_by_identity(&ada_id).unwrap();
        assert_eq!(ada.bmi(), Some(24.22));
        assert_eq!(ada.attachments.len(), 1);
        assert_eq!(ada.attachments[0].tag.as_deref(), Some("asthma"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn whole_store_survives_reopen_unchanged() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("records.json");
        let uploads = UploadService::new(&temp.path().join("uploads"), vec!["asthma".into()])
            .unwrap();

        let mut store =
            RecordStore::open(IdentityScheme::Email, Box::new(JsonFileBackend::new(&path)))
                .unwrap();
        let quoted = RegistrationForm {
            gender: Some("other".into()),
            age: Some("41".into()),
            date_of_birth: Some("1983-02-01".into()),
            ..form("Zed \"Z\", the\nSecond", "0999", "z@x.com")
        };
        let doctor = RegistrationForm {
            role: Some("doctor".into()),
            height_cm: None,
            weight_kg: None,
            ..form("Dr Who", "0111", "who@x.com")
        };
        let zed = store.create(quoted.validate().unwrap()).unwrap();
        store.create(doctor.validate().unwrap()).unwrap();
        let ada = store
            .create(form("Ada", "0123", "a@x.com").validate().unwrap())
            .unwrap();
        let attachments: [(&RecordId, &str, &[u8]); 3] = [
            (&zed, "notes.txt", b"asthma \"reported\""),
            (&zed, "report.pdf", b"%PDF-1.4"),
            (&ada, "notes.txt", b"no findings"),
        ];
        for (id, filename, content) in attachments {
            let attachment = uploads.store(filename, None, content).unwrap();
            store.append_attachment(id, attachment).unwrap();
        }

        let reopened =
            RecordStore::open(IdentityScheme::Email, Box::new(JsonFileBackend::new(&path)))
                .unwrap();
        assert_eq!(store.all(), reopened.all());
        assert_eq!(reopened.all()[0].name.as_str(), "Zed \"Z\", the\nSecond");
    }

    #[test]
    fn file_is_an_object_keyed_by_identity() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("records.json");
        let mut store =
            RecordStore::open(IdentityScheme::Email, Box::new(JsonFileBackend::new(&path)))
                .unwrap();
        store
            .create(form("Ada", "0123", "a@x.com").validate().unwrap())
            .unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let entry = &value["a@x.com"];
        assert_eq!(entry["name"], "Ada");
        assert_eq!(entry["biometrics"]["height_cm"], 170.0);
        assert!(entry.get("bmi").is_none());
    }

    #[test]
    fn mismatched_key_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("records.json");
        let mut store =
            RecordStore::open(IdentityScheme::Email, Box::new(JsonFileBackend::new(&path)))
                .unwrap();
        store
            .create(form("Ada", "0123", "a@x.com").validate().unwrap())
            .unwrap();

        let tampered = fs::read_to_string(&path)
            .unwrap()
            .replacen("\"a@x.com\":", "\"b@x.com\":", 1);
        fs::write(&path, tampered).unwrap();

        let err = JsonFileBackend::new(&path).load().unwrap_err();
        assert!(matches!(err, PatientError::CorruptStore(_)));
    }

    #[test]
    fn malformed_file_is_a_deserialization_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("records.json");
        fs::write(&path, "[not json").unwrap();

        let err = JsonFileBackend::new(&path).load().unwrap_err();
        assert!(matches!(err, PatientError::Deserialization(_)));
    }
}
