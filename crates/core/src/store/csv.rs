use super::{ensure_parent_dir, Persistence};
use crate::record::{Biometrics, Gender, PatientRecord, RecordId, Role};
use crate::{PatientError, PatientResult};
use chrono::{DateTime, NaiveDate, Utc};
use healthdesk_files::Attachment;
use healthdesk_types::{EmailAddress, NonEmptyText};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::PathBuf;

/// Column order of the CSV store.
pub const CSV_HEADERS: [&str; 12] = [
    "id",
    "role",
    "name",
    "gender",
    "age",
    "phone",
    "email",
    "date_of_birth",
    "height_cm",
    "weight_kg",
    "registered_at",
    "attachments",
];

/// Stores records as a CSV table, one row per record in insertion order.
///
/// Attachments have no natural flat form, so each row carries them as a JSON array in the
/// `attachments` column. Empty optional fields are empty cells.
#[derive(Debug, Clone)]
pub struct CsvFileBackend {
    path: PathBuf,
}

impl CsvFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    id: String,
    role: Role,
    name: String,
    gender: Gender,
    age: Option<u32>,
    phone: String,
    email: Option<String>,
    date_of_birth: Option<NaiveDate>,
    height_cm: Option<f64>,
    weight_kg: Option<f64>,
    registered_at: DateTime<Utc>,
    attachments: String,
}

impl CsvRow {
    fn from_record(record: &PatientRecord) -> PatientResult<Self> {
        let attachments = if record.attachments.is_empty() {
            String::new()
        } else {
            serde_json::to_string(&record.attachments).map_err(PatientError::Serialization)?
        };

        Ok(Self {
            id: record.id.as_str().to_owned(),
            role: record.role,
            name: record.name.as_str().to_owned(),
            gender: record.gender,
            age: record.age,
            phone: record.phone.as_str().to_owned(),
            email: record.email.as_ref().map(|e| e.as_str().to_owned()),
            date_of_birth: record.date_of_birth,
            height_cm: record.biometrics.map(|b| b.height_cm()),
            weight_kg: record.biometrics.map(|b| b.weight_kg()),
            registered_at: record.registered_at,
            attachments,
        })
    }
}

impl TryFrom<CsvRow> for PatientRecord {
    type Error = PatientError;

    fn try_from(row: CsvRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| {
            PatientError::CorruptStore(format!("row '{}' has an invalid {what}", row.id))
        };

        let name = NonEmptyText::new(&row.name).map_err(|_| corrupt("name"))?;
        let phone = NonEmptyText::new(&row.phone).map_err(|_| corrupt("phone"))?;
        let email = row
            .email
            .as_deref()
            .map(EmailAddress::parse)
            .transpose()
            .map_err(|_| corrupt("email"))?;
        let biometrics = match (row.height_cm, row.weight_kg) {
            (None, None) => None,
            (Some(h), Some(w)) => Some(Biometrics::new(h, w).map_err(|_| corrupt("height or weight"))?),
            _ => return Err(corrupt("height/weight pair")),
        };
        let attachments: Vec<Attachment> = if row.attachments.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&row.attachments).map_err(PatientError::Deserialization)?
        };

        if row.id.trim().is_empty() {
            return Err(PatientError::CorruptStore("row with an empty id".into()));
        }

        Ok(PatientRecord {
            id: RecordId::from_persisted(row.id),
            role: row.role,
            name,
            gender: row.gender,
            age: row.age,
            phone,
            email,
            date_of_birth: row.date_of_birth,
            biometrics,
            registered_at: row.registered_at,
            attachments,
        })
    }
}

impl Persistence for CsvFileBackend {
    fn load(&self) -> PatientResult<Vec<PatientRecord>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no CSV store yet, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(PatientError::FileRead(e)),
        };

        let mut reader = csv::Reader::from_reader(file);
        let mut records = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            records.push(PatientRecord::try_from(row?)?);
        }
        Ok(records)
    }

    fn save(&self, records: &[PatientRecord]) -> PatientResult<()> {
        ensure_parent_dir(&self.path)?;

        let staging = self.path.with_extension("csv.tmp");
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&staging)?;
        writer.write_record(CSV_HEADERS)?;
        for record in records {
            writer.serialize(CsvRow::from_record(record)?)?;
        }
        writer.flush().map_err(PatientError::FileWrite)?;
        drop(writer);

        fs::rename(&staging, &self.path).map_err(PatientError::FileWrite)?;

        tracing::debug!(path = %self.path.display(), records = records.len(), "saved CSV store");
        Ok(())
    }
}
