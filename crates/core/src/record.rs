//! Patient record model.
//!
//! A [`PatientRecord`] is created once at registration and afterwards only gains attachments.
//! BMI and its category are not fields: [`PatientRecord::triage`] recomputes them from the
//! current measurements on every call.

use crate::{PatientError, PatientResult};
use chrono::{DateTime, NaiveDate, Utc};
use healthdesk_files::Attachment;
use healthdesk_triage::Triage;
use healthdesk_types::{EmailAddress, NonEmptyText};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique key of a record within a store.
///
/// Depending on the store's identity scheme this holds a normalised email address, a
/// `name|phone` composite, or a generated short id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn from_email(email: &EmailAddress) -> Self {
        Self(email.as_str().to_owned())
    }

    pub fn from_name_phone(name: &NonEmptyText, phone: &NonEmptyText) -> Self {
        Self(format!("{}|{}", name.as_str(), phone.as_str()))
    }

    pub fn from_short_id(id: &healthdesk_ids::ShortId) -> Self {
        Self(id.as_str().to_owned())
    }

    /// Wraps an identity string read back from persisted state.
    pub(crate) fn from_persisted(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether the record belongs to a patient or a doctor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    #[default]
    Patient,
    Doctor,
}

impl FromStr for Role {
    type Err = PatientError;

    /// Blank input means `Patient`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            other => Err(PatientError::InvalidInput(format!(
                "role must be patient or doctor, got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Patient => "Patient",
            Role::Doctor => "Doctor",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
    #[default]
    Unspecified,
}

impl FromStr for Gender {
    type Err = PatientError;

    /// Accepts the variant names case-insensitively plus `m`/`f`. Blank input means
    /// `Unspecified`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            "" | "unspecified" => Ok(Gender::Unspecified),
            other => Err(PatientError::InvalidInput(format!(
                "gender must be male, female, other or unspecified, got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
            Gender::Unspecified => "Unspecified",
        })
    }
}

/// Height and weight, both strictly positive and finite.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBiometrics")]
pub struct Biometrics {
    height_cm: f64,
    weight_kg: f64,
}

#[derive(Deserialize)]
struct RawBiometrics {
    height_cm: f64,
    weight_kg: f64,
}

impl TryFrom<RawBiometrics> for Biometrics {
    type Error = PatientError;

    fn try_from(raw: RawBiometrics) -> Result<Self, Self::Error> {
        Biometrics::new(raw.height_cm, raw.weight_kg)
    }
}

impl Biometrics {
    /// # Errors
    ///
    /// Returns `PatientError::InvalidInput` when either value is not a finite positive number.
    pub fn new(height_cm: f64, weight_kg: f64) -> PatientResult<Self> {
        healthdesk_triage::bmi(height_cm, weight_kg)
            .map_err(|e| PatientError::InvalidInput(e.to_string()))?;
        Ok(Self {
            height_cm,
            weight_kg,
        })
    }

    pub fn height_cm(&self) -> f64 {
        self.height_cm
    }

    pub fn weight_kg(&self) -> f64 {
        self.weight_kg
    }
}

/// A validated registration, ready to be given an identity by the store.
#[derive(Clone, Debug, PartialEq)]
pub struct NewRecord {
    pub role: Role,
    pub name: NonEmptyText,
    pub gender: Gender,
    pub age: Option<u32>,
    pub phone: NonEmptyText,
    pub email: Option<EmailAddress>,
    pub date_of_birth: Option<NaiveDate>,
    pub biometrics: Option<Biometrics>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: RecordId,
    #[serde(default)]
    pub role: Role,
    pub name: NonEmptyText,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub age: Option<u32>,
    pub phone: NonEmptyText,
    #[serde(default)]
    pub email: Option<EmailAddress>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub biometrics: Option<Biometrics>,
    pub registered_at: DateTime<Utc>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl PatientRecord {
    pub(crate) fn from_new(id: RecordId, new: NewRecord, registered_at: DateTime<Utc>) -> Self {
        Self {
            id,
            role: new.role,
            name: new.name,
            gender: new.gender,
            age: new.age,
            phone: new.phone,
            email: new.email,
            date_of_birth: new.date_of_birth,
            biometrics: new.biometrics,
            registered_at,
            attachments: Vec::new(),
        }
    }

    /// BMI, category and advice from the current measurements, or `None` when the record has
    /// no measurements.
    pub fn triage(&self) -> Option<Triage> {
        self.biometrics
            .and_then(|b| healthdesk_triage::assess(b.height_cm(), b.weight_kg()).ok())
    }

    pub fn bmi(&self) -> Option<f64> {
        self.triage().map(|t| t.bmi)
    }

    /// True when `name` and `phone` both equal the stored values exactly.
    pub fn matches_credentials(&self, name: &str, phone: &str) -> bool {
        self.name.as_str() == name && self.phone.as_str() == phone
    }
}
