//! Registration form validation.
//!
//! Front-ends collect every field as text, exactly as a form would. [`RegistrationForm`]
//! carries those raw values and [`RegistrationForm::validate`] turns them into a
//! [`NewRecord`], reporting the first problem as `PatientError::InvalidInput`.

use crate::constants::MAX_AGE_YEARS;
use crate::record::{Biometrics, Gender, NewRecord, Role};
use crate::{PatientError, PatientResult};
use chrono::NaiveDate;
use healthdesk_types::{EmailAddress, NonEmptyText, TextError};
use serde::Deserialize;

/// Raw registration input. Optional fields may be absent or blank.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub height_cm: Option<String>,
    #[serde(default)]
    pub weight_kg: Option<String>,
}

impl RegistrationForm {
    /// Validates every field and builds a [`NewRecord`].
    ///
    /// Whether an email is *required* depends on the store's identity scheme and is checked by
    /// the store; here an email is only checked for shape when one is given.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::InvalidInput` if:
    /// - name or phone is missing, or the phone contains characters other than digits, spaces,
    ///   `+`, `-`, `(` and `)`
    /// - gender or role is not recognised
    /// - age is not a whole number between 0 and 150
    /// - email or date of birth is malformed, or the date of birth is in the future
    /// - height or weight is non-numeric or not strictly positive
    /// - only one of height and weight is given
    /// - a doctor record carries measurements
    pub fn validate(&self) -> PatientResult<NewRecord> {
        let role: Role = optional(&self.role).unwrap_or_default().parse()?;
        let name = required("name", &self.name)?;
        let phone = required("phone", &self.phone)?;
        validate_phone(phone.as_str())?;

        let gender: Gender = optional(&self.gender).unwrap_or_default().parse()?;
        let age = optional(&self.age).map(parse_age).transpose()?;

        let email = optional(&self.email)
            .map(|e| EmailAddress::parse(e).map_err(|err| invalid("email", err)))
            .transpose()?;

        let date_of_birth = optional(&self.date_of_birth)
            .map(parse_date_of_birth)
            .transpose()?;

        let biometrics = match (optional(&self.height_cm), optional(&self.weight_kg)) {
            (None, None) => None,
            (Some(height), Some(weight)) => Some(Biometrics::new(
                parse_measurement("height_cm", height)?,
                parse_measurement("weight_kg", weight)?,
            )?),
            _ => {
                return Err(PatientError::InvalidInput(
                    "height_cm and weight_kg must be given together".into(),
                ))
            }
        };

        if role == Role::Doctor && biometrics.is_some() {
            return Err(PatientError::InvalidInput(
                "doctor records do not carry height or weight".into(),
            ));
        }

        Ok(NewRecord {
            role,
            name,
            gender,
            age,
            phone,
            email,
            date_of_birth,
            biometrics,
        })
    }
}

fn optional(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required(field: &str, value: &str) -> PatientResult<NonEmptyText> {
    NonEmptyText::new(value).map_err(|_| PatientError::InvalidInput(format!("{field} is required")))
}

fn invalid(field: &str, err: TextError) -> PatientError {
    PatientError::InvalidInput(format!("{field}: {err}"))
}

fn validate_phone(phone: &str) -> PatientResult<()> {
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'));
    if !allowed || !phone.chars().any(|c| c.is_ascii_digit()) {
        return Err(PatientError::InvalidInput(format!(
            "phone must contain digits and only '+', '-', '(', ')' or spaces, got '{phone}'"
        )));
    }
    Ok(())
}

fn parse_age(raw: &str) -> PatientResult<u32> {
    match raw.parse::<u32>() {
        Ok(age) if age <= MAX_AGE_YEARS => Ok(age),
        _ => Err(PatientError::InvalidInput(format!(
            "age must be a whole number between 0 and {MAX_AGE_YEARS}, got '{raw}'"
        ))),
    }
}

fn parse_date_of_birth(raw: &str) -> PatientResult<NaiveDate> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        PatientError::InvalidInput(format!("date_of_birth must be YYYY-MM-DD, got '{raw}'"))
    })?;
    if date > chrono::Utc::now().date_naive() {
        return Err(PatientError::InvalidInput(
            "date_of_birth cannot be in the future".into(),
        ));
    }
    Ok(date)
}

fn parse_measurement(field: &str, raw: &str) -> PatientResult<f64> {
    raw.parse::<f64>()
        .map_err(|_| PatientError::InvalidInput(format!("{field} must be a number, got '{raw}'")))
}
