//! Wire types for the HealthDesk REST API.
//!
//! Requests mirror the registration form: every field is text, because that is how form
//! front-ends send them. Numeric fields also accept JSON numbers. Responses flatten the core
//! record model into plain strings and numbers and include the derived triage.

use healthdesk_core::{Attachment, Dashboard, PatientRecord, RegistrationForm, Triage};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
    /// Number of records in the store
    pub records: usize,
}

/// Registration request. Only `name` and `phone` are always required; whether `email` is
/// required depends on the server's identity scheme.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RegisterReq {
    /// `patient` (default) or `doctor`
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub name: String,
    /// `male`, `female`, `other` or `unspecified`
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    #[schema(value_type = Option<String>)]
    pub age: Option<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    #[schema(value_type = Option<String>)]
    pub height_cm: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    #[schema(value_type = Option<String>)]
    pub weight_kg: Option<String>,
}

impl From<RegisterReq> for RegistrationForm {
    fn from(req: RegisterReq) -> Self {
        RegistrationForm {
            role: req.role,
            name: req.name,
            gender: req.gender,
            age: req.age,
            phone: req.phone,
            email: req.email,
            date_of_birth: req.date_of_birth,
            height_cm: req.height_cm,
            weight_kg: req.weight_kg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    pub name: String,
    pub phone: String,
}

/// Upload request. The content travels base64-encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UploadReq {
    pub filename: String,
    /// Declared type: an extension (`pdf`) or MIME type (`application/pdf`). When absent the
    /// filename extension decides.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Standard base64 of the file bytes
    pub content_base64: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttachmentRes {
    pub filename: String,
    pub kind: String,
    pub stored_path: String,
    pub media_type: Option<String>,
    pub size_bytes: u64,
    pub hash: String,
    /// First configured keyword found in a text upload
    pub tag: Option<String>,
    pub stored_at: String,
}

impl From<&Attachment> for AttachmentRes {
    fn from(a: &Attachment) -> Self {
        Self {
            filename: a.filename.to_string(),
            kind: a.kind.as_str().to_owned(),
            stored_path: a.stored_path.to_string(),
            media_type: a.media_type.clone(),
            size_bytes: a.size_bytes,
            hash: a.hash.as_str().to_owned(),
            tag: a.tag.clone(),
            stored_at: a.stored_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TriageRes {
    pub bmi: f64,
    /// `Underweight`, `Normal`, `Overweight` or `Obese`
    pub status: String,
    pub advice: String,
}

impl From<&Triage> for TriageRes {
    fn from(t: &Triage) -> Self {
        Self {
            bmi: t.bmi,
            status: t.status.to_string(),
            advice: t.advice.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub id: String,
    pub role: String,
    pub name: String,
    pub gender: String,
    pub age: Option<u32>,
    pub phone: String,
    pub email: Option<String>,
    pub date_of_birth: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    /// Derived from the current measurements; never stored
    pub bmi: Option<f64>,
    pub registered_at: String,
    pub attachments: Vec<AttachmentRes>,
}

impl From<&PatientRecord> for PatientRes {
    fn from(r: &PatientRecord) -> Self {
        Self {
            id: r.id.to_string(),
            role: r.role.to_string(),
            name: r.name.to_string(),
            gender: r.gender.to_string(),
            age: r.age,
            phone: r.phone.to_string(),
            email: r.email.as_ref().map(|e| e.as_str().to_owned()),
            date_of_birth: r.date_of_birth.map(|d| d.to_string()),
            height_cm: r.biometrics.map(|b| b.height_cm()),
            weight_kg: r.biometrics.map(|b| b.weight_kg()),
            bmi: r.bmi(),
            registered_at: r.registered_at.to_rfc3339(),
            attachments: r.attachments.iter().map(AttachmentRes::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardRes {
    pub patient: PatientRes,
    /// Absent when the record has no measurements
    pub triage: Option<TriageRes>,
}

impl From<&Dashboard> for DashboardRes {
    fn from(d: &Dashboard) -> Self {
        Self {
            patient: PatientRes::from(&d.record),
            triage: d.triage.as_ref().map(TriageRes::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientRes>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

/// Accepts a string, an integer or a float and keeps it as text for the form validator.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Int(i) => i.to_string(),
        Raw::Float(f) => f.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_req_accepts_numbers_and_strings() {
        let req: RegisterReq = serde_json::from_str(
            r#"{"name": "Ada", "phone": "0123", "age": 36, "height_cm": "170", "weight_kg": 70.5}"#,
        )
        .unwrap();
        assert_eq!(req.age.as_deref(), Some("36"));
        assert_eq!(req.height_cm.as_deref(), Some("170"));
        assert_eq!(req.weight_kg.as_deref(), Some("70.5"));
        assert_eq!(req.email, None);
    }

    #[test]
    fn register_req_allows_null_and_missing_numbers() {
        let req: RegisterReq =
            serde_json::from_str(r#"{"name": "Ada", "phone": "0123", "age": null}"#).unwrap();
        assert_eq!(req.age, None);
        assert_eq!(req.height_cm, None);
    }

    #[test]
    fn register_req_converts_to_a_valid_form() {
        let req = RegisterReq {
            name: "Ada".into(),
            phone: "0123".into(),
            email: Some("a@x.com".into()),
            height_cm: Some("170".into()),
            weight_kg: Some("70".into()),
            ..Default::default()
        };
        let new = RegistrationForm::from(req).validate().unwrap();
        assert_eq!(new.name.as_str(), "Ada");
    }

    #[test]
    fn upload_req_content_type_is_optional() {
        let req: UploadReq =
            serde_json::from_str(r#"{"filename": "a.txt", "content_base64": "aGk="}"#).unwrap();
        assert_eq!(req.content_type, None);
    }
}
