//! Substitution record model.

use serde::{Deserialize, Deserializer, Serialize};

/// Why the absent teacher needs cover.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionReason {
    Illness,
    MedicalAppointment,
    Training,
    PersonalMatters,
    SchoolActivity,
    Other,
}

impl SubstitutionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubstitutionReason::Illness => "illness",
            SubstitutionReason::MedicalAppointment => "medical_appointment",
            SubstitutionReason::Training => "training",
            SubstitutionReason::PersonalMatters => "personal_matters",
            SubstitutionReason::SchoolActivity => "school_activity",
            SubstitutionReason::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "illness" => Some(SubstitutionReason::Illness),
            "medical_appointment" => Some(SubstitutionReason::MedicalAppointment),
            "training" => Some(SubstitutionReason::Training),
            "personal_matters" => Some(SubstitutionReason::PersonalMatters),
            "school_activity" => Some(SubstitutionReason::SchoolActivity),
            "other" => Some(SubstitutionReason::Other),
            _ => None,
        }
    }
}

/// One covered slot: who covers whom, when and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Substitution {
    pub id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub start_time: String,
    /// `HH:MM`
    pub end_time: String,
    pub assigned_teacher_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absent_teacher_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub reason: SubstitutionReason,
    /// Free text, only set when `reason` is `other`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_other: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub seen: bool,
    pub confirmed: bool,
    pub created_at: String,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

/// Request body for creating a substitution.
///
/// Without `assignedTeacherId` the service assigns the recommended teacher.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubstitutionRequest {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub assigned_teacher_id: Option<String>,
    #[serde(default)]
    pub absent_teacher_id: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    pub reason: SubstitutionReason,
    #[serde(default)]
    pub reason_other: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request body for editing a substitution. Quotas are never touched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubstitutionRequest {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub assigned_teacher_id: Option<String>,
    /// `null` clears the field, an absent key keeps it.
    #[serde(default, deserialize_with = "nullable")]
    pub absent_teacher_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub group: Option<Option<String>>,
    #[serde(default)]
    pub reason: Option<SubstitutionReason>,
    #[serde(default)]
    pub reason_other: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Only called for keys present in the body, so `null` becomes `Some(None)`.
fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Query string of the substitution listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstitutionQuery {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub teacher_id: Option<String>,
}
