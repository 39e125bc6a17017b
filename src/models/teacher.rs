//! Teacher profile model, including the weekly substitution quota.

use serde::{Deserialize, Serialize};

use super::TeacherQuota;

/// Role of a staff account.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TeacherRole {
    Admin,
    #[default]
    Teacher,
}

impl TeacherRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeacherRole::Admin => "admin",
            TeacherRole::Teacher => "teacher",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(TeacherRole::Admin),
            "teacher" => Some(TeacherRole::Teacher),
            _ => None,
        }
    }
}

/// A staff member who can cover substitutions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: TeacherRole,
    pub active: bool,
    pub weekly_free_hours: i64,
    pub substitutions_this_week: i64,
    /// ISO week (`YYYY-Www`) the counter was last reset in
    pub last_reset_week: String,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

impl Teacher {
    /// Only active teachers with the teacher role are offered as substitutes.
    pub fn is_substitute_eligible(&self) -> bool {
        self.active && self.role == TeacherRole::Teacher
    }

    pub fn quota(&self) -> TeacherQuota {
        TeacherQuota {
            teacher_id: self.id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            weekly_free_hours: self.weekly_free_hours,
            substitutions_this_week: self.substitutions_this_week,
            last_reset_week: self.last_reset_week.clone(),
        }
    }
}

/// Request body for provisioning a new teacher.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeacherRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: TeacherRole,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Falls back to the configured default allowance when absent
    #[serde(default)]
    pub weekly_free_hours: Option<i64>,
}

fn default_active() -> bool {
    true
}

/// Request body for updating an existing teacher.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeacherRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<TeacherRole>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub weekly_free_hours: Option<i64>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}
