//! Weekly quota snapshots and the payloads built from them.

use serde::{Deserialize, Serialize};

/// Point-in-time view of one teacher's weekly substitution allowance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeacherQuota {
    pub teacher_id: String,
    pub first_name: String,
    pub last_name: String,
    pub weekly_free_hours: i64,
    pub substitutions_this_week: i64,
    pub last_reset_week: String,
}

impl TeacherQuota {
    /// Substitutions that count against `week`.
    ///
    /// A counter stamped with an older week has not been reset yet, so none of
    /// it belongs to `week`.
    pub fn used_in(&self, week: &str) -> i64 {
        if self.last_reset_week == week {
            self.substitutions_this_week
        } else {
            0
        }
    }

    /// Hours still free in `week`. Negative when the teacher was assigned past
    /// their allowance.
    pub fn remaining_in(&self, week: &str) -> i64 {
        self.weekly_free_hours - self.used_in(week)
    }
}

/// Answer of the recommendation endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub week: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher: Option<RecommendedTeacher>,
}

/// Candidate returned with its remaining capacity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedTeacher {
    #[serde(flatten)]
    pub quota: TeacherQuota,
    pub remaining: i64,
}

/// Result of a weekly reset pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyResetSummary {
    pub week: String,
    pub reset_count: u64,
}
