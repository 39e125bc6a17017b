//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity.

use chrono::Utc;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    CreateSubstitutionRequest, CreateTeacherRequest, RevisionInfo, Substitution,
    SubstitutionReason, Teacher, TeacherQuota, TeacherRole, UpdateSubstitutionRequest,
    UpdateTeacherRequest,
};
use crate::quota::rank_candidates;

const TEACHER_COLUMNS: &str = "id, first_name, last_name, email, role, active, weekly_free_hours, substitutions_this_week, last_reset_week, updated_at, version";

const SUBSTITUTION_COLUMNS: &str = "id, date, start_time, end_time, assigned_teacher_id, absent_teacher_id, group_name, reason, reason_other, notes, seen, confirmed, created_at, updated_at, version";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    /// Increment the revision ID and return the new value.
    pub async fn increment_revision(&self) -> Result<i64, AppError> {
        let mut conn = self.pool.acquire().await?;
        bump_revision(&mut conn).await?;
        drop(conn);
        self.get_revision_id().await
    }

    // ==================== TEACHER OPERATIONS ====================

    /// List all teachers.
    pub async fn list_teachers(&self) -> Result<Vec<Teacher>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM teachers ORDER BY last_name, first_name, id",
            TEACHER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(teacher_from_row).collect()
    }

    /// Get a teacher by ID.
    pub async fn get_teacher(&self, id: &str) -> Result<Option<Teacher>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM teachers WHERE id = ?", TEACHER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(teacher_from_row).transpose()
    }

    /// Provision a new teacher with an empty counter stamped with `week`.
    pub async fn create_teacher(
        &self,
        request: &CreateTeacherRequest,
        weekly_free_hours: i64,
        week: &str,
    ) -> Result<Teacher, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO teachers (id, first_name, last_name, email, role, active, weekly_free_hours, substitutions_this_week, last_reset_week, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?, 1)"
        )
        .bind(&id)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.email)
        .bind(request.role.as_str())
        .bind(request.active as i32)
        .bind(weekly_free_hours)
        .bind(week)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(Teacher {
            id,
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            email: request.email.clone(),
            role: request.role,
            active: request.active,
            weekly_free_hours,
            substitutions_this_week: 0,
            last_reset_week: week.to_string(),
            updated_at: now,
            version: 1,
        })
    }

    /// Update a teacher profile with optimistic concurrency control.
    ///
    /// The weekly counter is owned by the quota operations and is left as is.
    pub async fn update_teacher(
        &self,
        id: &str,
        request: &UpdateTeacherRequest,
    ) -> Result<Teacher, AppError> {
        let existing = self
            .get_teacher(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Teacher {} not found", id)))?;

        // Check version for optimistic concurrency
        if let Some(expected) = request.expected_version {
            if existing.version != expected {
                return Err(AppError::Conflict {
                    message: format!(
                        "Version mismatch: expected {}, current {}",
                        expected, existing.version
                    ),
                    current_version: existing.version,
                });
            }
        }

        let now = Utc::now().to_rfc3339();
        let new_version = existing.version + 1;

        let first_name = request.first_name.as_ref().unwrap_or(&existing.first_name);
        let last_name = request.last_name.as_ref().unwrap_or(&existing.last_name);
        let email = request.email.clone().or(existing.email.clone());
        let role = request.role.unwrap_or(existing.role);
        let active = request.active.unwrap_or(existing.active);
        let weekly_free_hours = request
            .weekly_free_hours
            .unwrap_or(existing.weekly_free_hours);

        // Use conditional UPDATE with version check to prevent race conditions
        let result = sqlx::query(
            "UPDATE teachers SET first_name = ?, last_name = ?, email = ?, role = ?, active = ?, weekly_free_hours = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?"
        )
        .bind(first_name)
        .bind(last_name)
        .bind(&email)
        .bind(role.as_str())
        .bind(active as i32)
        .bind(weekly_free_hours)
        .bind(&now)
        .bind(new_version)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Race condition - version changed between read and write
            let current = self.get_teacher(id).await?;
            return Err(AppError::Conflict {
                message: "Concurrent modification detected".to_string(),
                current_version: current.map(|t| t.version).unwrap_or(0),
            });
        }

        self.increment_revision().await?;

        // Re-read so the counter reflects increments that raced with this edit
        self.get_teacher(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Teacher {} not found", id)))
    }

    /// Delete a teacher together with their quota.
    pub async fn delete_teacher(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM teachers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Teacher {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }

    // ==================== QUOTA OPERATIONS ====================

    /// Quota snapshots of every substitute-eligible teacher.
    pub async fn list_eligible_quotas(&self) -> Result<Vec<TeacherQuota>, AppError> {
        let teachers = self.list_teachers().await?;

        Ok(teachers
            .iter()
            .filter(|teacher| teacher.is_substitute_eligible())
            .map(Teacher::quota)
            .collect())
    }

    /// Zero every counter not stamped with `week` and stamp it.
    ///
    /// Returns the number of counters that were reset; 0 on a repeated call
    /// within the same week.
    pub async fn reset_weekly_counters(&self, week: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE teachers SET substitutions_this_week = 0, last_reset_week = ? WHERE last_reset_week <> ?",
        )
        .bind(week)
        .bind(week)
        .execute(&self.pool)
        .await?;

        let reset = result.rows_affected();
        if reset > 0 {
            self.increment_revision().await?;
        }
        Ok(reset)
    }

    /// Add one substitution to a teacher's counter for `week`.
    ///
    /// Returns `false` when the teacher does not exist. There is no ceiling
    /// check here; capacity is enforced only when a teacher is auto-assigned.
    pub async fn increment_substitution(
        &self,
        teacher_id: &str,
        week: &str,
    ) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;
        let found = increment_counter(&mut conn, teacher_id, week).await?;
        if found {
            bump_revision(&mut conn).await?;
        }
        Ok(found)
    }

    // ==================== SUBSTITUTION OPERATIONS ====================

    /// List substitutions, optionally restricted to one assigned teacher and
    /// an inclusive date range.
    pub async fn list_substitutions(
        &self,
        teacher_id: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Vec<Substitution>, AppError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {} FROM substitutions
               WHERE (? IS NULL OR assigned_teacher_id = ?)
                 AND (? IS NULL OR date >= ?)
                 AND (? IS NULL OR date <= ?)
               ORDER BY date, start_time, id"#,
            SUBSTITUTION_COLUMNS
        ))
        .bind(teacher_id)
        .bind(teacher_id)
        .bind(start)
        .bind(start)
        .bind(end)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(substitution_from_row).collect()
    }

    /// Substitutions between `start` and `end`, both inclusive.
    pub async fn list_substitutions_by_date_range(
        &self,
        start: &str,
        end: &str,
    ) -> Result<Vec<Substitution>, AppError> {
        self.list_substitutions(None, Some(start), Some(end)).await
    }

    /// Substitutions on a single day.
    pub async fn list_substitutions_by_date(&self, date: &str) -> Result<Vec<Substitution>, AppError> {
        self.list_substitutions(None, Some(date), Some(date)).await
    }

    /// Get a substitution by ID.
    pub async fn get_substitution(&self, id: &str) -> Result<Option<Substitution>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM substitutions WHERE id = ?",
            SUBSTITUTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(substitution_from_row).transpose()
    }

    /// Create a substitution and count it against the covering teacher.
    ///
    /// The record and the counter change commit together. With an explicit
    /// `assigned_teacher_id` the counter is incremented unconditionally (an
    /// administrator may assign past the allowance). Without one, candidates
    /// are ranked for `week` and claimed with a capacity-guarded update, so
    /// two concurrent requests can never both consume a teacher's last hour.
    pub async fn create_substitution(
        &self,
        request: &CreateSubstitutionRequest,
        week: &str,
    ) -> Result<Substitution, AppError> {
        let candidates = match request.assigned_teacher_id {
            Some(_) => Vec::new(),
            None => self.list_eligible_quotas().await?,
        };

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        let assigned_teacher_id = match &request.assigned_teacher_id {
            Some(teacher_id) => {
                if !increment_counter(&mut tx, teacher_id, week).await? {
                    return Err(AppError::NotFound(format!(
                        "Teacher {} not found",
                        teacher_id
                    )));
                }
                teacher_id.clone()
            }
            None => {
                let mut claimed = None;
                for candidate in rank_candidates(&candidates, week) {
                    if claim_capacity(&mut tx, &candidate.teacher_id, week).await? {
                        claimed = Some(candidate.teacher_id.clone());
                        break;
                    }
                    tracing::debug!(
                        "Teacher {} lost capacity before claim, trying next",
                        candidate.teacher_id
                    );
                }
                claimed.ok_or_else(|| {
                    AppError::NoCandidate(format!("No teacher has free hours left in {}", week))
                })?
            }
        };

        sqlx::query(&format!(
            "INSERT INTO substitutions ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?, 1)",
            SUBSTITUTION_COLUMNS
        ))
        .bind(&id)
        .bind(&request.date)
        .bind(&request.start_time)
        .bind(&request.end_time)
        .bind(&assigned_teacher_id)
        .bind(&request.absent_teacher_id)
        .bind(&request.group)
        .bind(request.reason.as_str())
        .bind(&request.reason_other)
        .bind(&request.notes)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        Ok(Substitution {
            id,
            date: request.date.clone(),
            start_time: request.start_time.clone(),
            end_time: request.end_time.clone(),
            assigned_teacher_id,
            absent_teacher_id: request.absent_teacher_id.clone(),
            group: request.group.clone(),
            reason: request.reason,
            reason_other: request.reason_other.clone(),
            notes: request.notes.clone(),
            seen: false,
            confirmed: false,
            created_at: now.clone(),
            updated_at: now,
            version: 1,
        })
    }

    /// Update a substitution with optimistic concurrency control.
    ///
    /// Counters are not adjusted, not even when the assigned teacher changes.
    pub async fn update_substitution(
        &self,
        id: &str,
        request: &UpdateSubstitutionRequest,
    ) -> Result<Substitution, AppError> {
        let existing = self
            .get_substitution(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Substitution {} not found", id)))?;

        // Check version for optimistic concurrency
        if let Some(expected) = request.expected_version {
            if existing.version != expected {
                return Err(AppError::Conflict {
                    message: format!(
                        "Version mismatch: expected {}, current {}",
                        expected, existing.version
                    ),
                    current_version: existing.version,
                });
            }
        }

        if let Some(teacher_id) = &request.assigned_teacher_id {
            if self.get_teacher(teacher_id).await?.is_none() {
                return Err(AppError::NotFound(format!("Teacher {} not found", teacher_id)));
            }
        }

        let now = Utc::now().to_rfc3339();
        let new_version = existing.version + 1;

        let date = request.date.as_ref().unwrap_or(&existing.date);
        let start_time = request.start_time.as_ref().unwrap_or(&existing.start_time);
        let end_time = request.end_time.as_ref().unwrap_or(&existing.end_time);
        let assigned_teacher_id = request
            .assigned_teacher_id
            .as_ref()
            .unwrap_or(&existing.assigned_teacher_id);
        let absent_teacher_id = patch_field(&request.absent_teacher_id, &existing.absent_teacher_id);
        let group = patch_field(&request.group, &existing.group);
        let reason = request.reason.unwrap_or(existing.reason);
        // Free text only makes sense for `other`
        let reason_other = match reason {
            SubstitutionReason::Other => request
                .reason_other
                .clone()
                .or(existing.reason_other.clone()),
            _ => None,
        };
        let notes = patch_field(&request.notes, &existing.notes);

        let result = sqlx::query(
            r#"UPDATE substitutions SET
                date = ?, start_time = ?, end_time = ?, assigned_teacher_id = ?,
                absent_teacher_id = ?, group_name = ?, reason = ?, reason_other = ?,
                notes = ?, updated_at = ?, version = ?
            WHERE id = ? AND version = ?"#,
        )
        .bind(date)
        .bind(start_time)
        .bind(end_time)
        .bind(assigned_teacher_id)
        .bind(&absent_teacher_id)
        .bind(&group)
        .bind(reason.as_str())
        .bind(&reason_other)
        .bind(&notes)
        .bind(&now)
        .bind(new_version)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_substitution(id).await?;
            return Err(AppError::Conflict {
                message: "Concurrent modification detected".to_string(),
                current_version: current.map(|s| s.version).unwrap_or(0),
            });
        }

        self.increment_revision().await?;

        Ok(Substitution {
            id: id.to_string(),
            date: date.clone(),
            start_time: start_time.clone(),
            end_time: end_time.clone(),
            assigned_teacher_id: assigned_teacher_id.clone(),
            absent_teacher_id,
            group,
            reason,
            reason_other,
            notes,
            seen: existing.seen,
            confirmed: existing.confirmed,
            created_at: existing.created_at,
            updated_at: now,
            version: new_version,
        })
    }

    /// Mark a substitution as seen by the covering teacher.
    pub async fn mark_substitution_seen(&self, id: &str) -> Result<Substitution, AppError> {
        self.set_substitution_flag(id, "seen = 1").await
    }

    /// Record that the covering teacher confirmed the substitution.
    ///
    /// Confirming implies having seen it.
    pub async fn confirm_substitution(&self, id: &str) -> Result<Substitution, AppError> {
        self.set_substitution_flag(id, "seen = 1, confirmed = 1").await
    }

    async fn set_substitution_flag(
        &self,
        id: &str,
        assignment: &'static str,
    ) -> Result<Substitution, AppError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(&format!(
            "UPDATE substitutions SET {}, updated_at = ?, version = version + 1 WHERE id = ?",
            assignment
        ))
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Substitution {} not found", id)));
        }

        self.increment_revision().await?;

        self.get_substitution(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Substitution {} not found", id)))
    }

    /// Delete a substitution. The teacher's counter is not decremented.
    pub async fn delete_substitution(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM substitutions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Substitution {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }
}

// Statements shared by pooled and transactional callers

async fn bump_revision(conn: &mut SqliteConnection) -> Result<(), AppError> {
    let now = Utc::now().to_rfc3339();
    sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
        .bind(&now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Count one substitution for `teacher_id` in `week`. A counter from an older
/// week starts over at 1 and is restamped.
async fn increment_counter(
    conn: &mut SqliteConnection,
    teacher_id: &str,
    week: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"UPDATE teachers SET
            substitutions_this_week = CASE WHEN last_reset_week = ? THEN substitutions_this_week + 1 ELSE 1 END,
            last_reset_week = ?
        WHERE id = ?"#,
    )
    .bind(week)
    .bind(week)
    .bind(teacher_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Consume one free hour of `teacher_id` in `week` if, and only if, one is
/// left. A counter from an older week counts as empty and is restamped.
async fn claim_capacity(
    conn: &mut SqliteConnection,
    teacher_id: &str,
    week: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"UPDATE teachers SET
            substitutions_this_week = CASE WHEN last_reset_week = ? THEN substitutions_this_week + 1 ELSE 1 END,
            last_reset_week = ?
        WHERE id = ? AND role = 'teacher' AND active = 1
          AND weekly_free_hours > CASE WHEN last_reset_week = ? THEN substitutions_this_week ELSE 0 END"#,
    )
    .bind(week)
    .bind(week)
    .bind(teacher_id)
    .bind(week)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Apply one nullable field of a patch: absent keeps, `null` clears.
fn patch_field(patch: &Option<Option<String>>, existing: &Option<String>) -> Option<String> {
    match patch {
        Some(value) => value.clone(),
        None => existing.clone(),
    }
}

// Helper functions for row conversion

fn teacher_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Teacher, AppError> {
    let active: i32 = row.get("active");
    let role_str: String = row.get("role");
    let role = TeacherRole::from_str(&role_str)
        .ok_or_else(|| AppError::Internal(format!("Unknown teacher role {:?}", role_str)))?;

    Ok(Teacher {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        role,
        active: active != 0,
        weekly_free_hours: row.get("weekly_free_hours"),
        substitutions_this_week: row.get("substitutions_this_week"),
        last_reset_week: row.get("last_reset_week"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    })
}

fn substitution_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Substitution, AppError> {
    let seen: i32 = row.get("seen");
    let confirmed: i32 = row.get("confirmed");
    let reason_str: String = row.get("reason");
    let reason = SubstitutionReason::from_str(&reason_str).ok_or_else(|| {
        AppError::Internal(format!("Unknown substitution reason {:?}", reason_str))
    })?;

    Ok(Substitution {
        id: row.get("id"),
        date: row.get("date"),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        assigned_teacher_id: row.get("assigned_teacher_id"),
        absent_teacher_id: row.get("absent_teacher_id"),
        group: row.get("group_name"),
        reason,
        reason_other: row.get("reason_other"),
        notes: row.get("notes"),
        seen: seen != 0,
        confirmed: confirmed != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    })
}
