//! Substitution API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, NaiveTime};

use super::{error, success, written, ApiResult};
use crate::errors::AppError;
use crate::models::{
    CreateSubstitutionRequest, Substitution, SubstitutionQuery, SubstitutionReason,
    UpdateSubstitutionRequest,
};
use crate::quota;
use crate::AppState;

/// GET /api/substitutions - List substitutions.
///
/// Filters: `date`, or `start` + `end` (inclusive), optionally `teacherId`.
pub async fn list_substitutions(
    State(state): State<AppState>,
    Query(query): Query<SubstitutionQuery>,
) -> ApiResult<Vec<Substitution>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let range = match resolve_range(&query) {
        Ok(range) => range,
        Err(e) => return error(e, revision_id),
    };

    let result = match (query.teacher_id.as_deref(), range) {
        (None, Some((start, end))) if start == end => {
            state.repo.list_substitutions_by_date(&start).await
        }
        (None, Some((start, end))) => {
            state
                .repo
                .list_substitutions_by_date_range(&start, &end)
                .await
        }
        (teacher_id, Some((start, end))) => {
            state
                .repo
                .list_substitutions(teacher_id, Some(start.as_str()), Some(end.as_str()))
                .await
        }
        (teacher_id, None) => state.repo.list_substitutions(teacher_id, None, None).await,
    };

    match result {
        Ok(substitutions) => success(substitutions, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/substitutions/:id - Get a single substitution.
pub async fn get_substitution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Substitution> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_substitution(&id).await {
        Ok(Some(substitution)) => success(substitution, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Substitution {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/substitutions - Create a substitution and count it against the
/// covering teacher. Without `assignedTeacherId` the recommended teacher is
/// assigned, or `NO_CANDIDATE` is returned.
pub async fn create_substitution(
    State(state): State<AppState>,
    Json(mut request): Json<CreateSubstitutionRequest>,
) -> ApiResult<Substitution> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    // Validate required fields
    if let Err(e) = validate_schedule(&request.date, &request.start_time, &request.end_time) {
        return error(e, revision_id);
    }
    if let Err(e) = validate_reason(request.reason, request.reason_other.as_deref()) {
        return error(e, revision_id);
    }
    if request.reason != SubstitutionReason::Other {
        request.reason_other = None;
    }
    if let Some(teacher_id) = &request.assigned_teacher_id {
        if teacher_id.trim().is_empty() {
            return error(
                AppError::Validation("Assigned teacher cannot be blank".to_string()),
                revision_id,
            );
        }
    }

    // Counters must belong to this week before one is consumed
    let week = match quota::ensure_current_week(&state.repo).await {
        Ok(summary) => summary.week,
        Err(e) => return error(e, revision_id),
    };

    match state.repo.create_substitution(&request, &week).await {
        Ok(substitution) => {
            tracing::info!(
                "Substitution {} on {} assigned to teacher {}",
                substitution.id,
                substitution.date,
                substitution.assigned_teacher_id
            );
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(substitution, new_revision)
        }
        Err(e) => {
            if matches!(e, AppError::NoCandidate(_)) {
                tracing::info!("No teacher available for substitution on {}", request.date);
            }
            error(e, revision_id)
        }
    }
}

/// PUT /api/substitutions/:id - Edit a substitution. Quotas are not adjusted.
pub async fn update_substitution(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateSubstitutionRequest>,
) -> ApiResult<Substitution> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let existing = match state.repo.get_substitution(&id).await {
        Ok(Some(substitution)) => substitution,
        Ok(None) => {
            return error(
                AppError::NotFound(format!("Substitution {} not found", id)),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    };

    // Validate the record as it will look after the edit
    let date = request.date.as_deref().unwrap_or(&existing.date);
    let start_time = request.start_time.as_deref().unwrap_or(&existing.start_time);
    let end_time = request.end_time.as_deref().unwrap_or(&existing.end_time);
    if let Err(e) = validate_schedule(date, start_time, end_time) {
        return error(e, revision_id);
    }
    let reason = request.reason.unwrap_or(existing.reason);
    let reason_other = request
        .reason_other
        .as_deref()
        .or(existing.reason_other.as_deref());
    if let Err(e) = validate_reason(reason, reason_other) {
        return error(e, revision_id);
    }
    if let Some(teacher_id) = &request.assigned_teacher_id {
        if teacher_id.trim().is_empty() {
            return error(
                AppError::Validation("Assigned teacher cannot be blank".to_string()),
                revision_id,
            );
        }
    }

    let result = state.repo.update_substitution(&id, &request).await;
    written(&state, result, revision_id).await
}

/// POST /api/substitutions/:id/seen - The covering teacher has seen it.
pub async fn mark_substitution_seen(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Substitution> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = state.repo.mark_substitution_seen(&id).await;
    written(&state, result, revision_id).await
}

/// POST /api/substitutions/:id/confirm - The covering teacher confirms it.
pub async fn confirm_substitution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Substitution> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = state.repo.confirm_substitution(&id).await;
    written(&state, result, revision_id).await
}

/// DELETE /api/substitutions/:id - Delete a substitution. Quotas are not adjusted.
pub async fn delete_substitution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = state.repo.delete_substitution(&id).await;
    written(&state, result, revision_id).await
}

/// Turn the listing filters into an inclusive `(start, end)` date range.
fn resolve_range(query: &SubstitutionQuery) -> Result<Option<(String, String)>, AppError> {
    match (&query.date, &query.start, &query.end) {
        (Some(date), None, None) => {
            parse_date(date)?;
            Ok(Some((date.clone(), date.clone())))
        }
        (None, Some(start), Some(end)) => {
            if parse_date(start)? > parse_date(end)? {
                return Err(AppError::BadRequest(
                    "start must not be after end".to_string(),
                ));
            }
            Ok(Some((start.clone(), end.clone())))
        }
        (None, None, None) => Ok(None),
        _ => Err(AppError::BadRequest(
            "Use either date, or start and end together".to_string(),
        )),
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date {:?}, expected YYYY-MM-DD", value)))
}

fn parse_time(value: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| AppError::Validation(format!("Invalid time {:?}, expected HH:MM", value)))
}

fn validate_schedule(date: &str, start_time: &str, end_time: &str) -> Result<(), AppError> {
    parse_date(date)?;
    if parse_time(start_time)? >= parse_time(end_time)? {
        return Err(AppError::Validation(
            "End time must be after start time".to_string(),
        ));
    }
    Ok(())
}

fn validate_reason(
    reason: SubstitutionReason,
    reason_other: Option<&str>,
) -> Result<(), AppError> {
    let described = reason_other.is_some_and(|text| !text.trim().is_empty());
    if reason == SubstitutionReason::Other && !described {
        return Err(AppError::Validation(
            "A description is required when the reason is other".to_string(),
        ));
    }
    Ok(())
}
