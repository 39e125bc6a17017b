//! Teacher API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, written, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateTeacherRequest, Teacher, UpdateTeacherRequest};
use crate::quota::current_week;
use crate::AppState;

/// GET /api/teachers - List all teachers.
pub async fn list_teachers(State(state): State<AppState>) -> ApiResult<Vec<Teacher>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_teachers().await {
        Ok(teachers) => success(teachers, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/teachers/:id - Get a single teacher.
pub async fn get_teacher(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Teacher> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_teacher(&id).await {
        Ok(Some(teacher)) => success(teacher, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Teacher {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/teachers - Provision a new teacher.
pub async fn create_teacher(
    State(state): State<AppState>,
    Json(request): Json<CreateTeacherRequest>,
) -> ApiResult<Teacher> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    // Validate required fields
    if request.first_name.trim().is_empty() {
        return error(
            AppError::Validation("First name is required".to_string()),
            revision_id,
        );
    }
    if request.last_name.trim().is_empty() {
        return error(
            AppError::Validation("Last name is required".to_string()),
            revision_id,
        );
    }
    let weekly_free_hours = request
        .weekly_free_hours
        .unwrap_or(state.config.default_weekly_free_hours);
    if let Err(e) = validate_weekly_free_hours(weekly_free_hours) {
        return error(e, revision_id);
    }

    match state
        .repo
        .create_teacher(&request, weekly_free_hours, &current_week())
        .await
    {
        Ok(teacher) => {
            tracing::info!(
                "Provisioned teacher {} with {} weekly free hours",
                teacher.id,
                teacher.weekly_free_hours
            );
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(teacher, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/teachers/:id - Update a teacher profile or allowance.
pub async fn update_teacher(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTeacherRequest>,
) -> ApiResult<Teacher> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let blank_name = [&request.first_name, &request.last_name]
        .into_iter()
        .flatten()
        .any(|name| name.trim().is_empty());
    if blank_name {
        return error(
            AppError::Validation("Names cannot be blank".to_string()),
            revision_id,
        );
    }
    if let Some(hours) = request.weekly_free_hours {
        if let Err(e) = validate_weekly_free_hours(hours) {
            return error(e, revision_id);
        }
    }

    let result = state.repo.update_teacher(&id, &request).await;
    written(&state, result, revision_id).await
}

/// DELETE /api/teachers/:id - Remove a teacher and their quota.
pub async fn delete_teacher(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = state.repo.delete_teacher(&id).await;
    written(&state, result, revision_id).await
}

fn validate_weekly_free_hours(hours: i64) -> Result<(), AppError> {
    if hours < 0 {
        return Err(AppError::Validation(
            "Weekly free hours cannot be negative".to_string(),
        ));
    }
    Ok(())
}
