//! Weekly quota and recommendation endpoints.

use axum::extract::{Path, State};

use super::{error, success, written, ApiResult};
use crate::models::{Recommendation, TeacherQuota, WeeklyResetSummary};
use crate::quota;
use crate::AppState;

/// GET /api/quotas - Quota snapshots of all substitute-eligible teachers.
pub async fn list_quotas(State(state): State<AppState>) -> ApiResult<Vec<TeacherQuota>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = quota::ensure_current_week(&state.repo).await {
        return error(e, revision_id);
    }

    let result = state.repo.list_eligible_quotas().await;
    written(&state, result, revision_id).await
}

/// POST /api/quotas/reset - Reset counters left over from previous weeks.
pub async fn reset_weekly_counters(
    State(state): State<AppState>,
) -> ApiResult<WeeklyResetSummary> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = quota::ensure_current_week(&state.repo).await;
    written(&state, result, revision_id).await
}

/// POST /api/quotas/:teacherId/increment - Count one more substitution.
///
/// Always succeeds; an unknown teacher is only logged.
pub async fn increment_teacher_substitution(
    State(state): State<AppState>,
    Path(teacher_id): Path<String>,
) -> ApiResult<()> {
    quota::increment_substitution(&state.repo, &teacher_id).await;

    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    success((), revision_id)
}

/// GET /api/recommendation - Teacher with the most free hours left this week.
///
/// "Nobody available" is a regular answer with `available: false`.
pub async fn get_recommended_teacher(
    State(state): State<AppState>,
) -> ApiResult<Recommendation> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = quota::recommend(&state.repo).await;
    written(&state, result, revision_id).await
}
