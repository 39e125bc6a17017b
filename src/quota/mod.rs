//! Weekly substitution quotas.
//!
//! Every teacher may cover `weekly_free_hours` substitutions per ISO week.
//! Counters are stamped with the week they belong to; a counter from an older
//! week is zeroed by [`ensure_current_week`], which is idempotent and safe to
//! call from any request path, the admin endpoint or the background task.

mod recommender;
mod week;

pub use recommender::*;
pub use week::*;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{Recommendation, RecommendedTeacher, WeeklyResetSummary};

/// Reset every counter that was not stamped with the current week.
pub async fn ensure_current_week(repo: &Repository) -> Result<WeeklyResetSummary, AppError> {
    reset_for_week(repo, &current_week()).await
}

/// Reset every counter that was not stamped with `week`.
pub async fn reset_for_week(repo: &Repository, week: &str) -> Result<WeeklyResetSummary, AppError> {
    let reset_count = repo.reset_weekly_counters(week).await?;
    if reset_count > 0 {
        tracing::info!("Reset {} weekly counters for {}", reset_count, week);
    }

    Ok(WeeklyResetSummary {
        week: week.to_string(),
        reset_count,
    })
}

/// Count one more substitution for `teacher_id` in the current week.
///
/// Failures are logged and swallowed so they never block the flow that
/// triggered the increment.
pub async fn increment_substitution(repo: &Repository, teacher_id: &str) {
    increment_for_week(repo, teacher_id, &current_week()).await
}

/// Count one more substitution for `teacher_id` in `week`.
pub async fn increment_for_week(repo: &Repository, teacher_id: &str, week: &str) {
    match repo.increment_substitution(teacher_id, week).await {
        Ok(true) => tracing::debug!("Incremented weekly counter of teacher {}", teacher_id),
        Ok(false) => tracing::warn!(
            "Cannot increment weekly counter: teacher {} not found",
            teacher_id
        ),
        Err(e) => tracing::warn!(
            "Failed to increment weekly counter of teacher {}: {}",
            teacher_id,
            e
        ),
    }
}

/// Recommend a substitute for the current week.
pub async fn recommend(repo: &Repository) -> Result<Recommendation, AppError> {
    recommend_for_week(repo, &current_week()).await
}

/// Bring counters up to `week`, then pick the eligible teacher with the most
/// remaining capacity.
pub async fn recommend_for_week(repo: &Repository, week: &str) -> Result<Recommendation, AppError> {
    reset_for_week(repo, week).await?;

    let quotas = repo.list_eligible_quotas().await?;
    let teacher = select_candidate(&quotas, week).map(|quota| RecommendedTeacher {
        remaining: quota.remaining_in(week),
        quota: quota.clone(),
    });

    match &teacher {
        Some(t) => tracing::debug!(
            "Recommended teacher {} with {} free hours left in {}",
            t.quota.teacher_id,
            t.remaining,
            week
        ),
        None => tracing::info!(
            "No teacher available in {} ({} eligible)",
            week,
            quotas.len()
        ),
    }

    Ok(Recommendation {
        week: week.to_string(),
        available: teacher.is_some(),
        teacher,
    })
}

/// Run [`ensure_current_week`] every `interval_secs` seconds.
///
/// Returns `None` when the interval is 0.
pub fn spawn_weekly_reset(repo: Arc<Repository>, interval_secs: u64) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        tracing::info!("Background weekly reset disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            if let Err(e) = ensure_current_week(&repo).await {
                tracing::warn!("Background weekly reset failed: {}", e);
            }
        }
    }))
}
