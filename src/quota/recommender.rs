//! Picks the substitute with the most free hours left this week.

use crate::models::TeacherQuota;

/// Rank teachers that can still take a substitution in `week`.
///
/// Teachers without remaining capacity are dropped, so a teacher with
/// `weekly_free_hours == 0` never appears. The rest are ordered by remaining
/// hours, most first; equal capacity falls back to the lowest teacher id.
pub fn rank_candidates<'a>(quotas: &'a [TeacherQuota], week: &str) -> Vec<&'a TeacherQuota> {
    let mut candidates: Vec<&TeacherQuota> = quotas
        .iter()
        .filter(|quota| quota.remaining_in(week) > 0)
        .collect();

    candidates.sort_by(|a, b| {
        b.remaining_in(week)
            .cmp(&a.remaining_in(week))
            .then_with(|| a.teacher_id.cmp(&b.teacher_id))
    });

    candidates
}

/// Best candidate for a new substitution, or `None` when nobody has capacity.
pub fn select_candidate<'a>(quotas: &'a [TeacherQuota], week: &str) -> Option<&'a TeacherQuota> {
    rank_candidates(quotas, week).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEEK: &str = "2024-W11";

    fn quota(id: &str, free: i64, used: i64, week: &str) -> TeacherQuota {
        TeacherQuota {
            teacher_id: id.to_string(),
            first_name: format!("Name {}", id),
            last_name: format!("Surname {}", id),
            weekly_free_hours: free,
            substitutions_this_week: used,
            last_reset_week: week.to_string(),
        }
    }

    #[test]
    fn test_most_remaining_capacity_wins() {
        let quotas = vec![quota("b", 3, 0, WEEK), quota("a", 5, 1, WEEK)];

        let picked = select_candidate(&quotas, WEEK).unwrap();
        assert_eq!(picked.teacher_id, "a");
    }

    #[test]
    fn test_full_teachers_are_never_picked() {
        let quotas = vec![
            quota("a", 3, 3, WEEK),
            quota("b", 2, 4, WEEK),
            quota("c", 0, 0, WEEK),
        ];

        assert!(select_candidate(&quotas, WEEK).is_none());
        assert!(rank_candidates(&quotas, WEEK).is_empty());
    }

    #[test]
    fn test_empty_input_yields_no_candidate() {
        assert!(select_candidate(&[], WEEK).is_none());
    }

    #[test]
    fn test_ties_break_on_lowest_id() {
        let quotas = vec![
            quota("c", 4, 2, WEEK),
            quota("a", 2, 0, WEEK),
            quota("b", 3, 1, WEEK),
        ];

        let ranked: Vec<&str> = rank_candidates(&quotas, WEEK)
            .iter()
            .map(|q| q.teacher_id.as_str())
            .collect();
        assert_eq!(ranked, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_last_free_hour_is_still_offered() {
        let quotas = vec![quota("a", 3, 2, WEEK)];
        assert_eq!(select_candidate(&quotas, WEEK).unwrap().teacher_id, "a");

        let quotas = vec![quota("a", 3, 3, WEEK)];
        assert!(select_candidate(&quotas, WEEK).is_none());
    }

    #[test]
    fn test_stale_counter_does_not_count_against_new_week() {
        let quotas = vec![quota("a", 3, 3, "2024-W10"), quota("b", 2, 0, WEEK)];

        let picked = select_candidate(&quotas, WEEK).unwrap();
        assert_eq!(picked.teacher_id, "a");
        assert_eq!(picked.remaining_in(WEEK), 3);
    }
}
