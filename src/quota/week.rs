//! ISO week keys used to stamp weekly counters.

use chrono::{Datelike, NaiveDate, Utc};

/// Format the ISO week containing `date` as `YYYY-Www`.
///
/// The year is the ISO week-based year, which differs from the calendar year
/// around January 1st.
pub fn week_key(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{:04}-W{:02}", iso.year(), iso.week())
}

/// Key of the ISO week we are in right now (UTC).
pub fn current_week() -> String {
    week_key(Utc::now().date_naive())
}
