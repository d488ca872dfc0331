use chrono::{DateTime, Utc};

const DAYS_PER_WEEK: i64 = 7;
// Approximations, not calendar-accurate
const DAYS_PER_MONTH: i64 = 30;
const DAYS_PER_YEAR: i64 = 365;

/// Whole days elapsed from `published` to `now`, rounded down.
///
/// Timestamps in the future count as zero days.
pub fn days_since(published: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - published).num_days().max(0)
}

/// Maps a whole-day difference onto the human-relative bucket text.
///
/// | days      | text                        |
/// |-----------|-----------------------------|
/// | 0         | `Today`                     |
/// | 1         | `1 day ago`                 |
/// | 2..=6     | `N days ago`                |
/// | 7..=29    | `1 week ago` / `N weeks ago`   |
/// | 30..=364  | `1 month ago` / `N months ago` |
/// | 365..     | `1 year ago` / `N years ago`   |
pub fn relative_time_text(days: i64) -> String {
    match days {
        i64::MIN..=0 => "Today".to_string(),
        1 => "1 day ago".to_string(),
        2..=6 => format!("{} days ago", days),
        7..=29 => plural(days / DAYS_PER_WEEK, "week"),
        30..=364 => plural(days / DAYS_PER_MONTH, "month"),
        _ => plural(days / DAYS_PER_YEAR, "year"),
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}
