use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;

/// In-memory rate-limiting counters.
///
/// Owned by [`SafetyPolicy`](super::SafetyPolicy) and threaded through it
/// explicitly — there is no ambient singleton. The daily counter and the
/// dedup set survive restarts via [`SafetyStateStore`](super::SafetyStateStore);
/// the hourly window and the last-comment instant are process-lifetime only.
#[derive(Debug, Clone)]
pub struct SafetyCounters {
    pub comments_today: u32,
    /// Date the daily counter last reset. Compared against "today" at every
    /// check; the counter never resets on a timer.
    pub last_reset_date: NaiveDate,
    /// Post ids already commented on. Authoritative: an id in here is never
    /// re-attempted regardless of the other counters.
    pub commented_posts: HashSet<String>,
    /// Timestamps of comments in the trailing hour, pruned lazily before
    /// every limit check.
    pub hourly_comments: Vec<DateTime<Utc>>,
    pub consecutive_errors: u32,
    pub last_comment_at: Option<DateTime<Utc>>,
}

impl SafetyCounters {
    /// Zero-valued counters dated `today`.
    #[must_use]
    pub fn fresh(today: NaiveDate) -> Self {
        Self {
            comments_today: 0,
            last_reset_date: today,
            commented_posts: HashSet::new(),
            hourly_comments: Vec::new(),
            consecutive_errors: 0,
            last_comment_at: None,
        }
    }
}
