use super::counters::SafetyCounters;
use super::store::SafetyStateStore;
use crate::config::SafetyLimits;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use thiserror::Error;

const HOUR_WINDOW_SECS: i64 = 3600;
/// Break recommendations kick in at 80% of a hard cap.
const BREAK_LOAD_FACTOR: f64 = 0.8;
/// Consecutive errors that trigger a break, below the hard cutoff.
const BREAK_ERROR_THRESHOLD: u32 = 3;

// ── Decisions ────────────────────────────────────────────────────

/// Why a comment was denied. Variants are ordered by check precedence:
/// the first failing check wins, so reasons are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommentDenied {
    #[error("already commented on this post")]
    AlreadyDone,

    #[error("daily comment limit reached ({limit})")]
    DailyLimit { limit: u32 },

    #[error("hourly comment limit reached ({limit})")]
    HourlyLimit { limit: u32 },

    #[error("must wait {wait_secs}s before next comment")]
    TooSoon { wait_secs: u64 },

    #[error("too many consecutive errors ({count})")]
    TooManyErrors { count: u32 },
}

/// Risk signal that ends a session early. A break is a graceful stop,
/// not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakReason {
    ApproachingDailyLimit,
    HighHourlyActivity,
    RepeatedErrors,
}

impl std::fmt::Display for BreakReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApproachingDailyLimit => write!(f, "approaching daily comment limit"),
            Self::HighHourlyActivity => write!(f, "high activity in the past hour"),
            Self::RepeatedErrors => write!(f, "multiple consecutive errors"),
        }
    }
}

/// Point-in-time snapshot of counters and configured limits.
#[derive(Debug, Clone)]
pub struct SafetyStatus {
    pub comments_today: u32,
    pub daily_limit: u32,
    pub comments_this_hour: usize,
    pub hourly_limit: u32,
    pub consecutive_errors: u32,
    pub max_consecutive_errors: u32,
    pub total_commented_posts: usize,
    pub last_comment_at: Option<DateTime<Utc>>,
}

impl std::fmt::Display for SafetyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "daily {}/{}, hourly {}/{}, errors {}/{}, total commented posts {}",
            self.comments_today,
            self.daily_limit,
            self.comments_this_hour,
            self.hourly_limit,
            self.consecutive_errors,
            self.max_consecutive_errors,
            self.total_commented_posts,
        )
    }
}

// ── Policy ───────────────────────────────────────────────────────

/// Pure decision logic over the rate-limiting counters.
///
/// Every operation takes `now` explicitly; the policy never reads the
/// clock, which keeps limit arithmetic testable without wall-clock
/// control. Mutating operations persist through the store afterwards;
/// persistence failures are logged and swallowed.
pub struct SafetyPolicy {
    limits: SafetyLimits,
    counters: SafetyCounters,
    store: SafetyStateStore,
}

impl SafetyPolicy {
    /// Build a policy seeded from the persisted record.
    #[must_use]
    pub fn load(limits: SafetyLimits, store: SafetyStateStore, now: DateTime<Utc>) -> Self {
        let counters = store.load(now.date_naive());
        Self {
            limits,
            counters,
            store,
        }
    }

    /// Reset the daily counters when the calendar date has rolled over.
    /// Idempotent within a date; called at the start of every check.
    pub fn maybe_reset_daily(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if self.counters.last_reset_date != today {
            tracing::info!("new day detected - resetting daily counters");
            self.counters.comments_today = 0;
            self.counters.consecutive_errors = 0;
            self.counters.last_reset_date = today;
            self.persist();
        }
    }

    /// Check whether commenting on `post_id` is currently allowed.
    ///
    /// Checks run in a fixed precedence order: dedup, daily cap, hourly
    /// cap (after pruning the trailing-hour window), minimum spacing,
    /// consecutive-error cutoff.
    pub fn can_comment(
        &mut self,
        post_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), CommentDenied> {
        self.maybe_reset_daily(now);

        if self.counters.commented_posts.contains(post_id) {
            return Err(CommentDenied::AlreadyDone);
        }

        if self.counters.comments_today >= self.limits.max_comments_per_day {
            return Err(CommentDenied::DailyLimit {
                limit: self.limits.max_comments_per_day,
            });
        }

        self.prune_hour_window(now);
        if self.counters.hourly_comments.len() >= self.limits.max_comments_per_hour as usize {
            return Err(CommentDenied::HourlyLimit {
                limit: self.limits.max_comments_per_hour,
            });
        }

        if let Some(last) = self.counters.last_comment_at {
            let elapsed = now.signed_duration_since(last).num_seconds();
            let min = i64::try_from(self.limits.min_seconds_between_comments).unwrap_or(i64::MAX);
            if elapsed < min {
                return Err(CommentDenied::TooSoon {
                    wait_secs: u64::try_from(min - elapsed).unwrap_or(0),
                });
            }
        }

        if self.counters.consecutive_errors >= self.limits.max_consecutive_errors {
            return Err(CommentDenied::TooManyErrors {
                count: self.counters.consecutive_errors,
            });
        }

        Ok(())
    }

    /// Record the outcome of a comment attempt and persist.
    pub fn record_comment(&mut self, post_id: &str, now: DateTime<Utc>, success: bool) {
        if success {
            self.counters.comments_today += 1;
            self.counters.commented_posts.insert(post_id.to_string());
            self.counters.hourly_comments.push(now);
            self.counters.last_comment_at = Some(now);
            self.counters.consecutive_errors = 0;
            tracing::info!(
                "comment recorded - daily {}/{}, hourly {}/{}",
                self.counters.comments_today,
                self.limits.max_comments_per_day,
                self.counters.hourly_comments.len(),
                self.limits.max_comments_per_hour,
            );
        } else {
            self.counters.consecutive_errors += 1;
            tracing::warn!(
                "comment failed - consecutive errors: {}",
                self.counters.consecutive_errors
            );
        }
        self.persist();
    }

    /// Delay to sleep before the next action, in seconds.
    ///
    /// Trailing-hour volume scales the base: more than 8 recent comments
    /// doubles it, more than 5 multiplies by 1.5. A uniform jitter in
    /// [0.8, 1.2] keeps the cadence from looking mechanical.
    #[must_use]
    pub fn recommended_delay(&self, base_secs: f64) -> f64 {
        let recent = self.counters.hourly_comments.len();
        let multiplier = if recent > 8 {
            2.0
        } else if recent > 5 {
            1.5
        } else {
            1.0
        };
        let jitter = rand::rng().random_range(0.8..=1.2);
        base_secs * multiplier * jitter
    }

    /// Whether elevated risk signals warrant ending the session early.
    pub fn should_take_break(&mut self, now: DateTime<Utc>) -> Option<BreakReason> {
        self.prune_hour_window(now);

        if f64::from(self.counters.comments_today)
            >= f64::from(self.limits.max_comments_per_day) * BREAK_LOAD_FACTOR
        {
            return Some(BreakReason::ApproachingDailyLimit);
        }

        if self.counters.hourly_comments.len() as f64
            >= f64::from(self.limits.max_comments_per_hour) * BREAK_LOAD_FACTOR
        {
            return Some(BreakReason::HighHourlyActivity);
        }

        if self.counters.consecutive_errors >= BREAK_ERROR_THRESHOLD {
            return Some(BreakReason::RepeatedErrors);
        }

        None
    }

    /// Snapshot of counters and limits after daily reset and window prune.
    pub fn status(&mut self, now: DateTime<Utc>) -> SafetyStatus {
        self.maybe_reset_daily(now);
        self.prune_hour_window(now);

        SafetyStatus {
            comments_today: self.counters.comments_today,
            daily_limit: self.limits.max_comments_per_day,
            comments_this_hour: self.counters.hourly_comments.len(),
            hourly_limit: self.limits.max_comments_per_hour,
            consecutive_errors: self.counters.consecutive_errors,
            max_consecutive_errors: self.limits.max_consecutive_errors,
            total_commented_posts: self.counters.commented_posts.len(),
            last_comment_at: self.counters.last_comment_at,
        }
    }

    /// Write the counters through to durable storage, logging on failure.
    pub fn persist(&self) {
        if let Err(e) = self.store.save(&self.counters) {
            tracing::warn!("could not save safety state: {e}");
        }
    }

    fn prune_hour_window(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::seconds(HOUR_WINDOW_SECS);
        self.counters.hourly_comments.retain(|ts| *ts > cutoff);
    }
}
