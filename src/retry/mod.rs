use tokio::time::{Duration, sleep};

/// Progressive backoff schedule, indexed by 1-based attempt number.
const BACKOFF_SECS: [u64; 5] = [5, 10, 20, 30, 60];

/// Default attempt cap applied by the orchestrator. The effective bound is
/// the shorter of this cap and the backoff table.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Error phrases after which retrying is pointless or unsafe.
const FATAL_MARKERS: [&str; 5] = [
    "invalid session",
    "account suspended",
    "rate limit exceeded",
    "blocked",
    "login required",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Abort the retry loop for this operation immediately.
    Fatal,
    /// Plausibly resolved by waiting and retrying.
    Transient,
}

/// Classify a failure by case-insensitive substring match against the
/// fatal phrase list. Anything unrecognized is treated as transient.
#[must_use]
pub fn classify(description: &str) -> Severity {
    let lowered = description.to_lowercase();
    if FATAL_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        Severity::Fatal
    } else {
        Severity::Transient
    }
}

/// Retry decision logic with a blocking backoff wait.
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decide whether `attempt` (1-based) should be retried.
    ///
    /// Fatal errors return `false` immediately. Transient errors within the
    /// backoff table sleep the scheduled delay before returning `true` —
    /// the caller is suspended for the wait as part of this call. Attempts
    /// past the table return `false`.
    pub async fn handle(&self, description: &str, attempt: u32) -> bool {
        if classify(description) == Severity::Fatal {
            tracing::error!("fatal error, not retrying: {description}");
            return false;
        }

        let index = attempt.saturating_sub(1) as usize;
        if attempt == 0 || index >= BACKOFF_SECS.len() {
            tracing::error!("max retries exceeded: {description}");
            return false;
        }

        let delay = BACKOFF_SECS[index];
        tracing::warn!("transient error (attempt {attempt}): {description}; retrying in {delay}s");
        sleep(Duration::from_secs(delay)).await;
        true
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}
