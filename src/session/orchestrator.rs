use super::report::SessionReport;
use crate::client::{GroupClient, Post};
use crate::config::Config;
use crate::retry::RetryPolicy;
use crate::safety::SafetyPolicy;
use anyhow::{Context, Result};
use chrono::Utc;
use rand::Rng;
use tokio::time::{Duration, sleep};

/// Pause after an unexpected per-post fault before moving on.
const FAULT_COOLDOWN_SECS: u64 = 5;

enum StepControl {
    Continue,
    Stop,
}

/// Drives one commenting session.
///
/// The orchestrator is the only component that talks to the browser
/// collaborator. Per post it consults the safety policy, attempts the
/// comment under the retry policy, records the outcome, and decides
/// whether the session should end early. Failures are contained at the
/// per-post boundary; only login/navigation/scrape failures end the run.
pub struct SessionOrchestrator {
    config: Config,
    policy: SafetyPolicy,
    retry: RetryPolicy,
}

impl SessionOrchestrator {
    #[must_use]
    pub fn new(config: Config, policy: SafetyPolicy, retry: RetryPolicy) -> Self {
        Self {
            config,
            policy,
            retry,
        }
    }

    pub async fn run(&mut self, client: &dyn GroupClient) -> Result<SessionReport> {
        let now = Utc::now();
        let status = self.policy.status(now);
        tracing::info!("safety status: {status}");

        if let Some(reason) = self.policy.should_take_break(now) {
            tracing::warn!("not starting a session: {reason}");
            return Ok(SessionReport::default());
        }

        if !client.login().await.context("login")? {
            anyhow::bail!("login failed");
        }
        tracing::info!("logged in via {}", client.name());

        if !client.navigate_to_group().await.context("navigate to group")? {
            anyhow::bail!("could not open the group feed");
        }
        tracing::info!("opened group feed: {}", self.config.group_url);

        let posts = client
            .scrape_recent_posts(self.config.max_posts)
            .await
            .context("scrape recent posts")?;
        if posts.is_empty() {
            tracing::info!("no posts found to process");
            return Ok(SessionReport::default());
        }

        // Pre-filter. Posts denied here are dropped before the loop and do
        // not count into the session tallies.
        let mut candidates = Vec::new();
        for post in posts {
            match self.policy.can_comment(&post.post_id, Utc::now()) {
                Ok(()) => candidates.push(post),
                Err(denied) => {
                    tracing::info!("skipping post by {}: {denied}", post.author_name);
                }
            }
        }
        if candidates.is_empty() {
            tracing::info!("no posts available for commenting after safety checks");
            return Ok(SessionReport::default());
        }
        tracing::info!("{} posts ready for commenting", candidates.len());

        let mut report = SessionReport {
            total_posts: candidates.len(),
            ..SessionReport::default()
        };

        for (index, post) in candidates.iter().enumerate() {
            tracing::info!(
                "processing post {}/{} by {}",
                index + 1,
                report.total_posts,
                post.author_name
            );
            match self.process_post(client, post, &mut report).await {
                Ok(StepControl::Continue) => {}
                Ok(StepControl::Stop) => break,
                Err(e) => {
                    // A single post must never abort the session.
                    tracing::error!("unexpected error processing post {}: {e:#}", post.post_id);
                    report.failed += 1;
                    sleep(Duration::from_secs(FAULT_COOLDOWN_SECS)).await;
                }
            }
        }

        let status = self.policy.status(Utc::now());
        tracing::info!("session finished: {report}; {status}");
        Ok(report)
    }

    async fn process_post(
        &mut self,
        client: &dyn GroupClient,
        post: &Post,
        report: &mut SessionReport,
    ) -> Result<StepControl> {
        if let Err(denied) = self.policy.can_comment(&post.post_id, Utc::now()) {
            tracing::info!("safety check failed for post {}: {denied}", post.post_id);
            report.skipped += 1;
            return Ok(StepControl::Continue);
        }

        let message = self.pick_message().context("select admin message")?;
        let success = self.attempt_with_retry(client, post, &message).await;
        self.policy.record_comment(&post.post_id, Utc::now(), success);

        if success {
            report.successful += 1;
            tracing::info!("commented on post by {}", post.author_name);
        } else {
            report.failed += 1;
            tracing::warn!("failed to comment on post by {}", post.author_name);
        }

        if let Some(reason) = self.policy.should_take_break(Utc::now()) {
            tracing::warn!("stopping session for safety: {reason}");
            report.safety_stops += 1;
            return Ok(StepControl::Stop);
        }

        let delay = self
            .policy
            .recommended_delay(self.config.comment_delay_secs as f64);
        tracing::info!("waiting {delay:.1}s before next comment");
        sleep(Duration::from_secs_f64(delay)).await;
        Ok(StepControl::Continue)
    }

    /// Attempt the comment under the retry policy. Transport errors are
    /// classified and retried with backoff up to the attempt cap; a plain
    /// `false` from the client is a failure with no retry.
    async fn attempt_with_retry(
        &self,
        client: &dyn GroupClient,
        post: &Post,
        message: &str,
    ) -> bool {
        for attempt in 1..=self.retry.max_attempts() {
            match client.post_comment(post, message).await {
                Ok(submitted) => return submitted,
                Err(e) => {
                    tracing::warn!("comment attempt {attempt} on {} failed: {e}", post.post_id);
                    if !self.retry.handle(&e.to_string(), attempt).await {
                        return false;
                    }
                }
            }
        }
        false
    }

    fn pick_message(&self) -> Option<String> {
        let messages = &self.config.admin_messages;
        if messages.is_empty() {
            return None;
        }
        let index = rand::rng().random_range(0..messages.len());
        Some(messages[index].clone())
    }

    /// Flush counters to durable storage. Called by the top-level
    /// interrupt handler so an aborted run still persists its state.
    pub fn persist(&self) {
        self.policy.persist();
    }
}
