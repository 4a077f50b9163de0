use crate::error::ClientError;
use async_trait::async_trait;

/// A post scraped from the group feed.
///
/// `post_id` is unique within a session and across the persisted dedup
/// set. `already_commented_hint` is a best-effort flag detected on the
/// page itself, distinct from (and weaker than) the dedup set.
#[derive(Debug, Clone)]
pub struct Post {
    pub post_id: String,
    pub author_name: String,
    pub content: String,
    pub timestamp_label: String,
    pub already_commented_hint: bool,
}

/// Browser-side collaborator driving the group feed.
///
/// The safety policy and the orchestrator never touch the page directly;
/// everything site-specific sits behind this trait, so the session loop is
/// testable against a scripted double.
#[async_trait]
pub trait GroupClient: Send + Sync {
    /// Human-readable client name for logs.
    fn name(&self) -> &str;

    /// Authenticate the browser session. `Ok(false)` means the credentials
    /// were rejected; transport failures raise [`ClientError`].
    async fn login(&self) -> Result<bool, ClientError>;

    /// Open the configured group feed. `Ok(false)` means the feed did not
    /// render.
    async fn navigate_to_group(&self) -> Result<bool, ClientError>;

    /// Scrape up to `limit` recent posts, newest first as rendered.
    async fn scrape_recent_posts(&self, limit: usize) -> Result<Vec<Post>, ClientError>;

    /// Submit `message` as a comment on `post`. `Ok(false)` means the page
    /// did not accept the comment (no retry is warranted); transport
    /// errors raise [`ClientError`] and go through the retry classifier.
    async fn post_comment(&self, post: &Post, message: &str) -> Result<bool, ClientError>;

    /// Tear down the browser session.
    async fn close(&self) -> Result<(), ClientError> {
        Ok(())
    }
}
