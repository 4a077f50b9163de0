/// Outcome tallies for one commenting session.
///
/// `total_posts` counts the posts that survived the pre-filter, not the
/// raw scrape. A session always ends by reporting these counts, even when
/// every individual post failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub total_posts: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Early terminations triggered by the safety policy. A safety stop is
    /// a graceful end, not a failure.
    pub safety_stops: usize,
}

impl std::fmt::Display for SessionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "posts {} | successful {} | failed {} | skipped {} | safety stops {}",
            self.total_posts, self.successful, self.failed, self.skipped, self.safety_stops,
        )
    }
}
