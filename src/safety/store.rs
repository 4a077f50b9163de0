use super::counters::SafetyCounters;
use crate::error::StateError;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

/// On-disk layout of the safety record: one global document per deployment,
/// overwritten wholesale on every save. Absent fields deserialize to their
/// zero values so older records keep loading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SafetyRecord {
    #[serde(default)]
    comments_today: u32,
    #[serde(default)]
    last_reset_date: Option<NaiveDate>,
    #[serde(default)]
    commented_posts: Vec<String>,
    #[serde(default)]
    last_updated: Option<String>,
}

/// Durable storage for [`SafetyCounters`].
///
/// Loading is best-effort: a missing, unreadable, or unparsable record
/// yields fresh zero-valued counters with a warning, never an error. Saving
/// reports failures to the caller, who logs and continues — persistence
/// must never abort a session.
pub struct SafetyStateStore {
    path: PathBuf,
}

impl SafetyStateStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load persisted counters, falling back to fresh ones dated `today`.
    #[must_use]
    pub fn load(&self, today: NaiveDate) -> SafetyCounters {
        let record = match self.read_record() {
            Ok(Some(record)) => record,
            Ok(None) => return SafetyCounters::fresh(today),
            Err(e) => {
                tracing::warn!("could not load safety state: {e}");
                return SafetyCounters::fresh(today);
            }
        };

        SafetyCounters {
            comments_today: record.comments_today,
            last_reset_date: record.last_reset_date.unwrap_or(today),
            commented_posts: record.commented_posts.into_iter().collect::<HashSet<_>>(),
            hourly_comments: Vec::new(),
            consecutive_errors: 0,
            last_comment_at: None,
        }
    }

    /// Overwrite the record with the current counters.
    pub fn save(&self, counters: &SafetyCounters) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut commented_posts: Vec<String> =
            counters.commented_posts.iter().cloned().collect();
        commented_posts.sort();

        let record = SafetyRecord {
            comments_today: counters.comments_today,
            last_reset_date: Some(counters.last_reset_date),
            commented_posts,
            last_updated: Some(Utc::now().to_rfc3339()),
        };
        let json = serde_json::to_vec_pretty(&record)
            .map_err(|e| StateError::Serialize(e.to_string()))?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    fn read_record(&self) -> Result<Option<SafetyRecord>, StateError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let record =
            serde_json::from_str(&raw).map_err(|e| StateError::Serialize(e.to_string()))?;
        Ok(Some(record))
    }
}
