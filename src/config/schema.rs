use crate::error::ConfigError;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ── Environment keys ─────────────────────────────────────────────

const ENV_EMAIL: &str = "GROUPWARDEN_EMAIL";
const ENV_PASSWORD: &str = "GROUPWARDEN_PASSWORD";
const ENV_GROUP_ID: &str = "GROUPWARDEN_GROUP_ID";
const ENV_GROUP_URL: &str = "GROUPWARDEN_GROUP_URL";
const ENV_LOGIN_URL: &str = "GROUPWARDEN_LOGIN_URL";
const ENV_MAX_POSTS: &str = "GROUPWARDEN_MAX_POSTS";
const ENV_ACTION_DELAY: &str = "GROUPWARDEN_ACTION_DELAY_SECS";
const ENV_COMMENT_DELAY: &str = "GROUPWARDEN_COMMENT_DELAY_SECS";
const ENV_MESSAGES: &str = "GROUPWARDEN_MESSAGES";
const ENV_HEADLESS: &str = "GROUPWARDEN_HEADLESS";
const ENV_TIMEOUT: &str = "GROUPWARDEN_TIMEOUT_SECS";
const ENV_WEBDRIVER_URL: &str = "GROUPWARDEN_WEBDRIVER_URL";
const ENV_STATE_DIR: &str = "GROUPWARDEN_STATE_DIR";

// ── Top-level config ─────────────────────────────────────────────

/// Runtime configuration, read from `GROUPWARDEN_*` environment variables.
///
/// Credentials are required; everything else carries a default. Call
/// [`validate`](Self::validate) before starting a session.
#[derive(Debug, Clone)]
pub struct Config {
    pub email: String,
    pub password: String,
    pub group_id: String,
    /// Resolved feed URL — explicit `GROUPWARDEN_GROUP_URL`, or derived
    /// from `GROUPWARDEN_GROUP_ID`.
    pub group_url: String,
    pub login_url: String,
    /// Upper bound on posts scraped per session.
    pub max_posts: usize,
    /// Pause between individual browser actions (scroll, click, type).
    pub action_delay_secs: u64,
    /// Base pause between two comment submissions.
    pub comment_delay_secs: u64,
    /// Candidate comment texts; one is picked per post.
    pub admin_messages: Vec<String>,
    pub headless: bool,
    /// Per-request timeout for the WebDriver transport.
    pub timeout_secs: u64,
    pub webdriver_url: String,
    /// Directory holding the persisted safety record.
    pub state_dir: PathBuf,
    pub limits: SafetyLimits,
}

// ── Safety limits ────────────────────────────────────────────────

/// Hard caps enforced by the safety policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SafetyLimits {
    #[serde(default = "default_max_comments_per_day")]
    pub max_comments_per_day: u32,
    #[serde(default = "default_max_comments_per_hour")]
    pub max_comments_per_hour: u32,
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
    #[serde(default = "default_min_seconds_between_comments")]
    pub min_seconds_between_comments: u64,
}

fn default_max_comments_per_day() -> u32 {
    50
}

fn default_max_comments_per_hour() -> u32 {
    10
}

fn default_max_consecutive_errors() -> u32 {
    5
}

fn default_min_seconds_between_comments() -> u64 {
    30
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            max_comments_per_day: default_max_comments_per_day(),
            max_comments_per_hour: default_max_comments_per_hour(),
            max_consecutive_errors: default_max_consecutive_errors(),
            min_seconds_between_comments: default_min_seconds_between_comments(),
        }
    }
}

// ── Defaults ─────────────────────────────────────────────────────

fn default_login_url() -> String {
    "https://www.facebook.com/login".into()
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".into()
}

fn default_messages() -> String {
    "Thanks for sharing this with the group!".into()
}

fn default_state_dir() -> PathBuf {
    UserDirs::new().map_or_else(
        || PathBuf::from(".groupwarden"),
        |dirs| dirs.home_dir().join(".groupwarden"),
    )
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// The indirection keeps config parsing testable without mutating the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let group_id = lookup(ENV_GROUP_ID).unwrap_or_default();
        let group_url = match lookup(ENV_GROUP_URL) {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ if !group_id.is_empty() => {
                format!("https://www.facebook.com/groups/{group_id}")
            }
            _ => String::new(),
        };

        Ok(Self {
            email: lookup(ENV_EMAIL).unwrap_or_default(),
            password: lookup(ENV_PASSWORD).unwrap_or_default(),
            group_id,
            group_url,
            login_url: lookup(ENV_LOGIN_URL).unwrap_or_else(default_login_url),
            max_posts: parse_num(ENV_MAX_POSTS, lookup(ENV_MAX_POSTS), 10)?,
            action_delay_secs: parse_num(ENV_ACTION_DELAY, lookup(ENV_ACTION_DELAY), 3)?,
            comment_delay_secs: parse_num(ENV_COMMENT_DELAY, lookup(ENV_COMMENT_DELAY), 30)?,
            admin_messages: split_messages(&lookup(ENV_MESSAGES).unwrap_or_else(default_messages)),
            headless: parse_bool(&lookup(ENV_HEADLESS).unwrap_or_default()),
            timeout_secs: parse_num(ENV_TIMEOUT, lookup(ENV_TIMEOUT), 30)?,
            webdriver_url: lookup(ENV_WEBDRIVER_URL).unwrap_or_else(default_webdriver_url),
            state_dir: lookup(ENV_STATE_DIR).map_or_else(default_state_dir, PathBuf::from),
            limits: SafetyLimits::default(),
        })
    }

    /// Validate required settings. Returns the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.email.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{ENV_EMAIL} is required")));
        }
        if self.password.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{ENV_PASSWORD} is required"
            )));
        }
        if self.group_url.is_empty() {
            return Err(ConfigError::Validation(format!(
                "either {ENV_GROUP_ID} or {ENV_GROUP_URL} is required"
            )));
        }
        if self.admin_messages.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{ENV_MESSAGES} must contain at least one message"
            )));
        }
        if self.max_posts == 0 {
            return Err(ConfigError::Validation(format!(
                "{ENV_MAX_POSTS} must be >= 1"
            )));
        }
        Ok(())
    }

    /// Path of the persisted safety record.
    #[must_use]
    pub fn state_file(&self) -> PathBuf {
        self.state_dir.join("safety_state.json")
    }
}

fn split_messages(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1")
}

fn parse_num<T: std::str::FromStr>(
    key: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Parse {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn minimal_env() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENV_EMAIL, "admin@example.com"),
            (ENV_PASSWORD, "hunter2"),
            (ENV_GROUP_ID, "12345"),
        ]
    }

    #[test]
    fn defaults_apply_when_keys_absent() {
        let config = Config::from_lookup(lookup_from(&minimal_env())).unwrap();
        assert_eq!(config.max_posts, 10);
        assert_eq!(config.action_delay_secs, 3);
        assert_eq!(config.comment_delay_secs, 30);
        assert_eq!(config.timeout_secs, 30);
        assert!(!config.headless);
        assert_eq!(config.webdriver_url, "http://localhost:9515");
        assert_eq!(config.admin_messages.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn group_url_derived_from_id() {
        let config = Config::from_lookup(lookup_from(&minimal_env())).unwrap();
        assert_eq!(config.group_url, "https://www.facebook.com/groups/12345");
    }

    #[test]
    fn explicit_group_url_wins_over_id() {
        let mut env = minimal_env();
        env.push((ENV_GROUP_URL, "https://example.com/groups/mine"));
        let config = Config::from_lookup(lookup_from(&env)).unwrap();
        assert_eq!(config.group_url, "https://example.com/groups/mine");
    }

    #[test]
    fn missing_credentials_fail_validation() {
        let config = Config::from_lookup(lookup_from(&[(ENV_GROUP_ID, "12345")])).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains(ENV_EMAIL));
    }

    #[test]
    fn missing_group_fails_validation() {
        let config = Config::from_lookup(lookup_from(&[
            (ENV_EMAIL, "admin@example.com"),
            (ENV_PASSWORD, "hunter2"),
        ]))
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains(ENV_GROUP_ID));
    }

    #[test]
    fn messages_are_split_and_trimmed() {
        let mut env = minimal_env();
        env.push((ENV_MESSAGES, "Welcome!, Great post , ,Thanks"));
        let config = Config::from_lookup(lookup_from(&env)).unwrap();
        assert_eq!(config.admin_messages, vec!["Welcome!", "Great post", "Thanks"]);
    }

    #[test]
    fn empty_message_list_fails_validation() {
        let mut env = minimal_env();
        env.push((ENV_MESSAGES, " , ,"));
        let config = Config::from_lookup(lookup_from(&env)).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_numeric_value_is_a_parse_error() {
        let mut env = minimal_env();
        env.push((ENV_MAX_POSTS, "lots"));
        let err = Config::from_lookup(lookup_from(&env)).unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_POSTS));
    }

    #[test]
    fn headless_accepts_true_and_one() {
        for raw in ["true", "TRUE", "1"] {
            let mut env = minimal_env();
            env.push((ENV_HEADLESS, raw));
            let config = Config::from_lookup(lookup_from(&env)).unwrap();
            assert!(config.headless, "{raw} should enable headless");
        }
        let config = Config::from_lookup(lookup_from(&minimal_env())).unwrap();
        assert!(!config.headless);
    }

    #[test]
    fn safety_limits_defaults() {
        let limits = SafetyLimits::default();
        assert_eq!(limits.max_comments_per_day, 50);
        assert_eq!(limits.max_comments_per_hour, 10);
        assert_eq!(limits.max_consecutive_errors, 5);
        assert_eq!(limits.min_seconds_between_comments, 30);
    }
}
