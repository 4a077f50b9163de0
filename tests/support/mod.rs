use async_trait::async_trait;
use groupwarden::client::{GroupClient, Post};
use groupwarden::config::{Config, SafetyLimits};
use groupwarden::error::ClientError;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// One scripted response of [`ScriptedClient::post_comment`].
#[derive(Debug, Clone)]
pub enum Attempt {
    /// The page accepted (`true`) or silently dropped (`false`) the comment.
    Submit(bool),
    /// A transport error with the given description.
    Transport(String),
}

pub fn post(id: &str) -> Post {
    Post {
        post_id: id.to_string(),
        author_name: format!("author-{id}"),
        content: format!("content of {id}"),
        timestamp_label: "2h".to_string(),
        already_commented_hint: false,
    }
}

/// Test double for the browser collaborator.
///
/// Scripted per post id: each `post_comment` call pops the next attempt
/// outcome; once a script is exhausted (or absent) the call succeeds.
pub struct ScriptedClient {
    posts: Vec<Post>,
    scripts: Mutex<HashMap<String, VecDeque<Attempt>>>,
    attempts: Mutex<HashMap<String, u32>>,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedClient {
    pub fn new(posts: Vec<Post>) -> Self {
        Self {
            posts,
            scripts: Mutex::new(HashMap::new()),
            attempts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn script(self, post_id: &str, attempts: Vec<Attempt>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(post_id.to_string(), attempts.into());
        self
    }

    pub fn attempts_for(&self, post_id: &str) -> u32 {
        self.attempts
            .lock()
            .unwrap()
            .get(post_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GroupClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn login(&self) -> Result<bool, ClientError> {
        self.calls.lock().unwrap().push("login");
        Ok(true)
    }

    async fn navigate_to_group(&self) -> Result<bool, ClientError> {
        self.calls.lock().unwrap().push("navigate");
        Ok(true)
    }

    async fn scrape_recent_posts(&self, limit: usize) -> Result<Vec<Post>, ClientError> {
        self.calls.lock().unwrap().push("scrape");
        Ok(self.posts.iter().take(limit).cloned().collect())
    }

    async fn post_comment(&self, post: &Post, _message: &str) -> Result<bool, ClientError> {
        *self
            .attempts
            .lock()
            .unwrap()
            .entry(post.post_id.clone())
            .or_default() += 1;

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&post.post_id)
            .and_then(VecDeque::pop_front);
        match next {
            None | Some(Attempt::Submit(true)) => Ok(true),
            Some(Attempt::Submit(false)) => Ok(false),
            Some(Attempt::Transport(message)) => Err(ClientError::Http(message)),
        }
    }
}

/// Config pointing at a temp state dir, with spacing disabled so paused-time
/// tests can process several posts back to back.
pub fn test_config(state_dir: &std::path::Path) -> Config {
    let state = state_dir.display().to_string();
    let mut config = Config::from_lookup(move |key| match key {
        "GROUPWARDEN_EMAIL" => Some("admin@example.com".to_string()),
        "GROUPWARDEN_PASSWORD" => Some("hunter2".to_string()),
        "GROUPWARDEN_GROUP_ID" => Some("12345".to_string()),
        "GROUPWARDEN_MESSAGES" => Some("Welcome!,Thanks for sharing".to_string()),
        "GROUPWARDEN_STATE_DIR" => Some(state.clone()),
        _ => None,
    })
    .unwrap();
    config.limits = SafetyLimits {
        min_seconds_between_comments: 0,
        ..SafetyLimits::default()
    };
    config
}
