use super::traits::{GroupClient, Post};
use super::webdriver::WebDriver;
use crate::config::Config;
use crate::error::ClientError;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};

// Selector lists, tried in order until one matches. Tightly coupled to the
// site's current markup and expected to need maintenance when it changes.
const LOGIN_EMAIL_SELECTORS: [&str; 2] = ["input[name='email']", "input#email"];
const LOGIN_PASSWORD_SELECTORS: [&str; 2] = ["input[name='pass']", "input[type='password']"];
const LOGIN_SUBMIT_SELECTORS: [&str; 2] = ["button[name='login']", "button[type='submit']"];
const FEED_SELECTORS: [&str; 2] = ["div[role='feed']", "div[data-pagelet='GroupFeed']"];
const POST_SELECTORS: [&str; 3] = [
    "div[role='feed'] div[role='article']",
    "div[role='article']",
    "div[data-pagelet^='FeedUnit']",
];
const AUTHOR_SELECTORS: [&str; 3] = ["h3 a", "strong a", "span[dir='auto'] a"];
const CONTENT_SELECTORS: [&str; 2] = ["div[data-ad-preview='message']", "div[dir='auto']"];
const TIMESTAMP_SELECTORS: [&str; 2] = ["a[aria-label] span", "abbr"];
const COMMENT_BOX_SELECTORS: [&str; 3] = [
    "div[contenteditable='true'][role='textbox']",
    "div[aria-label*='omment'][contenteditable='true']",
    "form div[contenteditable='true']",
];
const COMMENT_SUBMIT_SELECTORS: [&str; 2] = ["button[type='submit']", "div[aria-label='Comment']"];

/// WebDriver "Enter" key code point.
const ENTER_KEY: &str = "\u{e007}";
const MAX_CONTENT_CHARS: usize = 500;
const SCROLL_ROUNDS: usize = 3;

/// [`GroupClient`] implementation driving the group feed through a
/// WebDriver-controlled browser.
pub struct FeedClient {
    driver: WebDriver,
    config: Config,
    /// post id → element handle for the page currently loaded.
    handles: Mutex<HashMap<String, String>>,
}

impl FeedClient {
    /// Open a browser session against the configured driver endpoint.
    pub async fn connect(config: &Config) -> Result<Self, ClientError> {
        let driver = WebDriver::new(&config.webdriver_url, config.timeout_secs)?;
        driver.start_session(config.headless).await?;
        Ok(Self {
            driver,
            config: config.clone(),
            handles: Mutex::new(HashMap::new()),
        })
    }

    async fn action_pause(&self) {
        sleep(Duration::from_secs(self.config.action_delay_secs)).await;
    }

    async fn first_match(&self, selectors: &[&str]) -> Result<Option<String>, ClientError> {
        for selector in selectors {
            if let Some(first) = self.driver.find_elements(selector).await?.into_iter().next() {
                return Ok(Some(first));
            }
        }
        Ok(None)
    }

    async fn first_match_within(
        &self,
        element: &str,
        selectors: &[&str],
    ) -> Result<Option<String>, ClientError> {
        for selector in selectors {
            if let Some(first) = self
                .driver
                .find_elements_within(element, selector)
                .await?
                .into_iter()
                .next()
            {
                return Ok(Some(first));
            }
        }
        Ok(None)
    }

    async fn text_within(
        &self,
        element: &str,
        selectors: &[&str],
    ) -> Result<String, ClientError> {
        match self.first_match_within(element, selectors).await? {
            Some(found) => Ok(self.driver.element_text(&found).await?.trim().to_string()),
            None => Ok(String::new()),
        }
    }

    async fn extract_post(&self, element: &str) -> Result<Option<Post>, ClientError> {
        let author_name = self.text_within(element, &AUTHOR_SELECTORS).await?;
        let content = truncate_chars(
            &self.text_within(element, &CONTENT_SELECTORS).await?,
            MAX_CONTENT_CHARS,
        );
        if author_name.is_empty() && content.is_empty() {
            return Ok(None);
        }

        let post_id = match self.driver.element_attribute(element, "id").await? {
            Some(id) if !id.is_empty() => id,
            _ => content_hash(&author_name, &content),
        };
        let timestamp_label = self.text_within(element, &TIMESTAMP_SELECTORS).await?;

        // Best-effort: one of our own messages already visible on the post.
        let full_text = self.driver.element_text(element).await.unwrap_or_default();
        let already_commented_hint = self
            .config
            .admin_messages
            .iter()
            .any(|message| full_text.contains(message.as_str()));

        Ok(Some(Post {
            post_id,
            author_name,
            content,
            timestamp_label,
            already_commented_hint,
        }))
    }
}

#[async_trait]
impl GroupClient for FeedClient {
    fn name(&self) -> &str {
        "feed"
    }

    async fn login(&self) -> Result<bool, ClientError> {
        self.driver.navigate(&self.config.login_url).await?;
        self.action_pause().await;

        let Some(email) = self.first_match(&LOGIN_EMAIL_SELECTORS).await? else {
            tracing::warn!("login form not found at {}", self.config.login_url);
            return Ok(false);
        };
        self.driver.send_keys(&email, &self.config.email).await?;

        let Some(password) = self.first_match(&LOGIN_PASSWORD_SELECTORS).await? else {
            return Ok(false);
        };
        self.driver
            .send_keys(&password, &self.config.password)
            .await?;

        if let Some(submit) = self.first_match(&LOGIN_SUBMIT_SELECTORS).await? {
            self.driver.click(&submit).await?;
        } else {
            self.driver.send_keys(&password, ENTER_KEY).await?;
        }
        self.action_pause().await;

        // Still seeing a password field means the credentials were rejected.
        Ok(self.first_match(&LOGIN_PASSWORD_SELECTORS).await?.is_none())
    }

    async fn navigate_to_group(&self) -> Result<bool, ClientError> {
        self.driver.navigate(&self.config.group_url).await?;
        self.action_pause().await;
        Ok(self.first_match(&FEED_SELECTORS).await?.is_some())
    }

    async fn scrape_recent_posts(&self, limit: usize) -> Result<Vec<Post>, ClientError> {
        for _ in 0..SCROLL_ROUNDS {
            self.driver
                .execute(
                    "window.scrollBy(0, document.body.scrollHeight / 2);",
                    Vec::new(),
                )
                .await?;
            self.action_pause().await;
        }

        let mut elements = Vec::new();
        for selector in POST_SELECTORS {
            elements = self.driver.find_elements(selector).await?;
            if !elements.is_empty() {
                break;
            }
        }
        tracing::info!("found {} candidate post containers", elements.len());

        let mut posts = Vec::new();
        let mut handles = self.handles.lock().await;
        handles.clear();
        for element in elements {
            if posts.len() >= limit {
                break;
            }
            match self.extract_post(&element).await {
                Ok(Some(post)) => {
                    if handles.contains_key(&post.post_id) {
                        continue;
                    }
                    handles.insert(post.post_id.clone(), element);
                    posts.push(post);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("failed to extract post: {e}"),
            }
        }

        tracing::info!("scraped {} posts", posts.len());
        Ok(posts)
    }

    async fn post_comment(&self, post: &Post, message: &str) -> Result<bool, ClientError> {
        let handle = self
            .handles
            .lock()
            .await
            .get(&post.post_id)
            .cloned()
            .ok_or_else(|| {
                ClientError::Comment(format!("no element handle for post {}", post.post_id))
            })?;

        self.driver
            .execute(
                "arguments[0].scrollIntoView({block: 'center'});",
                vec![WebDriver::element_arg(&handle)],
            )
            .await?;
        self.action_pause().await;

        let Some(comment_box) = self.first_match_within(&handle, &COMMENT_BOX_SELECTORS).await?
        else {
            tracing::warn!("could not find comment box for post {}", post.post_id);
            return Ok(false);
        };
        self.driver.click(&comment_box).await?;
        self.driver.send_keys(&comment_box, message).await?;
        self.action_pause().await;

        if let Some(submit) = self
            .first_match_within(&handle, &COMMENT_SUBMIT_SELECTORS)
            .await?
        {
            self.driver.click(&submit).await?;
        } else {
            self.driver.send_keys(&comment_box, ENTER_KEY).await?;
        }
        Ok(true)
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.driver.end_session().await
    }
}

/// Stable fallback id for posts whose container exposes no DOM id.
fn content_hash(author: &str, content: &str) -> String {
    let digest = Sha256::digest(format!("{author}\n{content}").as_bytes());
    format!("post-{}", &hex::encode(digest)[..16])
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
