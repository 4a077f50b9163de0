use crate::error::ClientError;
use reqwest::Method;
use serde_json::{Value, json};
use tokio::sync::Mutex;

/// W3C element identifier key in WebDriver responses.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Thin client for the W3C WebDriver wire protocol.
///
/// Speaks JSON-over-HTTP to a locally running driver (chromedriver,
/// geckodriver). Covers only the endpoints the feed client needs; driver
/// error codes (`invalid session id`, ...) are passed through verbatim in
/// [`ClientError::Protocol`] so the retry classifier can see them.
pub struct WebDriver {
    http: reqwest::Client,
    base_url: String,
    session: Mutex<Option<String>>,
}

impl WebDriver {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session: Mutex::new(None),
        })
    }

    /// Create a browser session on the driver.
    pub async fn start_session(&self, headless: bool) -> Result<(), ClientError> {
        let mut args = vec![
            "--disable-notifications".to_string(),
            "--window-size=1280,1024".to_string(),
        ];
        if headless {
            args.push("--headless=new".to_string());
        }
        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let value = self.post("/session", &body).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ClientError::Protocol("session response missing sessionId".to_string())
            })?
            .to_string();
        *self.session.lock().await = Some(session_id);
        Ok(())
    }

    /// Delete the browser session. Safe to call when none is active.
    pub async fn end_session(&self) -> Result<(), ClientError> {
        let Some(id) = self.session.lock().await.take() else {
            return Ok(());
        };
        self.request(Method::DELETE, &format!("/session/{id}"), None)
            .await?;
        Ok(())
    }

    pub async fn navigate(&self, url: &str) -> Result<(), ClientError> {
        let path = self.session_path("/url").await?;
        self.post(&path, &json!({ "url": url })).await?;
        Ok(())
    }

    /// All elements matching a CSS selector, page-wide.
    pub async fn find_elements(&self, selector: &str) -> Result<Vec<String>, ClientError> {
        let path = self.session_path("/elements").await?;
        let value = self.post(&path, &locator(selector)).await?;
        Ok(element_ids(&value))
    }

    /// All elements matching a CSS selector under `element`.
    pub async fn find_elements_within(
        &self,
        element: &str,
        selector: &str,
    ) -> Result<Vec<String>, ClientError> {
        let path = self
            .session_path(&format!("/element/{element}/elements"))
            .await?;
        let value = self.post(&path, &locator(selector)).await?;
        Ok(element_ids(&value))
    }

    pub async fn click(&self, element: &str) -> Result<(), ClientError> {
        let path = self.session_path(&format!("/element/{element}/click")).await?;
        self.post(&path, &json!({})).await?;
        Ok(())
    }

    pub async fn send_keys(&self, element: &str, text: &str) -> Result<(), ClientError> {
        let path = self.session_path(&format!("/element/{element}/value")).await?;
        self.post(&path, &json!({ "text": text })).await?;
        Ok(())
    }

    pub async fn element_text(&self, element: &str) -> Result<String, ClientError> {
        let path = self.session_path(&format!("/element/{element}/text")).await?;
        let value = self.get(&path).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub async fn element_attribute(
        &self,
        element: &str,
        name: &str,
    ) -> Result<Option<String>, ClientError> {
        let path = self
            .session_path(&format!("/element/{element}/attribute/{name}"))
            .await?;
        let value = self.get(&path).await?;
        Ok(value.as_str().map(String::from))
    }

    /// Run a synchronous script in the page.
    pub async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, ClientError> {
        let path = self.session_path("/execute/sync").await?;
        self.post(&path, &json!({ "script": script, "args": args }))
            .await
    }

    /// Wrap an element handle as a script argument.
    #[must_use]
    pub fn element_arg(element: &str) -> Value {
        json!({ ELEMENT_KEY: element })
    }

    async fn session_path(&self, suffix: &str) -> Result<String, ClientError> {
        let guard = self.session.lock().await;
        let id = guard
            .as_deref()
            .ok_or_else(|| ClientError::Session("no active webdriver session".to_string()))?;
        Ok(format!("/session/{id}{suffix}"))
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        self.request(Method::POST, path, Some(body)).await
    }

    async fn get(&self, path: &str) -> Result<Value, ClientError> {
        self.request(Method::GET, path, None).await
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;
        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(ClientError::Protocol(protocol_error(
                &payload,
                status.as_u16(),
            )));
        }
        Ok(payload.get("value").cloned().unwrap_or(Value::Null))
    }
}

fn locator(selector: &str) -> Value {
    json!({ "using": "css selector", "value": selector })
}

fn element_ids(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(ELEMENT_KEY).and_then(Value::as_str))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn protocol_error(payload: &Value, status: u16) -> String {
    let error = payload
        .pointer("/value/error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    let message = payload
        .pointer("/value/message")
        .and_then(Value::as_str)
        .unwrap_or("");
    format!("{error} ({status}): {message}")
}
