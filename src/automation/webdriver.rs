//! Minimal W3C WebDriver client.
//!
//! Covers exactly the protocol surface the meeting adapter needs: session
//! lifecycle, navigation, element lookup and interaction, script execution,
//! and the permissions extension. JSON over HTTP against a chromedriver
//! endpoint; no session pooling.

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::UiError;

/// W3C element identifier key in element responses.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Handle to a located element, valid while the page it came from is live.
#[derive(Debug, Clone)]
pub struct ElementId(String);

pub struct WebDriverClient {
    client: reqwest::Client,
    base_url: String,
    session_id: Option<String>,
}

impl WebDriverClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            session_id: None,
        }
    }

    /// Create a browser session with the given Chrome switches.
    pub async fn start_session(&mut self, chrome_args: &[String]) -> Result<(), UiError> {
        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": chrome_args }
                }
            }
        });

        let value = self
            .post(&format!("{}/session", self.base_url), &body)
            .await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| UiError::Driver("session response missing sessionId".to_string()))?
            .to_string();

        debug!("WebDriver session created: {}", session_id);
        self.session_id = Some(session_id);
        Ok(())
    }

    pub async fn delete_session(&mut self) -> Result<(), UiError> {
        let Some(session_id) = self.session_id.take() else {
            return Ok(());
        };
        let url = format!("{}/session/{}", self.base_url, session_id);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| UiError::Driver(format!("failed to delete session: {}", e)))?;
        if !response.status().is_success() {
            warn!("WebDriver session delete returned {}", response.status());
        }
        Ok(())
    }

    pub async fn goto(&self, url: &str) -> Result<(), UiError> {
        self.session_post("url", &json!({ "url": url })).await?;
        Ok(())
    }

    /// Find the first element matching the strategy. `Ok(None)` when the
    /// driver reports "no such element".
    pub async fn find(&self, using: &str, value: &str) -> Result<Option<ElementId>, UiError> {
        let body = json!({ "using": using, "value": value });
        match self.session_post("element", &body).await {
            Ok(element) => Ok(Some(Self::element_id(&element)?)),
            Err(UiError::ActionFailed { reason, .. }) if reason.contains("no such element") => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// All elements matching the strategy; empty when none match.
    pub async fn find_all(&self, using: &str, value: &str) -> Result<Vec<ElementId>, UiError> {
        let body = json!({ "using": using, "value": value });
        let elements = self.session_post("elements", &body).await?;
        elements
            .as_array()
            .ok_or_else(|| UiError::Driver("elements response is not an array".to_string()))?
            .iter()
            .map(Self::element_id)
            .collect()
    }

    /// Find a descendant of `parent`.
    pub async fn find_in(
        &self,
        parent: &ElementId,
        using: &str,
        value: &str,
    ) -> Result<Option<ElementId>, UiError> {
        let body = json!({ "using": using, "value": value });
        let path = format!("element/{}/element", parent.0);
        match self.session_post(&path, &body).await {
            Ok(element) => Ok(Some(Self::element_id(&element)?)),
            Err(UiError::ActionFailed { reason, .. }) if reason.contains("no such element") => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn click(&self, element: &ElementId) -> Result<(), UiError> {
        self.session_post(&format!("element/{}/click", element.0), &json!({}))
            .await?;
        Ok(())
    }

    pub async fn send_keys(&self, element: &ElementId, text: &str) -> Result<(), UiError> {
        self.session_post(
            &format!("element/{}/value", element.0),
            &json!({ "text": text }),
        )
        .await?;
        Ok(())
    }

    pub async fn text(&self, element: &ElementId) -> Result<String, UiError> {
        let value = self.session_get(&format!("element/{}/text", element.0)).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub async fn attribute(
        &self,
        element: &ElementId,
        name: &str,
    ) -> Result<Option<String>, UiError> {
        let value = self
            .session_get(&format!("element/{}/attribute/{}", element.0, name))
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    /// W3C permissions extension: set a permission state for the page origin.
    pub async fn set_permission(&self, name: &str, state: &str) -> Result<(), UiError> {
        self.session_post(
            "permissions",
            &json!({ "descriptor": { "name": name }, "state": state }),
        )
        .await?;
        Ok(())
    }

    fn session_url(&self, path: &str) -> Result<String, UiError> {
        let session_id = self
            .session_id
            .as_ref()
            .ok_or_else(|| UiError::Driver("no active WebDriver session".to_string()))?;
        Ok(format!("{}/session/{}/{}", self.base_url, session_id, path))
    }

    async fn session_post(&self, path: &str, body: &Value) -> Result<Value, UiError> {
        let url = self.session_url(path)?;
        self.post(&url, body).await
    }

    async fn session_get(&self, path: &str) -> Result<Value, UiError> {
        let url = self.session_url(path)?;
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| UiError::Driver(format!("webdriver request failed: {}", e)))?;
        Self::unwrap_value(path, response).await
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value, UiError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| UiError::Driver(format!("webdriver request failed: {}", e)))?;
        Self::unwrap_value(url, response).await
    }

    /// Unwrap the `value` envelope, mapping driver error payloads onto the
    /// adapter error taxonomy.
    async fn unwrap_value(context: &str, response: reqwest::Response) -> Result<Value, UiError> {
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| UiError::Driver(format!("invalid webdriver response: {}", e)))?;

        let value = body.get("value").cloned().unwrap_or(Value::Null);

        if status.is_success() {
            return Ok(value);
        }

        let error_code = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();

        match error_code {
            // Session-level breakage the adapter cannot recover from.
            "invalid session id" | "session not created" | "unknown error" => Err(UiError::Driver(
                format!("{}: {} {}", context, error_code, message),
            )),
            _ => Err(UiError::ActionFailed {
                control: context.to_string(),
                reason: format!("{}: {}", error_code, message),
            }),
        }
    }

    fn element_id(element: &Value) -> Result<ElementId, UiError> {
        element
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(|id| ElementId(id.to_string()))
            .ok_or_else(|| UiError::Driver("element response missing element id".to_string()))
    }
}
