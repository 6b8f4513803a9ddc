//! Client for the Browser Use cloud API (v2).
//!
//! Wraps the provider's session and task resources. Each call is a single
//! request: non-2xx responses become [`ConciergeError::RemoteService`]
//! carrying the status and the body the provider returned.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{BrowserUseConfig, DEFAULT_BROWSER_USE_URL};
use crate::error::{ConciergeError, Result};
use crate::models::{Session, SessionList, Task};
use crate::provider::AutomationProvider;

const API_KEY_HEADER: &str = "x-browser-use-api-key";
const SERVICE: &str = "Browser Use";

#[derive(Debug, Serialize)]
struct CreateTaskRequest<'a> {
    task: &'a str,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct TaskActionRequest {
    action: &'static str,
}

#[derive(Debug, Clone)]
pub struct BrowserUseClient {
    client: Client,
    base_url: String,
}

impl BrowserUseClient {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BROWSER_USE_URL, None)
    }

    pub fn from_config(api_key: &str, config: &BrowserUseConfig) -> Result<Self> {
        Self::with_base_url(
            api_key,
            &config.base_url,
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }

    /// Create a client against a custom base URL (staging, tests).
    pub fn with_base_url(api_key: &str, base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        if api_key.is_empty() {
            return Err(ConciergeError::Configuration(
                "BROWSER_USE_API_KEY is not set".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key).map_err(|_| {
            ConciergeError::Configuration("BROWSER_USE_API_KEY is not a valid header value".to_string())
        })?;
        headers.insert(API_KEY_HEADER, key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), body = %body, "Browser Use API error");
            return Err(ConciergeError::RemoteService {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl AutomationProvider for BrowserUseClient {
    async fn create_session(&self) -> Result<Session> {
        // Empty body for now; proxy and timeout options would go here.
        let request = self
            .client
            .post(self.url("sessions"))
            .json(&serde_json::json!({}));
        self.send(request).await
    }

    async fn create_task(&self, description: &str, session_id: Option<&str>) -> Result<Task> {
        let body = CreateTaskRequest {
            task: description,
            session_id: session_id.filter(|id| !id.is_empty()),
        };
        let request = self.client.post(self.url("tasks")).json(&body);
        self.send(request).await
    }

    async fn get_task(&self, task_id: &str) -> Result<Task> {
        let request = self.client.get(self.url(&format!("tasks/{}", task_id)));
        self.send(request).await
    }

    async fn get_session(&self, session_id: &str) -> Result<Session> {
        let request = self.client.get(self.url(&format!("sessions/{}", session_id)));
        self.send(request).await
    }

    async fn list_sessions(&self) -> Result<Vec<Session>> {
        let request = self.client.get(self.url("sessions"));
        let list: SessionList = self.send(request).await?;
        Ok(list.into_sessions())
    }

    async fn stop_task(&self, task_id: &str) -> Result<Task> {
        let request = self
            .client
            .patch(self.url(&format!("tasks/{}", task_id)))
            .json(&TaskActionRequest { action: "stop" });
        self.send(request).await
    }

    fn name(&self) -> &str {
        "browser-use"
    }
}
