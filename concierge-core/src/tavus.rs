//! Client for the Tavus conversational video API (v2).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::config::{TavusConfig, DEFAULT_TAVUS_URL};
use crate::error::{ConciergeError, Result};
use crate::models::{Conversation, ConversationRequest};
use crate::provider::ConversationProvider;

const API_KEY_HEADER: &str = "x-api-key";
const API_KEY_ENV: &str = "TAVUS_API_KEY";
const SERVICE: &str = "Tavus";

/// `GET /replicas` and `GET /personas` wrap their lists in `{"data": [...]}`.
#[derive(Debug, Deserialize)]
struct DataEnvelope {
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct TavusClient {
    client: Client,
    base_url: String,
}

impl TavusClient {
    /// Create a client, falling back to `TAVUS_API_KEY` when no key is given.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_TAVUS_URL, None)
    }

    pub fn from_config(config: &TavusConfig) -> Result<Self> {
        Self::with_base_url(
            config.api_key.clone(),
            &config.base_url,
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn with_base_url(
        api_key: Option<String>,
        base_url: &str,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConciergeError::Configuration(format!("{} is not set", API_KEY_ENV)))?;

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&api_key).map_err(|_| {
            ConciergeError::Configuration(format!("{} is not a valid header value", API_KEY_ENV))
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
            tracing::error!(status = status.as_u16(), body = %body, "Tavus API error");
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
impl ConversationProvider for TavusClient {
    async fn create_conversation(&self, request: &ConversationRequest) -> Result<Conversation> {
        let request = self.client.post(self.url("conversations")).json(request);
        self.send(request).await
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation> {
        let request = self
            .client
            .get(self.url(&format!("conversations/{}", conversation_id)));
        self.send(request).await
    }

    async fn list_replicas(&self) -> Result<Vec<Value>> {
        let envelope: DataEnvelope = self.send(self.client.get(self.url("replicas"))).await?;
        Ok(envelope.data)
    }

    async fn list_personas(&self) -> Result<Vec<Value>> {
        let envelope: DataEnvelope = self.send(self.client.get(self.url("personas"))).await?;
        Ok(envelope.data)
    }

    fn name(&self) -> &str {
        "tavus"
    }
}
