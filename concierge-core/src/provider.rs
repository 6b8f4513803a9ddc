//! Seams between the orchestration layer and the two remote task services.
//!
//! The HTTP clients in [`crate::browser_use`] and [`crate::tavus`] are the
//! production implementations; tests substitute in-memory stubs.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::models::{Conversation, ConversationRequest, Session, Task};

/// Session/task resource model of the browser-automation service.
///
/// Every method issues exactly one request. Nothing is retried.
#[async_trait]
pub trait AutomationProvider: Send + Sync {
    /// Provision a new remote browser session.
    async fn create_session(&self) -> Result<Session>;

    /// Submit a task. With `session_id` absent the provider picks or creates
    /// a session on its own.
    async fn create_task(&self, description: &str, session_id: Option<&str>) -> Result<Task>;

    async fn get_task(&self, task_id: &str) -> Result<Task>;

    async fn get_session(&self, session_id: &str) -> Result<Session>;

    async fn list_sessions(&self) -> Result<Vec<Session>>;

    async fn stop_task(&self, task_id: &str) -> Result<Task>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// Conversation resource model of the avatar service.
#[async_trait]
pub trait ConversationProvider: Send + Sync {
    async fn create_conversation(&self, request: &ConversationRequest) -> Result<Conversation>;

    async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation>;

    async fn list_replicas(&self) -> Result<Vec<Value>>;

    async fn list_personas(&self) -> Result<Vec<Value>>;

    fn name(&self) -> &str;
}
