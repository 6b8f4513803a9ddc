//! Session reuse and task dispatch.
//!
//! Provisioning a remote browser is the slow, billed step, so consecutive
//! tasks are routed into the same session for as long as the provider still
//! reports it `active`. Sessions expire server-side without notice, so
//! liveness is checked before every reuse rather than assumed.
//!
//! The manager tracks exactly one session. The check and the replacement
//! happen under one lock: concurrent `run_task` calls that find no usable
//! session provision a single new one between them instead of each creating
//! their own and orphaning all but the last.

use std::sync::Arc;

use concierge_core::error::Result;
use concierge_core::{ActiveSession, AutomationProvider, ConciergeError};
use serde::Serialize;
use tokio::sync::Mutex;

/// Outcome of asking the provider whether a tracked session is still usable.
#[derive(Debug)]
pub enum SessionCheck {
    Active,
    /// Provider answered with a status other than `active`.
    Stale(Option<String>),
    /// Provider could not be asked. Treated like `Stale`.
    Unknown(ConciergeError),
}

impl SessionCheck {
    pub fn is_reusable(&self) -> bool {
        matches!(self, SessionCheck::Active)
    }
}

/// What `/api/run` hands back: the caller polls the task itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDispatch {
    pub task_id: String,
    pub session_id: String,
    pub live_url: Option<String>,
}

pub struct SessionManager {
    provider: Arc<dyn AutomationProvider>,
    slot: Mutex<Option<ActiveSession>>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn AutomationProvider>) -> Self {
        Self {
            provider,
            slot: Mutex::new(None),
        }
    }

    pub fn provider(&self) -> &Arc<dyn AutomationProvider> {
        &self.provider
    }

    /// Snapshot of the tracked session, if any.
    pub async fn active(&self) -> Option<ActiveSession> {
        self.slot.lock().await.clone()
    }

    pub async fn check_session(&self, session_id: &str) -> SessionCheck {
        match self.provider.get_session(session_id).await {
            Ok(session) if session.is_active() => SessionCheck::Active,
            Ok(session) => SessionCheck::Stale(session.status),
            Err(e) => SessionCheck::Unknown(e),
        }
    }

    /// Return the tracked session if the provider still reports it active,
    /// otherwise provision a new one and track that instead.
    ///
    /// A failed liveness lookup is absorbed here. A failed creation is not:
    /// it propagates and the slot keeps its previous value.
    pub async fn acquire_session(&self) -> Result<ActiveSession> {
        let mut slot = self.slot.lock().await;

        if let Some(current) = slot.as_ref() {
            match self.check_session(&current.session_id).await {
                SessionCheck::Active => {
                    tracing::debug!(session_id = %current.session_id, "Reusing active session");
                    return Ok(current.clone());
                }
                SessionCheck::Stale(status) => {
                    tracing::info!(
                        session_id = %current.session_id,
                        status = status.as_deref().unwrap_or("unknown"),
                        "Previous session is no longer active, creating a new one"
                    );
                }
                SessionCheck::Unknown(e) => {
                    tracing::warn!(
                        session_id = %current.session_id,
                        error = %e,
                        "Could not check session status, creating a new one"
                    );
                }
            }
        }

        let session = self.provider.create_session().await?;
        let active = ActiveSession::from(&session);
        tracing::info!(
            session_id = %active.session_id,
            live_url = active.live_url.as_deref().unwrap_or(""),
            provider = self.provider.name(),
            "Created new session"
        );

        *slot = Some(active.clone());
        Ok(active)
    }

    /// Resolve a session and submit `description` into it.
    pub async fn run_task(&self, description: &str) -> Result<TaskDispatch> {
        let session = self.acquire_session().await?;
        let task = self
            .provider
            .create_task(description, Some(&session.session_id))
            .await?;

        tracing::info!(task_id = %task.id, session_id = %session.session_id, "Task dispatched");

        Ok(TaskDispatch {
            task_id: task.id,
            session_id: session.session_id,
            live_url: session.live_url,
        })
    }
}
