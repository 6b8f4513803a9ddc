use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status the automation provider reports for a session that can take tasks.
pub const SESSION_ACTIVE: &str = "active";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionFields {
    id: String,
    #[serde(default)]
    live_url: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// A remote browser session as reported by the automation provider.
///
/// Only the fields this crate reads are typed. The whole provider object is
/// kept alongside them so it can be passed back out unaltered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Session {
    pub id: String,
    pub live_url: Option<String>,
    pub status: Option<String>,
    raw: Value,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some(SESSION_ACTIVE)
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl TryFrom<Value> for Session {
    type Error = serde_json::Error;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        let fields: SessionFields = serde_json::from_value(raw.clone())?;
        Ok(Self {
            id: fields.id,
            live_url: fields.live_url,
            status: fields.status,
            raw,
        })
    }
}

impl From<Session> for Value {
    fn from(session: Session) -> Self {
        session.raw
    }
}

/// `GET /sessions` has been observed both as a bare array and as a paged
/// envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SessionList {
    Bare(Vec<Session>),
    Paged { items: Vec<Session> },
}

impl SessionList {
    pub fn into_sessions(self) -> Vec<Session> {
        match self {
            SessionList::Bare(sessions) => sessions,
            SessionList::Paged { items } => items,
        }
    }
}

/// The single session the orchestrator is currently routing tasks into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    pub session_id: String,
    pub live_url: Option<String>,
}

impl From<&Session> for ActiveSession {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            live_url: session.live_url.clone(),
        }
    }
}
