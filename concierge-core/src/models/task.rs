use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Statuses after which a task will not change again.
pub const TERMINAL_STATUSES: &[&str] = &["finished", "stopped"];

pub const STATUS_PAUSED: &str = "paused";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskFields {
    id: String,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: Option<Value>,
}

/// One unit of automation work as reported by the provider.
///
/// The typed fields are a read view. Serializing emits the provider object
/// exactly as it was received, explicit `null`s included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Task {
    pub id: String,
    pub session_id: Option<String>,
    pub status: Option<String>,
    pub output: Option<Value>,
    raw: Value,
}

impl Task {
    pub fn is_terminal(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| TERMINAL_STATUSES.contains(&s))
    }

    pub fn is_paused(&self) -> bool {
        self.status.as_deref() == Some(STATUS_PAUSED)
    }

    /// The provider object as received.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl TryFrom<Value> for Task {
    type Error = serde_json::Error;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        let fields: TaskFields = serde_json::from_value(raw.clone())?;
        Ok(Self {
            id: fields.id,
            session_id: fields.session_id,
            status: fields.status,
            output: fields.output,
            raw,
        })
    }
}

impl From<Task> for Value {
    fn from(task: Task) -> Self {
        task.raw
    }
}
