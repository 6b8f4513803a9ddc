use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload for creating an avatar conversation.
///
/// Absent or empty fields are left out of the serialized body entirely; the
/// provider treats an explicit `null` differently from a missing key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationRequest {
    pub replica_id: String,
    #[serde(skip_serializing_if = "is_blank")]
    pub persona_id: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub conversation_name: Option<String>,
    #[serde(rename = "conversational_context", skip_serializing_if = "is_blank")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub callback_url: Option<String>,
    /// Passed through verbatim, in insertion order.
    #[serde(skip_serializing_if = "is_empty_map")]
    pub properties: Option<Map<String, Value>>,
}

impl ConversationRequest {
    pub fn new(replica_id: impl Into<String>) -> Self {
        Self {
            replica_id: replica_id.into(),
            ..Self::default()
        }
    }

    pub fn persona_id(mut self, persona_id: Option<String>) -> Self {
        self.persona_id = persona_id;
        self
    }

    pub fn conversation_name(mut self, name: Option<String>) -> Self {
        self.conversation_name = name;
        self
    }

    pub fn context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    pub fn properties(mut self, properties: Option<Map<String, Value>>) -> Self {
        self.properties = properties;
        self
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

fn is_empty_map(value: &Option<Map<String, Value>>) -> bool {
    value.as_ref().map_or(true, Map::is_empty)
}

#[derive(Debug, Deserialize)]
struct ConversationFields {
    conversation_id: String,
    #[serde(default)]
    conversation_name: Option<String>,
    #[serde(default)]
    conversation_url: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// An avatar conversation as returned by the provider.
///
/// Serializes back to the provider object exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Conversation {
    pub conversation_id: String,
    pub conversation_name: Option<String>,
    pub conversation_url: Option<String>,
    pub status: Option<String>,
    raw: Value,
}

impl Conversation {
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl TryFrom<Value> for Conversation {
    type Error = serde_json::Error;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        let fields: ConversationFields = serde_json::from_value(raw.clone())?;
        Ok(Self {
            conversation_id: fields.conversation_id,
            conversation_name: fields.conversation_name,
            conversation_url: fields.conversation_url,
            status: fields.status,
            raw,
        })
    }
}

impl From<Conversation> for Value {
    fn from(conversation: Conversation) -> Self {
        conversation.raw
    }
}
