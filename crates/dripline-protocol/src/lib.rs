use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Inbound chat request body.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, utoipa::ToSchema)]
pub struct ChatRequest {
    pub message: String,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Outbound chat reply body. Optional fields are omitted, never null.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, utoipa::ToSchema)]
pub struct ChatReply {
    pub response: String,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(rename = "isEmergency", skip_serializing_if = "Option::is_none")]
    pub is_emergency: Option<bool>,
    #[serde(rename = "errorId", skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,
}

impl ChatReply {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            session_id: None,
            is_emergency: None,
            error_id: None,
        }
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, utoipa::ToSchema)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub ts_ms: u64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_emergency: bool,
}

impl ChatMessage {
    pub fn new(role: Role, content: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.to_string(),
            ts_ms: now_ms(),
            is_emergency: false,
        }
    }

    pub fn emergency(content: &str) -> Self {
        Self {
            is_emergency: true,
            ..Self::new(Role::Assistant, content)
        }
    }
}

fn now_ms() -> u64 {
    chrono::Utc::now()
        .timestamp_millis()
        .try_into()
        .unwrap_or_default()
}
