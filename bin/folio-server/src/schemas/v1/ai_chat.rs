use crate::entities::AiChatMessage;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AiChatRequest {
    #[serde(default)]
    pub message: String,
    /// Continue an existing session; a new one is started when absent.
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AiChatResponse {
    pub response: String,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AiChatQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AiChatTurn {
    pub id: String,
    pub role: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AiChatHistoryResponse {
    pub session_id: String,
    pub messages: Vec<AiChatTurn>,
}

impl AiChatMessage {
    pub fn to_response(&self) -> AiChatTurn {
        AiChatTurn {
            id: self.id.clone(),
            role: self.role.clone(),
            content: self.content.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}
