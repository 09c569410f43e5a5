use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One turn of a chatbot session (`ai_chat_messages` table).
#[derive(Debug, Clone)]
pub struct AiChatMessage {
    pub id: String,
    pub session_id: String,
    /// `None` for anonymous visitors.
    pub user_id: Option<String>,
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
