use chrono::{DateTime, Utc};

/// A row in the `conversations` table.
///
/// Participants live in `conversation_participants`; see
/// [`crate::entities::ConversationStore::participants`].
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Bumped whenever a message is sent.
    pub updated_at: DateTime<Utc>,
}

/// A row in the `messages` table.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    /// Path relative to the upload directory.
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn has_file(&self) -> bool {
        self.file_path.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    Message,
    System,
}

/// A row in the `notifications` table.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub kind: String,
    pub title: String,
    pub content: String,
    pub related_message_id: Option<String>,
    pub related_conversation_id: Option<String>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
