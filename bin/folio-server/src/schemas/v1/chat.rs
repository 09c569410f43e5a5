use crate::entities::{Conversation, Message, Notification, User};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A chat participant as other users see them.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipantResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub is_staff: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub has_file: bool,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    /// Relative download URL when the message carries a file.
    pub file_url: Option<String>,
    pub is_read: bool,
    pub read_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConversationResponse {
    pub id: String,
    pub participants: Vec<ParticipantResponse>,
    pub last_message: Option<MessageResponse>,
    /// Messages from others the caller has not read yet.
    pub unread_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateConversationRequest {
    /// The other participant; a conversation with only the caller when absent.
    pub participant_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub content: String,
}

/// Multipart form of `send_message`.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct SendMessageUpload {
    pub content: Option<String>,
    #[schema(value_type = String, format = Binary)]
    pub file: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub content: String,
    pub related_message_id: Option<String>,
    pub related_conversation_id: Option<String>,
    pub is_read: bool,
    pub read_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkAllReadResponse {
    pub message: String,
    pub updated: u64,
}

impl User {
    pub fn to_participant(&self) -> ParticipantResponse {
        ParticipantResponse {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            display_name: self.display_name(),
            is_staff: self.is_staff,
        }
    }
}

impl Message {
    pub fn to_response(&self, sender_name: String) -> MessageResponse {
        MessageResponse {
            id: self.id.clone(),
            conversation_id: self.conversation_id.clone(),
            sender_id: self.sender_id.clone(),
            sender_name,
            content: self.content.clone(),
            has_file: self.has_file(),
            file_name: self.file_name.clone(),
            file_type: self.file_type.clone(),
            file_url: self
                .has_file()
                .then(|| format!("/api/v1/chat/messages/{}/download_file", self.id)),
            is_read: self.is_read,
            read_at: self.read_at.map(|t| t.to_rfc3339()),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

impl Conversation {
    pub fn to_response(
        &self,
        participants: &[User],
        last_message: Option<&Message>,
        unread_count: i64,
    ) -> ConversationResponse {
        let name_of = |id: &str| {
            participants
                .iter()
                .find(|u| u.id == id)
                .map(User::display_name)
                .unwrap_or_default()
        };
        ConversationResponse {
            id: self.id.clone(),
            participants: participants.iter().map(User::to_participant).collect(),
            last_message: last_message.map(|m| m.to_response(name_of(&m.sender_id))),
            unread_count,
            created_at: self.created_at.to_rfc3339(),
            updated_at: self.updated_at.to_rfc3339(),
        }
    }
}

impl Notification {
    pub fn to_response(&self) -> NotificationResponse {
        NotificationResponse {
            id: self.id.clone(),
            kind: self.kind.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
            related_message_id: self.related_message_id.clone(),
            related_conversation_id: self.related_conversation_id.clone(),
            is_read: self.is_read,
            read_at: self.read_at.map(|t| t.to_rfc3339()),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}
