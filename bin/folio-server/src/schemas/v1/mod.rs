pub mod accounts;
pub mod ai_chat;
pub mod chat;
pub mod portfolio;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Plain `{"message": ...}` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
