pub mod ai_chat;
pub mod chat;
pub mod portfolio;
pub mod user;

pub use ai_chat::{AiChatMessage, ChatRole};
pub use chat::{Conversation, Message, Notification, NotificationKind};
pub use portfolio::{Contact, Project, ProjectImage, ProjectStatus, Skill, TimelineEntry, TimelineKind};
pub use user::{ActivityType, User, UserActivity};
