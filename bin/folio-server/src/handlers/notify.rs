//! Fan-out of a new chat message to the other participants.
//!
//! Runs inside the request that created the message, after the message row is
//! committed. Nothing here can fail the request: store and mail errors are
//! logged and counted.

use chrono::Utc;
use uuid::Uuid;

use crate::entities::{
    ConversationStore, Message, Notification, NotificationKind, NotificationStore, User,
};
use crate::mail::{self, Mailer};
use crate::state::AppState;

/// In-app notification body length.
pub const NOTIFICATION_PREVIEW_CHARS: usize = 100;
/// Email preview length.
pub const EMAIL_PREVIEW_CHARS: usize = 200;

/// What the fan-out managed to do.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FanOut {
    /// Recipients that got an in-app notification row.
    pub notified: Vec<String>,
    pub emails_sent: usize,
    pub emails_failed: usize,
}

/// Cut `text` to at most `max_chars` characters, appending `...` if anything
/// was dropped.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_owned(),
    }
}

/// Email preview: the truncated body, prefixed with the attachment name.
pub fn email_preview(message: &Message) -> String {
    let body = truncate_preview(&message.content, EMAIL_PREVIEW_CHARS);
    match &message.file_name {
        Some(name) if message.has_file() => format!("File: {name}\n{body}"),
        _ => body,
    }
}

/// Notify every participant of the conversation except the sender.
pub async fn fan_out(state: &AppState, sender: &User, message: &Message) -> FanOut {
    let mut outcome = FanOut::default();
    let participants = match state.store.participants(&message.conversation_id).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(conversation = %message.conversation_id, error = %e, "failed to load participants for fan-out");
            return outcome;
        }
    };

    let sender_name = sender.display_name();
    let title = format!("New message from {sender_name}");
    let content = truncate_preview(&message.content, NOTIFICATION_PREVIEW_CHARS);
    let preview = email_preview(message);

    for recipient in participants.iter().filter(|p| p.id != sender.id) {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            recipient_id: recipient.id.clone(),
            kind: NotificationKind::Message.to_string(),
            title: title.clone(),
            content: content.clone(),
            related_message_id: Some(message.id.clone()),
            related_conversation_id: Some(message.conversation_id.clone()),
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        };
        match state.store.insert_notification(notification).await {
            Ok(()) => outcome.notified.push(recipient.id.clone()),
            Err(e) => {
                tracing::error!(recipient = %recipient.id, error = %e, "failed to store notification")
            }
        }

        if !recipient.email_notifications_enabled {
            tracing::debug!(recipient = %recipient.id, "email notifications disabled; skipping");
            continue;
        }
        let sent = match state.templates.message_notification(
            &recipient.email,
            recipient.greeting_name(),
            &sender_name,
            &preview,
        ) {
            Ok(email) => state.mailer.send(email).await,
            Err(e) => Err(e),
        };
        if mail::log_outcome("message_notification", &sent) {
            outcome.emails_sent += 1;
        } else {
            outcome.emails_failed += 1;
        }
    }
    outcome
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::user::test::new_user;
    use crate::entities::message::test::new_message;
    use crate::entities::{Conversation, MessageStore, UserStore};
    use crate::inference::fake::ScriptedClient;
    use crate::mail::fake::RecordingMailer;
    use crate::state::test_support::state_with;
    use std::sync::Arc;

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_preview("short", 100), "short");
        assert_eq!(truncate_preview(&"a".repeat(100), 100), "a".repeat(100));
        assert_eq!(truncate_preview(&"a".repeat(101), 100), format!("{}...", "a".repeat(100)));
        // Multi-byte characters are never split.
        assert_eq!(truncate_preview("ééé", 2), "éé...");
    }

    #[test]
    fn email_preview_names_the_attachment() {
        let mut msg = new_message("c", "s", "see attached");
        msg.file_path = Some("chat_files/x_cv.pdf".into());
        msg.file_name = Some("cv.pdf".into());
        assert_eq!(email_preview(&msg), "File: cv.pdf\nsee attached");
    }

    #[tokio::test]
    async fn every_participant_but_the_sender_is_notified() {
        let mailer = Arc::new(RecordingMailer::default());
        let state = state_with(mailer.clone(), Arc::new(ScriptedClient::unconfigured())).await;
        let (a, b) = (new_user("a"), new_user("b"));
        let mut c = new_user("c");
        c.email_notifications_enabled = false;
        for u in [&a, &b, &c] {
            state.store.create_user(u.clone()).await.unwrap();
        }
        let now = Utc::now();
        let conv = Conversation { id: "conv".into(), created_at: now, updated_at: now };
        state
            .store
            .create_conversation(conv, &[a.id.clone(), b.id.clone(), c.id.clone()])
            .await
            .unwrap();
        let msg = new_message("conv", &a.id, &"x".repeat(150));
        state.store.insert_message(msg.clone()).await.unwrap();

        let outcome = fan_out(&state, &a, &msg).await;
        let mut notified = outcome.notified.clone();
        notified.sort();
        let mut expected = vec![b.id.clone(), c.id.clone()];
        expected.sort();
        assert_eq!(notified, expected);
        assert_eq!(outcome.emails_sent, 1);

        assert!(state.store.list_notifications(&a.id, false).await.unwrap().is_empty());
        let for_b = state.store.list_notifications(&b.id, false).await.unwrap();
        assert_eq!(for_b.len(), 1);
        assert_eq!(for_b[0].title, "New message from a");
        assert_eq!(for_b[0].content.chars().count(), 103);
        assert_eq!(for_b[0].related_message_id.as_deref(), Some(msg.id.as_str()));

        let emails = mailer.emails();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].to, [b.email.clone()]);
    }

    #[tokio::test]
    async fn mail_failures_are_counted_not_raised() {
        let state = state_with(
            Arc::new(RecordingMailer::failing()),
            Arc::new(ScriptedClient::unconfigured()),
        )
        .await;
        let (a, b) = (new_user("a"), new_user("b"));
        state.store.create_user(a.clone()).await.unwrap();
        state.store.create_user(b.clone()).await.unwrap();
        let now = Utc::now();
        let conv = Conversation { id: "conv".into(), created_at: now, updated_at: now };
        state.store.create_conversation(conv, &[a.id.clone(), b.id.clone()]).await.unwrap();
        let msg = new_message("conv", &a.id, "hi");
        state.store.insert_message(msg.clone()).await.unwrap();

        let outcome = fan_out(&state, &a, &msg).await;
        assert_eq!(outcome.notified, [b.id.clone()]);
        assert_eq!(outcome.emails_failed, 1);
    }
}
