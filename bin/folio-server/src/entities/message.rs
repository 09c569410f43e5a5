use crate::entities::{Message, SqliteStore, parse_opt_ts, parse_ts, ts};
use chrono::{DateTime, Utc};
use std::future::Future;

pub trait MessageStore: Send + Sync + 'static {
    fn insert_message(&self, msg: Message) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_message(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Message>, sqlx::Error>> + Send;
    /// Messages of a conversation in send order.
    fn list_messages(
        &self,
        conversation_id: &str,
    ) -> impl Future<Output = Result<Vec<Message>, sqlx::Error>> + Send;
    fn last_message(
        &self,
        conversation_id: &str,
    ) -> impl Future<Output = Result<Option<Message>, sqlx::Error>> + Send;
    /// Messages in the conversation not sent by `user_id` and still unread.
    fn unread_message_count(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;
    /// Set `is_read` and stamp `read_at` once. Returns `false` if the
    /// message was already read; the original `read_at` is kept.
    fn mark_message_read(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    conversation_id: String,
    sender_id: String,
    content: String,
    file_path: Option<String>,
    file_name: Option<String>,
    file_type: Option<String>,
    is_read: bool,
    read_at: Option<String>,
    created_at: String,
}

impl From<MessageRow> for Message {
    fn from(r: MessageRow) -> Self {
        Message {
            id: r.id,
            conversation_id: r.conversation_id,
            sender_id: r.sender_id,
            content: r.content,
            file_path: r.file_path,
            file_name: r.file_name,
            file_type: r.file_type,
            is_read: r.is_read,
            read_at: parse_opt_ts(r.read_at),
            created_at: parse_ts(&r.created_at),
        }
    }
}

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, content, file_path, file_name, \
     file_type, is_read, read_at, created_at";

impl MessageStore for SqliteStore {
    async fn insert_message(&self, msg: Message) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender_id, content, file_path, \
             file_name, file_type, is_read, read_at, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&msg.id)
        .bind(&msg.conversation_id)
        .bind(&msg.sender_id)
        .bind(&msg.content)
        .bind(&msg.file_path)
        .bind(&msg.file_name)
        .bind(&msg.file_type)
        .bind(msg.is_read)
        .bind(msg.read_at.as_ref().map(ts))
        .bind(ts(&msg.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_message(&self, id: &str) -> Result<Option<Message>, sqlx::Error> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1");
        let row: Option<MessageRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Message::from))
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, sqlx::Error> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1 \
             ORDER BY created_at ASC, rowid ASC"
        );
        let rows: Vec<MessageRow> = sqlx::query_as(&sql)
            .bind(conversation_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn last_message(&self, conversation_id: &str) -> Result<Option<Message>, sqlx::Error> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1 \
             ORDER BY created_at DESC, rowid DESC LIMIT 1"
        );
        let row: Option<MessageRow> = sqlx::query_as(&sql)
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Message::from))
    }

    async fn unread_message_count(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM messages \
             WHERE conversation_id = ?1 AND sender_id <> ?2 AND is_read = 0",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn mark_message_read(&self, id: &str, at: DateTime<Utc>) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE messages SET is_read = 1, read_at = ?1 WHERE id = ?2 AND is_read = 0")
                .bind(ts(&at))
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::entities::user::test::new_user;
    use crate::entities::{Conversation, ConversationStore, UserStore};
    use chrono::Duration;

    pub(crate) fn new_message(conversation_id: &str, sender_id: &str, content: &str) -> Message {
        Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_owned(),
            sender_id: sender_id.to_owned(),
            content: content.to_owned(),
            file_path: None,
            file_name: None,
            file_type: None,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        }
    }

    async fn setup() -> (SqliteStore, String, String, String) {
        let store = SqliteStore::in_memory().await;
        let (a, b) = (new_user("alice"), new_user("bruno"));
        store.create_user(a.clone()).await.unwrap();
        store.create_user(b.clone()).await.unwrap();
        let now = Utc::now();
        let conv = Conversation { id: uuid::Uuid::new_v4().to_string(), created_at: now, updated_at: now };
        store.create_conversation(conv.clone(), &[a.id.clone(), b.id.clone()]).await.unwrap();
        (store, conv.id, a.id, b.id)
    }

    #[tokio::test]
    async fn messages_list_in_send_order() {
        let (store, conv, a, b) = setup().await;
        let same_instant = Utc::now();
        for (sender, text) in [(&a, "one"), (&b, "two"), (&a, "three")] {
            let mut msg = new_message(&conv, sender, text);
            msg.created_at = same_instant;
            store.insert_message(msg).await.unwrap();
        }
        let contents: Vec<_> = store
            .list_messages(&conv)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, ["one", "two", "three"]);
        assert_eq!(store.last_message(&conv).await.unwrap().unwrap().content, "three");
        assert_eq!(store.unread_message_count(&conv, &b).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn marking_read_is_idempotent() {
        let (store, conv, a, _b) = setup().await;
        let msg = new_message(&conv, &a, "hello");
        store.insert_message(msg.clone()).await.unwrap();

        let first_at = Utc::now();
        assert!(store.mark_message_read(&msg.id, first_at).await.unwrap());
        assert!(!store.mark_message_read(&msg.id, first_at + Duration::minutes(5)).await.unwrap());

        let stored = store.get_message(&msg.id).await.unwrap().unwrap();
        assert!(stored.is_read);
        assert_eq!(
            stored.read_at.map(|t| t.timestamp_micros()),
            Some(first_at.timestamp_micros())
        );
    }
}
