use crate::entities::{AiChatMessage, SqliteStore, parse_ts, ts};
use std::future::Future;

pub trait AiChatStore: Send + Sync + 'static {
    fn append_ai_message(
        &self,
        msg: AiChatMessage,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// The last `limit` turns a user had in a session, oldest first.
    fn recent_ai_messages(
        &self,
        session_id: &str,
        user_id: &str,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<AiChatMessage>, sqlx::Error>> + Send;
    /// Transcript of a session, oldest first. `user_id = None` selects the
    /// anonymous rows only.
    fn list_ai_messages(
        &self,
        session_id: &str,
        user_id: Option<&str>,
    ) -> impl Future<Output = Result<Vec<AiChatMessage>, sqlx::Error>> + Send;
}

type AiChatRow = (String, String, Option<String>, String, String, String);

fn to_message((id, session_id, user_id, role, content, created_at): AiChatRow) -> AiChatMessage {
    AiChatMessage {
        id,
        session_id,
        user_id,
        role,
        content,
        created_at: parse_ts(&created_at),
    }
}

impl AiChatStore for SqliteStore {
    async fn append_ai_message(&self, msg: AiChatMessage) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO ai_chat_messages (id, session_id, user_id, role, content, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&msg.id)
        .bind(&msg.session_id)
        .bind(&msg.user_id)
        .bind(&msg.role)
        .bind(&msg.content)
        .bind(ts(&msg.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_ai_messages(
        &self,
        session_id: &str,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<AiChatMessage>, sqlx::Error> {
        let mut rows: Vec<AiChatRow> = sqlx::query_as(
            "SELECT id, session_id, user_id, role, content, created_at \
             FROM ai_chat_messages WHERE session_id = ?1 AND user_id = ?2 \
             ORDER BY created_at DESC, rowid DESC LIMIT ?3",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.reverse();
        Ok(rows.into_iter().map(to_message).collect())
    }

    async fn list_ai_messages(
        &self,
        session_id: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<AiChatMessage>, sqlx::Error> {
        let rows: Vec<AiChatRow> = sqlx::query_as(
            "SELECT id, session_id, user_id, role, content, created_at \
             FROM ai_chat_messages WHERE session_id = ?1 AND user_id IS ?2 \
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(to_message).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::user::test::new_user;
    use crate::entities::{ChatRole, UserStore};
    use chrono::Utc;

    fn turn(session: &str, user: Option<&str>, role: ChatRole, content: &str) -> AiChatMessage {
        AiChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session.to_owned(),
            user_id: user.map(str::to_owned),
            role: role.to_string(),
            content: content.to_owned(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn recent_window_is_chronological() {
        let store = SqliteStore::in_memory().await;
        let (u1, u2) = (new_user("uma"), new_user("ugo"));
        store.create_user(u1.clone()).await.unwrap();
        store.create_user(u2.clone()).await.unwrap();
        let (u1, u2) = (u1.id.as_str(), u2.id.as_str());
        for (i, role) in [ChatRole::User, ChatRole::Assistant, ChatRole::User, ChatRole::Assistant]
            .into_iter()
            .enumerate()
        {
            store.append_ai_message(turn("s1", Some(u1), role, &format!("m{i}"))).await.unwrap();
        }
        store.append_ai_message(turn("s2", Some(u1), ChatRole::User, "other")).await.unwrap();
        store.append_ai_message(turn("s1", Some(u2), ChatRole::User, "intruder")).await.unwrap();
        store.append_ai_message(turn("s1", None, ChatRole::User, "anonymous")).await.unwrap();

        let recent: Vec<_> = store
            .recent_ai_messages("s1", u1, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(recent, ["m2", "m3"]);
        assert_eq!(store.list_ai_messages("s1", Some(u1)).await.unwrap().len(), 4);
        assert_eq!(store.list_ai_messages("s1", None).await.unwrap().len(), 1);
        assert!(store.list_ai_messages("s1", Some("someone")).await.unwrap().is_empty());
    }
}
