use crate::entities::{Conversation, SqliteStore, User, parse_ts, ts};
use chrono::{DateTime, Utc};
use std::future::Future;

pub trait ConversationStore: Send + Sync + 'static {
    /// Insert a conversation together with its participant rows.
    fn create_conversation(
        &self,
        conversation: Conversation,
        participant_ids: &[String],
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_conversation(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Conversation>, sqlx::Error>> + Send;
    /// Conversations `user_id` takes part in, most recently active first.
    fn list_conversations_for(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<Conversation>, sqlx::Error>> + Send;
    fn participants(
        &self,
        conversation_id: &str,
    ) -> impl Future<Output = Result<Vec<User>, sqlx::Error>> + Send;
    fn is_participant(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
    /// An existing conversation whose participants are exactly `a` and `b`.
    fn find_direct_conversation(
        &self,
        a: &str,
        b: &str,
    ) -> impl Future<Output = Result<Option<Conversation>, sqlx::Error>> + Send;
    fn touch_conversation(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

fn to_conversation((id, created_at, updated_at): (String, String, String)) -> Conversation {
    Conversation {
        id,
        created_at: parse_ts(&created_at),
        updated_at: parse_ts(&updated_at),
    }
}

impl ConversationStore for SqliteStore {
    async fn create_conversation(
        &self,
        conversation: Conversation,
        participant_ids: &[String],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO conversations (id, created_at, updated_at) VALUES (?1, ?2, ?3)")
            .bind(&conversation.id)
            .bind(ts(&conversation.created_at))
            .bind(ts(&conversation.updated_at))
            .execute(&mut *tx)
            .await?;
        let joined_at = ts(&conversation.created_at);
        for user_id in participant_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO conversation_participants (conversation_id, user_id, joined_at) \
                 VALUES (?1, ?2, ?3)",
            )
            .bind(&conversation.id)
            .bind(user_id)
            .bind(&joined_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, sqlx::Error> {
        let row: Option<(String, String, String)> =
            sqlx::query_as("SELECT id, created_at, updated_at FROM conversations WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(to_conversation))
    }

    async fn list_conversations_for(&self, user_id: &str) -> Result<Vec<Conversation>, sqlx::Error> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT c.id, c.created_at, c.updated_at FROM conversations c \
             JOIN conversation_participants p ON p.conversation_id = c.id \
             WHERE p.user_id = ?1 ORDER BY c.updated_at DESC, c.rowid DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(to_conversation).collect())
    }

    async fn participants(&self, conversation_id: &str) -> Result<Vec<User>, sqlx::Error> {
        self.users_in_conversation(conversation_id).await
    }

    async fn is_participant(&self, conversation_id: &str, user_id: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM conversation_participants WHERE conversation_id = ?1 AND user_id = ?2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn find_direct_conversation(
        &self,
        a: &str,
        b: &str,
    ) -> Result<Option<Conversation>, sqlx::Error> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            "SELECT c.id, c.created_at, c.updated_at FROM conversations c \
             WHERE EXISTS (SELECT 1 FROM conversation_participants WHERE conversation_id = c.id AND user_id = ?1) \
               AND EXISTS (SELECT 1 FROM conversation_participants WHERE conversation_id = c.id AND user_id = ?2) \
               AND (SELECT COUNT(*) FROM conversation_participants WHERE conversation_id = c.id) = 2 \
             ORDER BY c.updated_at DESC LIMIT 1",
        )
        .bind(a)
        .bind(b)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(to_conversation))
    }

    async fn touch_conversation(&self, id: &str, at: DateTime<Utc>) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE conversations SET updated_at = ?1 WHERE id = ?2")
            .bind(ts(&at))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::UserStore;
    use crate::entities::user::test::new_user;
    use chrono::Duration;

    fn conversation(at: DateTime<Utc>) -> Conversation {
        Conversation { id: uuid::Uuid::new_v4().to_string(), created_at: at, updated_at: at }
    }

    #[tokio::test]
    async fn participants_and_membership() {
        let store = SqliteStore::in_memory().await;
        let (a, b, c) = (new_user("ann"), new_user("bob"), new_user("cy"));
        for u in [&a, &b, &c] {
            store.create_user(u.clone()).await.unwrap();
        }
        let conv = conversation(Utc::now());
        store
            .create_conversation(conv.clone(), &[a.id.clone(), b.id.clone()])
            .await
            .unwrap();

        let names: Vec<_> = store
            .participants(&conv.id)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, ["ann", "bob"]);
        assert!(store.is_participant(&conv.id, &a.id).await.unwrap());
        assert!(!store.is_participant(&conv.id, &c.id).await.unwrap());

        let direct = store.find_direct_conversation(&b.id, &a.id).await.unwrap();
        assert_eq!(direct.map(|c| c.id), Some(conv.id.clone()));
        assert!(store.find_direct_conversation(&a.id, &c.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn touched_conversation_moves_to_front() {
        let store = SqliteStore::in_memory().await;
        let a = new_user("amy");
        store.create_user(a.clone()).await.unwrap();
        let start = Utc::now();
        let older = conversation(start);
        let newer = conversation(start + Duration::seconds(1));
        store.create_conversation(older.clone(), &[a.id.clone()]).await.unwrap();
        store.create_conversation(newer.clone(), &[a.id.clone()]).await.unwrap();

        let ids: Vec<_> = store
            .list_conversations_for(&a.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, [newer.id.clone(), older.id.clone()]);

        store.touch_conversation(&older.id, start + Duration::seconds(5)).await.unwrap();
        let first = store.list_conversations_for(&a.id).await.unwrap().remove(0);
        assert_eq!(first.id, older.id);
    }
}
