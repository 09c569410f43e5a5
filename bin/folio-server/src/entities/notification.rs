use crate::entities::{Notification, SqliteStore, parse_opt_ts, parse_ts, ts};
use chrono::{DateTime, Utc};
use std::future::Future;

pub trait NotificationStore: Send + Sync + 'static {
    fn insert_notification(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_notification(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Notification>, sqlx::Error>> + Send;
    /// A recipient's notifications, newest first.
    fn list_notifications(
        &self,
        recipient_id: &str,
        unread_only: bool,
    ) -> impl Future<Output = Result<Vec<Notification>, sqlx::Error>> + Send;
    fn unread_notification_count(
        &self,
        recipient_id: &str,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;
    /// Returns `false` when the notification was already read.
    fn mark_notification_read(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
    /// Number of notifications that changed state.
    fn mark_all_notifications_read(
        &self,
        recipient_id: &str,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, sqlx::Error>> + Send;
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: String,
    recipient_id: String,
    kind: String,
    title: String,
    content: String,
    related_message_id: Option<String>,
    related_conversation_id: Option<String>,
    is_read: bool,
    read_at: Option<String>,
    created_at: String,
}

impl From<NotificationRow> for Notification {
    fn from(r: NotificationRow) -> Self {
        Notification {
            id: r.id,
            recipient_id: r.recipient_id,
            kind: r.kind,
            title: r.title,
            content: r.content,
            related_message_id: r.related_message_id,
            related_conversation_id: r.related_conversation_id,
            is_read: r.is_read,
            read_at: parse_opt_ts(r.read_at),
            created_at: parse_ts(&r.created_at),
        }
    }
}

const NOTIFICATION_COLUMNS: &str = "id, recipient_id, kind, title, content, related_message_id, \
     related_conversation_id, is_read, read_at, created_at";

impl NotificationStore for SqliteStore {
    async fn insert_notification(&self, n: Notification) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO notifications (id, recipient_id, kind, title, content, \
             related_message_id, related_conversation_id, is_read, read_at, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&n.id)
        .bind(&n.recipient_id)
        .bind(&n.kind)
        .bind(&n.title)
        .bind(&n.content)
        .bind(&n.related_message_id)
        .bind(&n.related_conversation_id)
        .bind(n.is_read)
        .bind(n.read_at.as_ref().map(ts))
        .bind(ts(&n.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_notification(&self, id: &str) -> Result<Option<Notification>, sqlx::Error> {
        let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1");
        let row: Option<NotificationRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Notification::from))
    }

    async fn list_notifications(
        &self,
        recipient_id: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let filter = if unread_only { " AND is_read = 0" } else { "" };
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE recipient_id = ?1{filter} \
             ORDER BY created_at DESC, rowid DESC"
        );
        let rows: Vec<NotificationRow> = sqlx::query_as(&sql)
            .bind(recipient_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn unread_notification_count(&self, recipient_id: &str) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND is_read = 0",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn mark_notification_read(&self, id: &str, at: DateTime<Utc>) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = 1, read_at = ?1 WHERE id = ?2 AND is_read = 0",
        )
        .bind(ts(&at))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_all_notifications_read(
        &self,
        recipient_id: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = 1, read_at = ?1 \
             WHERE recipient_id = ?2 AND is_read = 0",
        )
        .bind(ts(&at))
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::user::test::new_user;
    use crate::entities::{NotificationKind, UserStore};

    fn notification(recipient: &str, title: &str) -> Notification {
        Notification {
            id: uuid::Uuid::new_v4().to_string(),
            recipient_id: recipient.to_owned(),
            kind: NotificationKind::System.to_string(),
            title: title.to_owned(),
            content: String::new(),
            related_message_id: None,
            related_conversation_id: None,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn unread_count_tracks_reads() {
        let store = SqliteStore::in_memory().await;
        let (u, other) = (new_user("nina"), new_user("omar"));
        store.create_user(u.clone()).await.unwrap();
        store.create_user(other.clone()).await.unwrap();
        let first = notification(&u.id, "first");
        store.insert_notification(first.clone()).await.unwrap();
        store.insert_notification(notification(&u.id, "second")).await.unwrap();
        store.insert_notification(notification(&other.id, "theirs")).await.unwrap();

        assert_eq!(store.unread_notification_count(&u.id).await.unwrap(), 2);
        let titles: Vec<_> = store
            .list_notifications(&u.id, false)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert_eq!(titles, ["second", "first"]);

        assert!(store.mark_notification_read(&first.id, Utc::now()).await.unwrap());
        assert!(!store.mark_notification_read(&first.id, Utc::now()).await.unwrap());
        assert_eq!(store.unread_notification_count(&u.id).await.unwrap(), 1);
        assert_eq!(store.list_notifications(&u.id, true).await.unwrap().len(), 1);

        assert_eq!(store.mark_all_notifications_read(&u.id, Utc::now()).await.unwrap(), 1);
        assert_eq!(store.unread_notification_count(&u.id).await.unwrap(), 0);
        assert_eq!(store.unread_notification_count(&other.id).await.unwrap(), 1);
    }
}
