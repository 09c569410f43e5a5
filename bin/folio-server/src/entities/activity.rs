use crate::entities::{SqliteStore, UserActivity, parse_ts, ts};
use std::future::Future;

pub trait ActivityStore: Send + Sync + 'static {
    fn record_activity(
        &self,
        activity: UserActivity,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Most recent first. `user_id = None` lists every user's rows.
    fn list_activities(
        &self,
        user_id: Option<&str>,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<UserActivity>, sqlx::Error>> + Send;
}

type ActivityRow = (String, String, String, Option<String>, String, String, String);

impl ActivityStore for SqliteStore {
    async fn record_activity(&self, activity: UserActivity) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_activities \
             (id, user_id, activity_type, ip_address, user_agent, details, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&activity.id)
        .bind(&activity.user_id)
        .bind(&activity.activity_type)
        .bind(&activity.ip_address)
        .bind(&activity.user_agent)
        .bind(&activity.details)
        .bind(ts(&activity.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_activities(
        &self,
        user_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<UserActivity>, sqlx::Error> {
        let rows: Vec<ActivityRow> = sqlx::query_as(
            "SELECT id, user_id, activity_type, ip_address, user_agent, details, created_at \
             FROM user_activities WHERE (?1 IS NULL OR user_id = ?1) \
             ORDER BY created_at DESC, rowid DESC LIMIT ?2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(
                |(id, user_id, activity_type, ip_address, user_agent, details, created_at)| {
                    UserActivity {
                        id,
                        user_id,
                        activity_type,
                        ip_address,
                        user_agent,
                        details,
                        created_at: parse_ts(&created_at),
                    }
                },
            )
            .collect())
    }
}
