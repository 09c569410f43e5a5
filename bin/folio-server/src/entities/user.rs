use crate::entities::{SqliteStore, User, parse_ts, ts};
use chrono::Utc;
use std::future::Future;

/// Columns that the profile endpoint may change.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_notifications_enabled: Option<bool>,
}

pub trait UserStore: Send + Sync + 'static {
    fn create_user(&self, user: User) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_user(&self, id: &str) -> impl Future<Output = Result<Option<User>, sqlx::Error>> + Send;
    fn find_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<User>, sqlx::Error>> + Send;
    fn find_user_by_verification_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<User>, sqlx::Error>> + Send;
    fn list_users(&self) -> impl Future<Output = Result<Vec<User>, sqlx::Error>> + Send;
    /// Every user except `user_id`, ordered by username.
    fn list_other_users(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<User>, sqlx::Error>> + Send;
    fn update_profile(
        &self,
        id: &str,
        update: ProfileUpdate,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn set_password_hash(
        &self,
        id: &str,
        hash: &str,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn set_verification_token(
        &self,
        id: &str,
        token: &str,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Mark the address verified and clear the one-time token.
    fn mark_email_verified(&self, id: &str) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn set_account_flags(
        &self,
        id: &str,
        is_active: Option<bool>,
        is_staff: Option<bool>,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    id: String,
    email: String,
    username: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    is_staff: bool,
    is_active: bool,
    is_email_verified: bool,
    email_verification_token: Option<String>,
    email_notifications_enabled: bool,
    created_at: String,
    updated_at: String,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            email: r.email,
            username: r.username,
            first_name: r.first_name,
            last_name: r.last_name,
            password_hash: r.password_hash,
            is_staff: r.is_staff,
            is_active: r.is_active,
            is_email_verified: r.is_email_verified,
            email_verification_token: r.email_verification_token,
            email_notifications_enabled: r.email_notifications_enabled,
            created_at: parse_ts(&r.created_at),
            updated_at: parse_ts(&r.updated_at),
        }
    }
}

/// Qualified user columns, safe to select alongside joined tables.
pub(crate) const USER_COLUMNS: &str = "users.id AS id, users.email AS email, \
     users.username AS username, users.first_name AS first_name, \
     users.last_name AS last_name, \
     users.password_hash AS password_hash, \
     users.is_staff AS is_staff, users.is_active AS is_active, \
     users.is_email_verified AS is_email_verified, \
     users.email_verification_token AS email_verification_token, \
     users.email_notifications_enabled AS email_notifications_enabled, \
     users.created_at AS created_at, \
     users.updated_at AS updated_at";

impl SqliteStore {
    async fn fetch_user(&self, column: &str, value: &str) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    /// Participants of a conversation, used by the conversation store.
    pub(crate) async fn users_in_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<User>, sqlx::Error> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             JOIN conversation_participants ON user_id = users.id \
             WHERE conversation_id = ?1 ORDER BY joined_at ASC, username ASC"
        );
        let rows: Vec<UserRow> = sqlx::query_as(&sql)
            .bind(conversation_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }
}

impl UserStore for SqliteStore {
    async fn create_user(&self, user: User) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO users (id, email, username, first_name, last_name, password_hash, \
             is_staff, is_active, is_email_verified, email_verification_token, \
             email_notifications_enabled, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .bind(&user.id)
        .bind(user.email.to_lowercase())
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.is_staff)
        .bind(user.is_active)
        .bind(user.is_email_verified)
        .bind(&user.email_verification_token)
        .bind(user.email_notifications_enabled)
        .bind(ts(&user.created_at))
        .bind(ts(&user.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, sqlx::Error> {
        self.fetch_user("id", id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        self.fetch_user("email", &email.trim().to_lowercase()).await
    }

    async fn find_user_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        self.fetch_user("email_verification_token", token).await
    }

    async fn list_users(&self) -> Result<Vec<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC");
        let rows: Vec<UserRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn list_other_users(&self, user_id: &str) -> Result<Vec<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id <> ?1 ORDER BY username ASC");
        let rows: Vec<UserRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET \
               username = COALESCE(?1, username), \
               first_name = COALESCE(?2, first_name), \
               last_name = COALESCE(?3, last_name), \
               email_notifications_enabled = COALESCE(?4, email_notifications_enabled), \
               updated_at = ?5 \
             WHERE id = ?6",
        )
        .bind(update.username)
        .bind(update.first_name)
        .bind(update.last_name)
        .bind(update.email_notifications_enabled)
        .bind(ts(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_password_hash(&self, id: &str, hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(hash)
            .bind(ts(&Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_verification_token(&self, id: &str, token: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET email_verification_token = ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(token)
        .bind(ts(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_email_verified(&self, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET is_email_verified = 1, is_active = 1, \
             email_verification_token = NULL, updated_at = ?1 WHERE id = ?2",
        )
        .bind(ts(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_account_flags(
        &self,
        id: &str,
        is_active: Option<bool>,
        is_staff: Option<bool>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET is_active = COALESCE(?1, is_active), \
             is_staff = COALESCE(?2, is_staff), updated_at = ?3 WHERE id = ?4",
        )
        .bind(is_active)
        .bind(is_staff)
        .bind(ts(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use uuid::Uuid;

    /// Build an unsaved user with a throwaway password hash.
    pub(crate) fn new_user(username: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4().to_string(),
            email: format!("{username}@example.com"),
            username: username.to_owned(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "unusable".into(),
            is_staff: false,
            is_active: true,
            is_email_verified: true,
            email_verification_token: None,
            email_notifications_enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn email_lookup_is_case_insensitive() {
        let store = SqliteStore::in_memory().await;
        let mut user = new_user("casey");
        user.email = "Casey@Example.COM".into();
        store.create_user(user.clone()).await.unwrap();

        let found = store.find_user_by_email("  CASEY@example.com ").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = SqliteStore::in_memory().await;
        store.create_user(new_user("dup")).await.unwrap();
        let mut second = new_user("dup2");
        second.email = "dup@example.com".into();
        let err = store.create_user(second).await.unwrap_err();
        assert!(matches!(err, sqlx::Error::Database(ref db) if db.is_unique_violation()));
    }

    #[tokio::test]
    async fn verifying_clears_the_token() {
        let store = SqliteStore::in_memory().await;
        let mut user = new_user("vera");
        user.is_email_verified = false;
        user.email_verification_token = Some("tok-123".into());
        store.create_user(user.clone()).await.unwrap();

        let found = store.find_user_by_verification_token("tok-123").await.unwrap();
        assert!(found.is_some());

        store.mark_email_verified(&user.id).await.unwrap();
        let again = store.find_user_by_verification_token("tok-123").await.unwrap();
        assert!(again.is_none());
        let reloaded = store.get_user(&user.id).await.unwrap().unwrap();
        assert!(reloaded.is_email_verified);
        assert!(reloaded.email_verification_token.is_none());
    }

    #[tokio::test]
    async fn profile_update_keeps_unset_fields() {
        let store = SqliteStore::in_memory().await;
        let mut user = new_user("pat");
        user.first_name = "Pat".into();
        store.create_user(user.clone()).await.unwrap();

        store
            .update_profile(
                &user.id,
                ProfileUpdate { last_name: Some("Lee".into()), ..Default::default() },
            )
            .await
            .unwrap();
        let reloaded = store.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.first_name, "Pat");
        assert_eq!(reloaded.last_name, "Lee");
    }
}
