use crate::entities::{SqliteStore, User, ts};
use chrono::{DateTime, Utc};
use std::future::Future;

use super::user::{USER_COLUMNS, UserRow};

/// Login and password-reset tokens. Only SHA-256 hashes are stored.
pub trait TokenStore: Send + Sync + 'static {
    fn insert_auth_token(
        &self,
        token_hash: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Owner of a non-expired login token.
    fn find_user_by_token_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<User>, sqlx::Error>> + Send;
    fn delete_auth_token(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Revoke every login token a user holds.
    fn delete_user_tokens(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<u64, sqlx::Error>> + Send;
    fn insert_reset_token(
        &self,
        token_hash: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Owner of an unused, unexpired reset token. Leaves the token untouched.
    fn reset_token_owner(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<String>, sqlx::Error>> + Send;
    /// Mark the token used, store the new password hash and burn the user's
    /// other outstanding reset tokens, all in one transaction. Returns `false`
    /// (and changes nothing) when the token is used, expired or belongs to
    /// someone else.
    fn redeem_reset_token(
        &self,
        token_hash: &str,
        user_id: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

impl TokenStore for SqliteStore {
    async fn insert_auth_token(
        &self,
        token_hash: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO auth_tokens (token_hash, user_id, created_at, expires_at) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(ts(&Utc::now()))
        .bind(ts(&expires_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_user_by_token_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, sqlx::Error> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             JOIN auth_tokens ON user_id = users.id \
             WHERE token_hash = ?1 AND expires_at > ?2"
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(token_hash)
            .bind(ts(&now))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn delete_auth_token(&self, token_hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM auth_tokens WHERE token_hash = ?1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_user_tokens(&self, user_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_reset_token(
        &self,
        token_hash: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (token_hash, user_id, created_at, expires_at) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(ts(&Utc::now()))
        .bind(ts(&expires_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reset_token_owner(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT user_id FROM password_reset_tokens \
             WHERE token_hash = ?1 AND used_at IS NULL AND expires_at > ?2",
        )
        .bind(token_hash)
        .bind(ts(&now))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(user_id,)| user_id))
    }

    async fn redeem_reset_token(
        &self,
        token_hash: &str,
        user_id: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let now = ts(&now);
        let mut tx = self.pool.begin().await?;
        let claimed = sqlx::query(
            "UPDATE password_reset_tokens SET used_at = ?3 \
             WHERE token_hash = ?1 AND user_id = ?2 AND used_at IS NULL AND expires_at > ?3",
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        if claimed.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(false);
        }
        sqlx::query("UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(password_hash)
            .bind(&now)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE password_reset_tokens SET used_at = ?2 WHERE user_id = ?1 AND used_at IS NULL",
        )
        .bind(user_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(true)
    }
}
