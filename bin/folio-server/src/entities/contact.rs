use crate::entities::{Contact, SqliteStore, parse_ts, ts};
use std::future::Future;

pub trait ContactStore: Send + Sync + 'static {
    fn insert_contact(&self, contact: Contact) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// All submissions, newest first.
    fn list_contacts(&self) -> impl Future<Output = Result<Vec<Contact>, sqlx::Error>> + Send;
    fn get_contact(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Contact>, sqlx::Error>> + Send;
    /// Returns `false` when nothing was deleted.
    fn delete_contact(&self, id: &str) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

type ContactRow = (String, String, String, String, String, Option<String>, String, String);

fn to_contact(
    (id, name, email, subject, message, ip_address, user_agent, created_at): ContactRow,
) -> Contact {
    Contact {
        id,
        name,
        email,
        subject,
        message,
        ip_address,
        user_agent,
        created_at: parse_ts(&created_at),
    }
}

impl ContactStore for SqliteStore {
    async fn insert_contact(&self, c: Contact) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO contacts (id, name, email, subject, message, ip_address, user_agent, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&c.id)
        .bind(&c.name)
        .bind(&c.email)
        .bind(&c.subject)
        .bind(&c.message)
        .bind(&c.ip_address)
        .bind(&c.user_agent)
        .bind(ts(&c.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>, sqlx::Error> {
        let rows: Vec<ContactRow> = sqlx::query_as(
            "SELECT id, name, email, subject, message, ip_address, user_agent, created_at \
             FROM contacts ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(to_contact).collect())
    }

    async fn get_contact(&self, id: &str) -> Result<Option<Contact>, sqlx::Error> {
        let row: Option<ContactRow> = sqlx::query_as(
            "SELECT id, name, email, subject, message, ip_address, user_agent, created_at \
             FROM contacts WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(to_contact))
    }

    async fn delete_contact(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
