//! Persistence layer.
//!
//! Each entity family has a store trait (`UserStore`, `MessageStore`, …)
//! implemented by [`SqliteStore`]. Handlers only depend on the traits, so a
//! different backend can be slotted in by implementing them for a new type and
//! changing the concrete type in [`crate::state::AppState`].
//!
//! All trait methods use `impl Future` in their signatures (stable since Rust
//! 1.75) so no extra `async-trait` crate is required here.
//!
//! Queries use the runtime-checked `sqlx::query` form so no `DATABASE_URL` is
//! needed at compile time. Timestamps are stored as fixed-width RFC 3339 text
//! (microsecond precision, `Z` suffix) so that lexical order equals
//! chronological order.

pub mod activity;
pub mod ai_chat;
pub mod contact;
pub mod conversation;
pub mod dao;
pub mod message;
pub mod notification;
pub mod showcase;
pub mod token;
pub mod user;

pub use dao::{
    ActivityType, AiChatMessage, ChatRole, Contact, Conversation, Message, Notification,
    NotificationKind, Project, ProjectImage, ProjectStatus, Skill, TimelineEntry, TimelineKind, User,
    UserActivity,
};

pub use activity::ActivityStore;
pub use ai_chat::AiChatStore;
pub use contact::ContactStore;
pub use conversation::ConversationStore;
pub use message::MessageStore;
pub use notification::NotificationStore;
pub use showcase::{ProjectStore, ResumeStore, SkillStore, TimelineStore};
pub use token::TokenStore;
pub use user::UserStore;

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// SQLite-backed store for every entity.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url` and run pending migrations.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g. `"sqlite://folio.db"`
    /// or `"sqlite::memory:"` for tests.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        // Every connection to `:memory:` is its own database, so pin the pool
        // to a single connection in that case.
        let max_connections = if url.contains(":memory:") { 1 } else { 8 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn in_memory() -> Self {
        Self::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite should open")
    }
}

/// Format a timestamp for storage.
pub(crate) fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp, logging and substituting "now" on corrupt data.
pub(crate) fn parse_ts(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        tracing::warn!(raw = %raw, error = %e, "failed to parse stored timestamp; using now");
        Utc::now()
    })
}

pub(crate) fn parse_opt_ts(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.as_deref().map(parse_ts)
}
