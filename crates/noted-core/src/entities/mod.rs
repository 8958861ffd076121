//! Persistence layer.
//!
//! Each table gets a store trait ([`ChatStore`], [`ChatMessageStore`],
//! [`NoteStore`], [`ProjectStore`], [`ProfileStore`]) implemented for
//! [`SqliteStore`].  Callers are generic over the trait so a different
//! backend only has to provide these impls.
//!
//! Queries use the runtime-checked `sqlx::query` form so no `DATABASE_URL`
//! is needed at compile time.  Timestamps are stored as fixed-width RFC3339
//! text (microsecond precision, `Z` suffix) so lexical order equals
//! chronological order.

pub mod chat;
pub mod dao;
pub mod message;
pub mod note;
pub mod profile;
pub mod project;

pub use dao::{
    Chat, ChatMessage, MessageRole, NewChatMessage, Note, NoteAction, NoteEventType, Project,
    UpsertResult, UserProfile,
};

pub use chat::ChatStore;
pub use message::ChatMessageStore;
pub use note::NoteStore;
pub use profile::{ProfileStore, ProfileUpdate};
pub use project::ProjectStore;

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::Result;

/// SQLite-backed store for every table.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pub(crate) pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url` and run pending migrations.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g. `"sqlite://noted.db"`
    /// or `"sqlite::memory:"` for tests.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` opens its own database, so the pool
        // must hold exactly one and never recycle it.
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(8)
                .connect_with(options)
                .await?
        };

        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// In-memory database with the schema applied.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub(crate) fn to_db_time(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn now_db_time() -> String {
    to_db_time(&Utc::now())
}

pub(crate) fn parse_db_time(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        tracing::warn!(raw = %raw, error = %e, "failed to parse stored timestamp; using now");
        Utc::now()
    })
}

pub(crate) fn parse_opt_db_time(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.as_deref().map(parse_db_time)
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    /// Insert a profile and return it.
    pub async fn seed_user(store: &SqliteStore) -> UserProfile {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let profile = UserProfile {
            email: format!("{id}@example.test"),
            api_token: format!("token-{id}"),
            id,
            first_name: Some("Ada".into()),
            last_name: None,
            middle_name: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        };
        store.create_profile(profile.clone()).await.expect("seed user");
        profile
    }

    /// Insert an empty chat owned by a fresh user and return its id.
    pub async fn seed_chat(store: &SqliteStore) -> String {
        let user = seed_user(store).await;
        let id = Uuid::new_v4().to_string();
        let now = to_db_time(&Utc::now());
        sqlx::query(
            "INSERT INTO chats (id, user_profile_id, title, created_at, updated_at) \
             VALUES (?1, ?2, 'seed', ?3, ?3)",
        )
        .bind(&id)
        .bind(&user.id)
        .bind(&now)
        .execute(&store.pool)
        .await
        .expect("seed chat");
        id
    }
}
