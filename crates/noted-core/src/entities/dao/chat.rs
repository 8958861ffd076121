use chrono::{DateTime, Utc};

/// A row in the `chats` table.
#[derive(Debug, Clone)]
pub struct Chat {
    pub id: String,
    pub user_profile_id: String,
    pub title: String,
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
