use chrono::{DateTime, Utc};

/// A row in the `projects` table.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
