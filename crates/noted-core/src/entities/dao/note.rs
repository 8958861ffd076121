use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// A row in the `notes` table.
#[derive(Debug, Clone)]
pub struct Note {
    pub id: String,
    pub author_id: String,
    pub project_id: Option<String>,
    pub title: String,
    /// Serialized editor document; opaque to the server.
    pub content: Option<String>,
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of entry in a note's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NoteEventType {
    #[strum(serialize = "created")]
    Created,
    #[strum(serialize = "updated")]
    Updated,
    #[strum(serialize = "deleted")]
    Deleted,
    #[strum(serialize = "renamed")]
    Renamed,
    #[strum(serialize = "assign_to_project")]
    AssignToProject,
    #[strum(serialize = "remove_from_project")]
    RemoveFromProject,
}

/// A row in the `note_actions` table.
#[derive(Debug, Clone)]
pub struct NoteAction {
    pub id: String,
    pub note_id: String,
    pub actor_id: String,
    pub event_type: NoteEventType,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}
