use noted_core::entities::{Note, NoteAction, NoteEventType};
use noted_core::services::{NewNote, NoteUpdate};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::schemas::double_option;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateNoteRequest {
    #[validate(length(max = 200))]
    pub title: Option<String>,
    /// Editor document, stored verbatim.
    pub content: Option<String>,
    pub project_id: Option<String>,
}

/// Partial update.  Send `"project_id": null` to remove the note from its
/// project.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateNoteRequest {
    #[validate(length(max = 200))]
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub project_id: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct NoteSearchQuery {
    pub title: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NoteResponse {
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    pub project_id: Option<String>,
    pub last_viewed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NoteActionResponse {
    pub id: String,
    pub note_id: String,
    pub actor_id: String,
    pub event_type: NoteEventType,
    pub details: Option<String>,
    pub created_at: String,
}

impl From<CreateNoteRequest> for NewNote {
    fn from(req: CreateNoteRequest) -> Self {
        NewNote {
            title: req.title,
            content: req.content,
            project_id: req.project_id,
        }
    }
}

impl From<UpdateNoteRequest> for NoteUpdate {
    fn from(req: UpdateNoteRequest) -> Self {
        NoteUpdate {
            title: req.title,
            content: req.content,
            project_id: req.project_id,
        }
    }
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        NoteResponse {
            id: note.id,
            title: note.title,
            content: note.content,
            project_id: note.project_id,
            last_viewed_at: note.last_viewed_at.map(|t| t.to_rfc3339()),
            created_at: note.created_at.to_rfc3339(),
            updated_at: note.updated_at.to_rfc3339(),
        }
    }
}

impl From<NoteAction> for NoteActionResponse {
    fn from(action: NoteAction) -> Self {
        NoteActionResponse {
            id: action.id,
            note_id: action.note_id,
            actor_id: action.actor_id,
            event_type: action.event_type,
            details: action.details,
            created_at: action.created_at.to_rfc3339(),
        }
    }
}
