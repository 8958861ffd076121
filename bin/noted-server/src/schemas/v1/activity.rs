use noted_core::services::RecentActivity;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::schemas::v1::chat::ChatResponse;
use crate::schemas::v1::note::NoteResponse;
use crate::schemas::v1::project::ProjectResponse;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivityResponse {
    pub notes: Vec<NoteResponse>,
    pub projects: Vec<ProjectResponse>,
    pub chats: Vec<ChatResponse>,
}

impl From<RecentActivity> for ActivityResponse {
    fn from(a: RecentActivity) -> Self {
        ActivityResponse {
            notes: a.notes.into_iter().map(Into::into).collect(),
            projects: a.projects.into_iter().map(Into::into).collect(),
            chats: a.chats.into_iter().map(Into::into).collect(),
        }
    }
}
