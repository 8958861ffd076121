use noted_core::entities::Project;
use noted_core::services::{NewProject, ProjectUpdate};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ProjectSearchQuery {
    pub name: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub last_viewed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CreateProjectRequest> for NewProject {
    fn from(req: CreateProjectRequest) -> Self {
        NewProject {
            name: req.name,
            description: req.description,
        }
    }
}

impl From<UpdateProjectRequest> for ProjectUpdate {
    fn from(req: UpdateProjectRequest) -> Self {
        ProjectUpdate {
            name: req.name,
            description: req.description,
        }
    }
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        ProjectResponse {
            id: p.id,
            name: p.name,
            slug: p.slug,
            description: p.description,
            last_viewed_at: p.last_viewed_at.map(|t| t.to_rfc3339()),
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}
