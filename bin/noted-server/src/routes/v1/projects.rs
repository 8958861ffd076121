use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use noted_core::services::{Page, notes, projects};
use utoipa::OpenApi;
use validator::Validate;

use crate::error::ServerError;
use crate::middleware::CurrentUser;
use crate::schemas::v1::PageQuery;
use crate::schemas::v1::note::NoteResponse;
use crate::schemas::v1::project::{
    CreateProjectRequest, ProjectResponse, ProjectSearchQuery, UpdateProjectRequest,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        create_project,
        list_projects,
        search_projects,
        get_project_by_slug,
        list_project_notes,
        get_project,
        update_project,
        delete_project
    ),
    components(schemas(CreateProjectRequest, UpdateProjectRequest, ProjectResponse))
)]
pub struct ProjectsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects", post(create_project).get(list_projects))
        .route("/projects/search", get(search_projects))
        .route("/projects/slug/{slug}", get(get_project_by_slug))
        .route("/projects/slug/{slug}/notes", get(list_project_notes))
        .route(
            "/projects/{id}",
            get(get_project).patch(update_project).delete(delete_project),
        )
}

#[utoipa::path(
    post,
    path = "/v1/projects",
    tag = "projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 200, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Invalid name or slug already taken"),
    )
)]
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<Json<ProjectResponse>, ServerError> {
    req.validate()?;
    let project = projects::create_project(state.store.as_ref(), user.id(), req.into()).await?;
    Ok(Json(project.into()))
}

#[utoipa::path(
    get,
    path = "/v1/projects",
    tag = "projects",
    params(PageQuery),
    responses((status = 200, description = "Projects, newest first", body = Vec<ProjectResponse>))
)]
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<ProjectResponse>>, ServerError> {
    let projects = projects::list_projects(state.store.as_ref(), user.id(), query.page()).await?;
    Ok(Json(projects.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/v1/projects/search",
    tag = "projects",
    params(ProjectSearchQuery),
    responses((status = 200, description = "Projects whose name contains the query", body = Vec<ProjectResponse>))
)]
pub async fn search_projects(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ProjectSearchQuery>,
) -> Result<Json<Vec<ProjectResponse>>, ServerError> {
    let page = Page::new(query.limit, query.offset);
    let name = query.name.as_deref().unwrap_or_default();
    let projects = projects::search_projects(state.store.as_ref(), user.id(), name, page).await?;
    Ok(Json(projects.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/v1/projects/slug/{slug}",
    tag = "projects",
    params(("slug" = String, Path, description = "Project slug")),
    responses(
        (status = 200, description = "Project found", body = ProjectResponse),
        (status = 404, description = "Project not found"),
    )
)]
pub async fn get_project_by_slug(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(slug): Path<String>,
) -> Result<Json<ProjectResponse>, ServerError> {
    let project = projects::get_project_by_slug(state.store.as_ref(), user.id(), &slug).await?;
    Ok(Json(project.into()))
}

#[utoipa::path(
    get,
    path = "/v1/projects/slug/{slug}/notes",
    tag = "projects",
    params(("slug" = String, Path, description = "Project slug")),
    responses(
        (status = 200, description = "Notes filed under the project", body = Vec<NoteResponse>),
        (status = 404, description = "Project not found"),
    )
)]
pub async fn list_project_notes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<NoteResponse>>, ServerError> {
    let notes = notes::list_project_notes(state.store.as_ref(), user.id(), &slug).await?;
    Ok(Json(notes.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/v1/projects/{id}",
    tag = "projects",
    params(("id" = String, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project found", body = ProjectResponse),
        (status = 404, description = "Project not found"),
    )
)]
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<ProjectResponse>, ServerError> {
    let project = projects::get_project(state.store.as_ref(), user.id(), &id).await?;
    Ok(Json(project.into()))
}

#[utoipa::path(
    patch,
    path = "/v1/projects/{id}",
    tag = "projects",
    params(("id" = String, Path, description = "Project id")),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Project updated", body = ProjectResponse),
        (status = 400, description = "Invalid name or slug already taken"),
        (status = 404, description = "Project not found"),
    )
)]
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<Json<ProjectResponse>, ServerError> {
    req.validate()?;
    let project =
        projects::update_project(state.store.as_ref(), user.id(), &id, req.into()).await?;
    Ok(Json(project.into()))
}

#[utoipa::path(
    delete,
    path = "/v1/projects/{id}",
    tag = "projects",
    params(("id" = String, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project deleted; its notes are unfiled", body = serde_json::Value),
        (status = 404, description = "Project not found"),
    )
)]
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    projects::delete_project(state.store.as_ref(), user.id(), &id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
