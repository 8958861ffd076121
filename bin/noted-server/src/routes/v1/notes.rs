use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use noted_core::services::{Page, notes};
use utoipa::OpenApi;
use validator::Validate;

use crate::error::ServerError;
use crate::middleware::CurrentUser;
use crate::schemas::v1::PageQuery;
use crate::schemas::v1::note::{
    CreateNoteRequest, NoteActionResponse, NoteResponse, NoteSearchQuery, UpdateNoteRequest,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        create_note,
        list_notes,
        search_notes,
        get_note,
        update_note,
        delete_note,
        list_note_actions
    ),
    components(schemas(CreateNoteRequest, UpdateNoteRequest, NoteResponse, NoteActionResponse))
)]
pub struct NotesApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notes", post(create_note).get(list_notes))
        .route("/notes/search", get(search_notes))
        .route(
            "/notes/{id}",
            get(get_note).patch(update_note).delete(delete_note),
        )
        .route("/notes/{id}/actions", get(list_note_actions))
}

#[utoipa::path(
    post,
    path = "/v1/notes",
    tag = "notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 200, description = "Note created", body = NoteResponse),
        (status = 400, description = "Invalid note"),
        (status = 404, description = "Project not found"),
    )
)]
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<Json<NoteResponse>, ServerError> {
    req.validate()?;
    let note = notes::create_note(state.store.as_ref(), user.id(), req.into()).await?;
    Ok(Json(note.into()))
}

#[utoipa::path(
    get,
    path = "/v1/notes",
    tag = "notes",
    params(PageQuery),
    responses((status = 200, description = "Notes, newest first", body = Vec<NoteResponse>))
)]
pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<NoteResponse>>, ServerError> {
    let notes = notes::list_notes(state.store.as_ref(), user.id(), query.page()).await?;
    Ok(Json(notes.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/v1/notes/search",
    tag = "notes",
    params(NoteSearchQuery),
    responses((status = 200, description = "Notes whose title contains the query", body = Vec<NoteResponse>))
)]
pub async fn search_notes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<NoteSearchQuery>,
) -> Result<Json<Vec<NoteResponse>>, ServerError> {
    let page = Page::new(query.limit, query.offset);
    let title = query.title.as_deref().unwrap_or_default();
    let notes = notes::search_notes(state.store.as_ref(), user.id(), title, page).await?;
    Ok(Json(notes.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/v1/notes/{id}",
    tag = "notes",
    params(("id" = String, Path, description = "Note id")),
    responses(
        (status = 200, description = "Note found", body = NoteResponse),
        (status = 404, description = "Note not found"),
    )
)]
pub async fn get_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<NoteResponse>, ServerError> {
    let note = notes::get_note(state.store.as_ref(), user.id(), &id).await?;
    Ok(Json(note.into()))
}

#[utoipa::path(
    patch,
    path = "/v1/notes/{id}",
    tag = "notes",
    params(("id" = String, Path, description = "Note id")),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "Note updated", body = NoteResponse),
        (status = 404, description = "Note or project not found"),
    )
)]
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<UpdateNoteRequest>,
) -> Result<Json<NoteResponse>, ServerError> {
    req.validate()?;
    let note = notes::update_note(state.store.as_ref(), user.id(), &id, req.into()).await?;
    Ok(Json(note.into()))
}

#[utoipa::path(
    delete,
    path = "/v1/notes/{id}",
    tag = "notes",
    params(("id" = String, Path, description = "Note id")),
    responses(
        (status = 200, description = "Note deleted", body = serde_json::Value),
        (status = 404, description = "Note not found"),
    )
)]
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    notes::delete_note(state.store.as_ref(), user.id(), &id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[utoipa::path(
    get,
    path = "/v1/notes/{id}/actions",
    tag = "notes",
    params(("id" = String, Path, description = "Note id")),
    responses(
        (status = 200, description = "Note history, newest first", body = Vec<NoteActionResponse>),
        (status = 404, description = "Note not found"),
    )
)]
pub async fn list_note_actions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Vec<NoteActionResponse>>, ServerError> {
    let actions = notes::list_note_actions(state.store.as_ref(), user.id(), &id).await?;
    Ok(Json(actions.into_iter().map(Into::into).collect()))
}
