pub mod activity;
pub mod chats;
pub mod notes;
pub mod profile;
pub mod projects;

use std::sync::Arc;

use axum::Router;
use utoipa::OpenApi;

use crate::state::AppState;

/// Routes nested under `/v1`; all require a bearer token.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(profile::router())
        .merge(activity::router())
        .merge(chats::router())
        .merge(notes::router())
        .merge(projects::router())
}

#[derive(OpenApi)]
#[openapi()]
pub struct V1Api;

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut spec = V1Api::openapi();
    spec.merge(profile::ProfileApi::openapi());
    spec.merge(activity::ActivityApi::openapi());
    spec.merge(chats::ChatsApi::openapi());
    spec.merge(notes::NotesApi::openapi());
    spec.merge(projects::ProjectsApi::openapi());
    spec
}
