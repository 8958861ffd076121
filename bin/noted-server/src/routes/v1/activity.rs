use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Json, Router};
use noted_core::services::activity;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::middleware::CurrentUser;
use crate::schemas::v1::activity::ActivityResponse;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(recent_activity), components(schemas(ActivityResponse)))]
pub struct ActivityApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/activity", get(recent_activity))
}

/// Most recently viewed notes, projects and chats.
#[utoipa::path(
    get,
    path = "/v1/activity",
    tag = "activity",
    responses((status = 200, description = "Recent activity", body = ActivityResponse))
)]
pub async fn recent_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ActivityResponse>, ServerError> {
    let recent = activity::recent_activity(state.store.as_ref(), user.id()).await?;
    Ok(Json(recent.into()))
}
