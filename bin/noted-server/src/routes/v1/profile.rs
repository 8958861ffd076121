use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Json, Router};
use noted_core::services::profiles;
use utoipa::OpenApi;
use validator::Validate;

use crate::error::ServerError;
use crate::middleware::CurrentUser;
use crate::schemas::v1::profile::{ProfileResponse, UpdateProfileRequest};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(get_profile, update_profile),
    components(schemas(ProfileResponse, UpdateProfileRequest))
)]
pub struct ProfileApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/profile", get(get_profile).patch(update_profile))
}

#[utoipa::path(
    get,
    path = "/v1/profile",
    tag = "profile",
    responses(
        (status = 200, description = "Profile of the caller", body = ProfileResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn get_profile(Extension(user): Extension<CurrentUser>) -> Json<ProfileResponse> {
    Json(user.0.into())
}

#[utoipa::path(
    patch,
    path = "/v1/profile",
    tag = "profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Invalid field"),
    )
)]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ServerError> {
    req.validate()?;
    let profile = profiles::update_profile(state.store.as_ref(), user.id(), req.into()).await?;
    Ok(Json(profile.into()))
}
