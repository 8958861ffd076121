//! Bearer-token authentication.
//!
//! Resolves `Authorization: Bearer <api_token>` to a profile and stores it in
//! the request extensions as [`CurrentUser`].  Handlers extract it with
//! `Extension<CurrentUser>`.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use noted_core::entities::UserProfile;
use noted_core::services::profiles;
use tracing::debug;

use crate::error::ServerError;
use crate::state::AppState;

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserProfile);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }
}

pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = token else {
        debug!("request without bearer token");
        return ServerError::Unauthorized.into_response();
    };

    match profiles::authenticate(state.store.as_ref(), token).await {
        Ok(profile) => {
            tracing::Span::current().record("user_id", profile.id.as_str());
            req.extensions_mut().insert(CurrentUser(profile));
            next.run(req).await
        }
        Err(e) => ServerError::from(e).into_response(),
    }
}
