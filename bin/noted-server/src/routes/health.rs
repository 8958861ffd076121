//! Liveness check.
//!
//! Answers without a token.  Reports 503 when the database stops answering.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::warn;
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health))]
pub struct HealthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server and database reachable", body = Value),
        (status = 503, description = "Database unreachable", body = Value)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let database_ok = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "health check could not reach the database");
            false
        }
    };
    report(database_ok)
}

fn report(database_ok: bool) -> (StatusCode, Json<Value>) {
    let (status, summary, database) = if database_ok {
        (StatusCode::OK, "ok", "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unreachable")
    };
    let body = json!({
        "status": summary,
        "database": database,
        "version": env!("CARGO_PKG_VERSION"),
    });
    (status, Json(body))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unreachable_database_reports_degraded() {
        let (status, Json(body)) = report(false);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["database"], "unreachable");
    }

    #[test]
    fn healthy_report_carries_version() {
        let (status, Json(body)) = report(true);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "ok");
        assert!(!body["version"].as_str().unwrap_or("").is_empty());
    }
}
