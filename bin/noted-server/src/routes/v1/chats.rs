//! Chat CRUD plus the session endpoints driven by the streaming client.
//!
//! `GET /chats/{id}/session` is the page-load path: it replaces the server's
//! reconcile state for the chat and returns the persisted history keyed by
//! ephemeral id.  `POST /chats/{id}/reconcile` persists one finished message.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use noted_core::entities::MessageRole;
use noted_core::services::chats;
use tracing::debug;
use utoipa::OpenApi;
use validator::Validate;

use crate::error::ServerError;
use crate::middleware::CurrentUser;
use crate::schemas::v1::chat::{
    ChatResponse, CreateChatRequest, CreateChatResponse, MessageResponse, ReconcileRequest,
    ReconcileResponse, RenameChatRequest, SessionResponse,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        create_chat,
        list_chats,
        get_chat,
        rename_chat,
        delete_chat,
        list_chat_messages,
        load_session,
        reconcile_message
    ),
    components(schemas(
        CreateChatRequest,
        CreateChatResponse,
        ChatResponse,
        MessageResponse,
        RenameChatRequest,
        SessionResponse,
        ReconcileRequest,
        ReconcileResponse
    ))
)]
pub struct ChatsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chats", post(create_chat).get(list_chats))
        .route(
            "/chats/{id}",
            get(get_chat).patch(rename_chat).delete(delete_chat),
        )
        .route("/chats/{id}/messages", get(list_chat_messages))
        .route("/chats/{id}/session", get(load_session))
        .route("/chats/{id}/reconcile", post(reconcile_message))
}

/// Start a chat from its first prompt.
#[utoipa::path(
    post,
    path = "/v1/chats",
    tag = "chats",
    request_body = CreateChatRequest,
    responses(
        (status = 200, description = "Chat created", body = CreateChatResponse),
        (status = 400, description = "Prompt missing or too long"),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn create_chat(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateChatRequest>,
) -> Result<Json<CreateChatResponse>, ServerError> {
    req.validate()?;
    let (chat, message) = chats::create_chat(state.store.as_ref(), user.id(), &req.prompt).await?;
    Ok(Json(CreateChatResponse {
        chat: chat.into(),
        message: message.into(),
    }))
}

#[utoipa::path(
    get,
    path = "/v1/chats",
    tag = "chats",
    responses(
        (status = 200, description = "Chats of the caller, newest first", body = Vec<ChatResponse>),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn list_chats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<ChatResponse>>, ServerError> {
    let chats = chats::list_chats(state.store.as_ref(), user.id()).await?;
    Ok(Json(chats.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/v1/chats/{id}",
    tag = "chats",
    params(("id" = String, Path, description = "Chat id")),
    responses(
        (status = 200, description = "Chat found", body = ChatResponse),
        (status = 404, description = "Chat not found"),
    )
)]
pub async fn get_chat(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<ChatResponse>, ServerError> {
    let chat = chats::get_chat(state.store.as_ref(), user.id(), &id).await?;
    Ok(Json(chat.into()))
}

#[utoipa::path(
    patch,
    path = "/v1/chats/{id}",
    tag = "chats",
    params(("id" = String, Path, description = "Chat id")),
    request_body = RenameChatRequest,
    responses(
        (status = 200, description = "Chat renamed", body = ChatResponse),
        (status = 400, description = "Invalid title"),
        (status = 404, description = "Chat not found"),
    )
)]
pub async fn rename_chat(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<RenameChatRequest>,
) -> Result<Json<ChatResponse>, ServerError> {
    req.validate()?;
    let chat = chats::rename_chat(state.store.as_ref(), user.id(), &id, &req.title).await?;
    Ok(Json(chat.into()))
}

#[utoipa::path(
    delete,
    path = "/v1/chats/{id}",
    tag = "chats",
    params(("id" = String, Path, description = "Chat id")),
    responses(
        (status = 200, description = "Chat deleted", body = serde_json::Value),
        (status = 404, description = "Chat not found"),
    )
)]
pub async fn delete_chat(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    chats::delete_chat(state.store.as_ref(), user.id(), &id).await?;
    state.sessions.remove(user.id(), &id);
    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[utoipa::path(
    get,
    path = "/v1/chats/{id}/messages",
    tag = "chats",
    params(("id" = String, Path, description = "Chat id")),
    responses(
        (status = 200, description = "Stored messages, oldest first", body = Vec<MessageResponse>),
        (status = 404, description = "Chat not found"),
    )
)]
pub async fn list_chat_messages(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, ServerError> {
    let messages = chats::chat_messages(state.store.as_ref(), user.id(), &id).await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

/// Load the chat into a fresh streaming session.
#[utoipa::path(
    get,
    path = "/v1/chats/{id}/session",
    tag = "chats",
    params(("id" = String, Path, description = "Chat id")),
    responses(
        (status = 200, description = "Session history keyed by ephemeral id", body = SessionResponse),
        (status = 404, description = "Chat not found"),
    )
)]
pub async fn load_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ServerError> {
    chats::get_chat(state.store.as_ref(), user.id(), &id).await?;

    let session = state.sessions.reset(user.id(), &id);
    let mut reconcile_state = session.lock().await;
    let messages = state.reconciler().load(&id, &mut reconcile_state).await?;
    debug!(chat_id = %id, count = messages.len(), "session loaded");

    Ok(Json(SessionResponse {
        chat_id: id,
        messages,
    }))
}

/// Persist one finished session message.
#[utoipa::path(
    post,
    path = "/v1/chats/{id}/reconcile",
    tag = "chats",
    params(("id" = String, Path, description = "Chat id")),
    request_body = ReconcileRequest,
    responses(
        (status = 200, description = "Reconciliation outcome", body = ReconcileResponse),
        (status = 400, description = "Invalid message"),
        (status = 404, description = "Chat not found"),
        (status = 500, description = "Store write failed under the strict policy"),
    )
)]
pub async fn reconcile_message(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>, ServerError> {
    req.validate()?;
    chats::require_chat(state.store.as_ref(), user.id(), &id).await?;

    let session = state.sessions.session(user.id(), &id);
    let mut reconcile_state = session.lock().await;
    let reconciler = state.reconciler();
    let outcome = match req.role {
        MessageRole::User => {
            reconciler
                .reconcile_user_message(&id, &mut reconcile_state, &req.id, &req.content)
                .await?
        }
        MessageRole::Assistant => {
            reconciler
                .reconcile_assistant_message(&id, &mut reconcile_state, &req.id, &req.content)
                .await?
        }
    };
    Ok(Json(outcome.into()))
}
