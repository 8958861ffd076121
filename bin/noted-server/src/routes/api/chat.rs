//! Streaming chat endpoint.
//!
//! The client posts the whole session on every turn.  The newest user message
//! is reconciled before the model is called; the assistant reply streams back
//! as server-sent events and is reconciled once the provider finishes.
//!
//! The provider is drained in a spawned task that feeds the response through
//! a channel.  A client that disconnects mid-turn does not stop the task, so
//! the finished reply is still persisted.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use futures::StreamExt;
use noted_core::completion::{CompletionStream, PromptMessage};
use noted_core::reconcile::StreamState;
use noted_core::services::chats;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Instrument, debug, info, info_span, warn};
use utoipa::OpenApi;
use uuid::Uuid;

use crate::error::ServerError;
use crate::middleware::CurrentUser;
use crate::schemas::stream::{ChatStreamRequest, StreamEvent};
use crate::state::AppState;

/// Buffered SSE frames between the provider task and the response body.
const EVENT_BUFFER: usize = 64;

#[derive(OpenApi)]
#[openapi(paths(stream_chat), components(schemas(StreamEvent)))]
pub struct StreamApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(stream_chat))
}

/// Stream one assistant turn.
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body(content = serde_json::Value, description = "`{ chat_id | id, messages }`"),
    responses(
        (status = 200, description = "Server-sent events terminated by `[DONE]`", content_type = "text/event-stream"),
        (status = 400, description = "Missing chat id or messages"),
        (status = 404, description = "Chat not found"),
        (status = 502, description = "Completion provider unavailable"),
    )
)]
pub async fn stream_chat(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<ChatStreamRequest>,
) -> Result<Response, ServerError> {
    let chat_id = req
        .chat_id()
        .ok_or_else(|| ServerError::BadRequest("chat_id or id is required".into()))?
        .to_owned();
    let messages = match req.messages.as_deref() {
        Some(messages) if !messages.is_empty() => messages,
        _ => return Err(ServerError::BadRequest("messages array is required".into())),
    };
    chats::require_chat(state.store.as_ref(), user.id(), &chat_id).await?;

    if let Some(latest) = req.latest_user_message() {
        let session = state.sessions.session(user.id(), &chat_id);
        let mut reconcile_state = session.lock().await;
        let outcome = state
            .reconciler()
            .reconcile(&chat_id, &mut reconcile_state, latest)
            .await?;
        debug!(chat_id = %chat_id, message_id = %latest.id, ?outcome, "user message reconciled");
    }

    let prompt: Vec<PromptMessage> = messages
        .iter()
        .filter(|m| m.state == StreamState::Complete)
        .map(|m| PromptMessage::new(m.role, m.text()))
        .filter(|m| !m.content.trim().is_empty())
        .collect();

    let model = state.config.chat_model.clone();
    let deltas = state.completions.stream(&model, prompt).await?;

    let turn = AssistantTurn {
        state: Arc::clone(&state),
        user_id: user.id().to_owned(),
        chat_id: chat_id.clone(),
        message_id: Uuid::new_v4().to_string(),
        text_id: Uuid::new_v4().to_string(),
    };
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let span = info_span!("assistant_turn", chat_id = %chat_id, message_id = %turn.message_id, model = %model);
    tokio::spawn(turn.run(deltas, tx).instrument(span));

    Ok(Sse::new(ReceiverStream::new(rx))
        .keep_alive(KeepAlive::default())
        .into_response())
}

struct AssistantTurn {
    state: Arc<AppState>,
    user_id: String,
    chat_id: String,
    message_id: String,
    text_id: String,
}

impl AssistantTurn {
    async fn run(self, mut deltas: CompletionStream, tx: mpsc::Sender<Result<Event, Infallible>>) {
        let mut out = EventSink::new(tx);
        out.event(&StreamEvent::Start {
            message_id: self.message_id.clone(),
        })
        .await;
        out.event(&StreamEvent::TextStart {
            id: self.text_id.clone(),
        })
        .await;

        let mut reply = String::new();
        let mut failure = None;
        while let Some(delta) = deltas.next().await {
            match delta {
                Ok(delta) => {
                    reply.push_str(&delta);
                    out.event(&StreamEvent::TextDelta {
                        id: self.text_id.clone(),
                        delta,
                    })
                    .await;
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        match &failure {
            None => {
                out.event(&StreamEvent::TextEnd {
                    id: self.text_id.clone(),
                })
                .await;
                out.event(&StreamEvent::Finish).await;
            }
            Some(e) => {
                warn!(error = %e, "completion stream failed");
                out.event(&StreamEvent::Error {
                    error_text: "completion provider error".into(),
                })
                .await;
            }
        }
        out.done().await;

        info!(reply_len = reply.len(), failed = failure.is_some(), "assistant turn finished");
        if failure.is_none() {
            self.persist(&reply).await;
        }
    }

    async fn persist(&self, reply: &str) {
        let session = self.state.sessions.session(&self.user_id, &self.chat_id);
        let mut reconcile_state = session.lock().await;
        let result = self
            .state
            .reconciler()
            .reconcile_assistant_message(&self.chat_id, &mut reconcile_state, &self.message_id, reply)
            .await;
        match result {
            Ok(outcome) => debug!(?outcome, "assistant message reconciled"),
            Err(e) => warn!(error = %e, "failed to persist assistant message"),
        }
    }
}

/// Writes SSE frames; keeps going after the client hangs up.
struct EventSink {
    tx: mpsc::Sender<Result<Event, Infallible>>,
    client_gone: bool,
}

impl EventSink {
    fn new(tx: mpsc::Sender<Result<Event, Infallible>>) -> Self {
        Self {
            tx,
            client_gone: false,
        }
    }

    async fn event(&mut self, event: &StreamEvent) {
        match Event::default().json_data(event) {
            Ok(frame) => self.send(frame).await,
            Err(e) => warn!(error = %e, "failed to encode stream event"),
        }
    }

    async fn done(&mut self) {
        self.send(Event::default().data("[DONE]")).await;
    }

    async fn send(&mut self, frame: Event) {
        if self.client_gone {
            return;
        }
        if self.tx.send(Ok(frame)).await.is_err() {
            debug!("client disconnected; draining provider");
            self.client_gone = true;
        }
    }
}
