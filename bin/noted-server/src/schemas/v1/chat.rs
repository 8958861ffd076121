use noted_core::entities::{Chat, ChatMessage, MessageRole};
use noted_core::{ReconcileOutcome, SessionMessage};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateChatRequest {
    #[validate(length(max = 32768, message = "prompt is too long"))]
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct RenameChatRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub id: String,
    pub title: String,
    pub last_viewed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: String,
    pub chat_id: String,
    pub role: MessageRole,
    pub content: String,
    pub chat_context_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateChatResponse {
    pub chat: ChatResponse,
    pub message: MessageResponse,
}

/// The chat as a streaming session sees it after a fresh load.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub chat_id: String,
    pub messages: Vec<SessionMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct ReconcileRequest {
    /// Ephemeral id the session uses for the message.
    #[validate(length(min = 1, max = 200))]
    pub id: String,
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReconcileResponse {
    /// `already_processed`, `skipped`, `linked`, `updated`, `inserted` or `dropped`.
    pub outcome: String,
    pub message_id: Option<String>,
}

impl From<Chat> for ChatResponse {
    fn from(chat: Chat) -> Self {
        ChatResponse {
            id: chat.id,
            title: chat.title,
            last_viewed_at: chat.last_viewed_at.map(|t| t.to_rfc3339()),
            created_at: chat.created_at.to_rfc3339(),
            updated_at: chat.updated_at.to_rfc3339(),
        }
    }
}

impl From<ChatMessage> for MessageResponse {
    fn from(m: ChatMessage) -> Self {
        MessageResponse {
            id: m.id,
            chat_id: m.chat_id,
            role: m.role,
            content: m.content,
            chat_context_id: m.chat_context_id,
            created_at: m.created_at.to_rfc3339(),
            updated_at: m.updated_at.to_rfc3339(),
        }
    }
}

impl From<ReconcileOutcome> for ReconcileResponse {
    fn from(outcome: ReconcileOutcome) -> Self {
        let label = match &outcome {
            ReconcileOutcome::AlreadyProcessed => "already_processed",
            ReconcileOutcome::Skipped => "skipped",
            ReconcileOutcome::Linked { .. } => "linked",
            ReconcileOutcome::Updated { .. } => "updated",
            ReconcileOutcome::Inserted { .. } => "inserted",
            ReconcileOutcome::Dropped => "dropped",
        };
        ReconcileResponse {
            outcome: label.to_owned(),
            message_id: outcome.message_id().map(str::to_owned),
        }
    }
}
