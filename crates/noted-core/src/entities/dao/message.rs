use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Author of a chat message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    #[strum(serialize = "user")]
    User,
    #[strum(serialize = "assistant")]
    Assistant,
}

/// A single message row in the `chat_messages` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub chat_id: String,
    pub role: MessageRole,
    pub content: String,
    /// Ephemeral session id this row is linked to, if any.
    pub chat_context_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for `chat_messages`; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub chat_id: String,
    pub role: MessageRole,
    pub content: String,
    pub chat_context_id: Option<String>,
}

/// Result of an upsert keyed on `(chat_id, chat_context_id)`.
#[derive(Debug, Clone)]
pub struct UpsertResult {
    pub message: ChatMessage,
    /// `true` when a new row was created, `false` when an existing one was updated.
    pub inserted: bool,
}
