//! Bodies of the streaming chat endpoint (`POST /api/chat`).

use noted_core::SessionMessage;
use noted_core::entities::MessageRole;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What the chat client sends on every turn: the whole session so far.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ChatStreamRequest {
    pub chat_id: Option<String>,
    /// Older clients send the chat id as `id`.
    pub id: Option<String>,
    pub messages: Option<Vec<SessionMessage>>,
}

impl ChatStreamRequest {
    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id
            .as_deref()
            .or(self.id.as_deref())
            .filter(|id| !id.trim().is_empty())
    }

    /// Newest user-authored message of the session.
    pub fn latest_user_message(&self) -> Option<&SessionMessage> {
        self.messages
            .as_deref()?
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
    }
}

/// One server-sent event of an assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    Start {
        #[serde(rename = "messageId")]
        message_id: String,
    },
    TextStart {
        id: String,
    },
    TextDelta {
        id: String,
        delta: String,
    },
    TextEnd {
        id: String,
    },
    Finish,
    Error {
        #[serde(rename = "errorText")]
        error_text: String,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn events_use_wire_names() {
        let start = serde_json::to_value(StreamEvent::Start {
            message_id: "m1".into(),
        })
        .unwrap();
        assert_eq!(start, json!({ "type": "start", "messageId": "m1" }));

        let delta = serde_json::to_value(StreamEvent::TextDelta {
            id: "t".into(),
            delta: "hi".into(),
        })
        .unwrap();
        assert_eq!(delta, json!({ "type": "text-delta", "id": "t", "delta": "hi" }));

        let err = serde_json::to_value(StreamEvent::Error {
            error_text: "boom".into(),
        })
        .unwrap();
        assert_eq!(err, json!({ "type": "error", "errorText": "boom" }));
    }

    #[test]
    fn request_accepts_either_id_field() {
        let req: ChatStreamRequest = serde_json::from_value(json!({
            "id": "chat-1",
            "messages": [
                { "id": "u1", "role": "user", "parts": [{ "type": "text", "text": "first" }] },
                { "id": "a1", "role": "assistant", "parts": [{ "type": "text", "text": "reply" }] },
                { "id": "u2", "role": "user", "parts": [{ "type": "text", "text": "second" }] }
            ]
        }))
        .unwrap();
        assert_eq!(req.chat_id(), Some("chat-1"));
        assert_eq!(req.latest_user_message().map(|m| m.id.as_str()), Some("u2"));
    }
}
