//! Hosted chat-completion providers.
//!
//! The server only needs a stream of text deltas for a conversation, so the
//! provider surface is a single trait.  [`GenaiProvider`] talks to whichever
//! hosted model `genai` resolves from the model name (API keys come from the
//! provider's usual environment variable, e.g. `OPENAI_API_KEY`).

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use genai::chat::{ChatMessage as GenaiMessage, ChatRequest, ChatStreamEvent};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entities::MessageRole;
use crate::error::Result;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant inside a note-taking app. Answer concisely.";

/// One turn of the conversation handed to a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: MessageRole,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Stream of text deltas; an `Err` item ends the turn.
pub type CompletionStream = BoxStream<'static, Result<String>>;

#[async_trait]
pub trait CompletionProvider: Send + Sync + 'static {
    /// Start a streamed completion for `messages` with `model`.
    async fn stream(&self, model: &str, messages: Vec<PromptMessage>) -> Result<CompletionStream>;
}

/// [`CompletionProvider`] backed by the `genai` multi-provider client.
pub struct GenaiProvider {
    client: genai::Client,
    system_prompt: Option<String>,
}

impl GenaiProvider {
    pub fn new() -> Self {
        Self {
            client: genai::Client::default(),
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_owned()),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    fn build_request(&self, messages: Vec<PromptMessage>) -> ChatRequest {
        let mut turns = Vec::with_capacity(messages.len());
        for message in messages {
            turns.push(match message.role {
                MessageRole::User => GenaiMessage::user(message.content),
                MessageRole::Assistant => GenaiMessage::assistant(message.content),
            });
        }
        let request = ChatRequest::new(turns);
        match &self.system_prompt {
            Some(system) => request.with_system(system.clone()),
            None => request,
        }
    }
}

impl Default for GenaiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for GenaiProvider {
    async fn stream(&self, model: &str, messages: Vec<PromptMessage>) -> Result<CompletionStream> {
        debug!(model, turns = messages.len(), "starting hosted completion");
        let request = self.build_request(messages);
        let response = self.client.exec_chat_stream(model, request, None).await?;

        let deltas = response.stream.filter_map(|event| async move {
            match event {
                Ok(ChatStreamEvent::Chunk(chunk)) if !chunk.content.is_empty() => {
                    Some(Ok(chunk.content))
                }
                Ok(_) => None,
                Err(e) => Some(Err(e.into())),
            }
        });
        Ok(deltas.boxed())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn request_keeps_turn_order_and_system_prompt() {
        let provider = GenaiProvider::new().with_system_prompt("be brief");
        let request = provider.build_request(vec![
            PromptMessage::new(MessageRole::User, "hi"),
            PromptMessage::new(MessageRole::Assistant, "hello"),
            PromptMessage::new(MessageRole::User, "again"),
        ]);
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.system.as_deref(), Some("be brief"));
    }

    #[test]
    fn default_provider_uses_default_system_prompt() {
        let request = GenaiProvider::default()
            .build_request(vec![PromptMessage::new(MessageRole::User, "hi")]);
        assert_eq!(request.system.as_deref(), Some(DEFAULT_SYSTEM_PROMPT));
    }
}
