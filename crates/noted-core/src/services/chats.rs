use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::entities::{Chat, ChatMessage, ChatMessageStore, ChatStore, MessageRole, NewChatMessage};
use crate::error::{NotedError, Result};
use crate::util::truncate_chars;

/// Chat titles are the head of the first prompt.
pub const CHAT_TITLE_MAX_CHARS: usize = 50;

/// Start a chat from its first prompt.
///
/// The chat and its first user message are written in one transaction.  The
/// message carries no context id; the first reconcile of the session links it.
pub async fn create_chat<S: ChatStore>(
    store: &S,
    user_id: &str,
    prompt: &str,
) -> Result<(Chat, ChatMessage)> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(NotedError::Validation("Prompt is required".into()));
    }

    let now = Utc::now();
    let chat = Chat {
        id: Uuid::new_v4().to_string(),
        user_profile_id: user_id.to_owned(),
        title: truncate_chars(prompt, CHAT_TITLE_MAX_CHARS).to_owned(),
        last_viewed_at: Some(now),
        created_at: now,
        updated_at: now,
    };
    let first = NewChatMessage {
        chat_id: chat.id.clone(),
        role: MessageRole::User,
        content: prompt.to_owned(),
        chat_context_id: None,
    };

    let message = store.create_chat_with_message(chat.clone(), first).await?;
    info!(chat_id = %chat.id, user_id, "chat created");
    Ok((chat, message))
}

/// Fetch a chat the user owns and mark it viewed.
pub async fn get_chat<S: ChatStore>(store: &S, user_id: &str, chat_id: &str) -> Result<Chat> {
    let mut chat = require_chat(store, user_id, chat_id).await?;
    store.touch_chat(chat_id).await?;
    chat.last_viewed_at = Some(Utc::now());
    Ok(chat)
}

/// Ownership check without side effects.
pub async fn require_chat<S: ChatStore>(store: &S, user_id: &str, chat_id: &str) -> Result<Chat> {
    store
        .get_chat(chat_id, user_id)
        .await?
        .ok_or_else(|| NotedError::NotFound(format!("chat {chat_id}")))
}

pub async fn list_chats<S: ChatStore>(store: &S, user_id: &str) -> Result<Vec<Chat>> {
    Ok(store.list_chats(user_id).await?)
}

pub async fn rename_chat<S: ChatStore>(
    store: &S,
    user_id: &str,
    chat_id: &str,
    title: &str,
) -> Result<Chat> {
    let title = title.trim();
    if title.is_empty() {
        return Err(NotedError::Validation("Title is required".into()));
    }
    store
        .rename_chat(chat_id, user_id, title)
        .await?
        .ok_or_else(|| NotedError::NotFound(format!("chat {chat_id}")))
}

pub async fn delete_chat<S: ChatStore>(store: &S, user_id: &str, chat_id: &str) -> Result<()> {
    if store.delete_chat(chat_id, user_id).await? {
        info!(chat_id, user_id, "chat deleted");
        Ok(())
    } else {
        Err(NotedError::NotFound(format!("chat {chat_id}")))
    }
}

/// Persisted messages of a chat the user owns, oldest first.
pub async fn chat_messages<S>(store: &S, user_id: &str, chat_id: &str) -> Result<Vec<ChatMessage>>
where
    S: ChatStore + ChatMessageStore,
{
    require_chat(store, user_id, chat_id).await?;
    Ok(store.list_messages(chat_id).await?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::SqliteStore;
    use crate::entities::test_support::seed_user;

    #[tokio::test]
    async fn create_chat_trims_prompt_and_titles_from_it() {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = seed_user(&store).await;
        let prompt = format!("  {}  ", "a".repeat(80));

        let (chat, message) = create_chat(&store, &user.id, &prompt).await.unwrap();
        assert_eq!(chat.title.chars().count(), CHAT_TITLE_MAX_CHARS);
        assert_eq!(message.content, "a".repeat(80));
        assert_eq!(message.role, MessageRole::User);
        assert!(message.chat_context_id.is_none());

        let rows = chat_messages(&store, &user.id, &chat.id).await.unwrap();
        assert_eq!(rows, vec![message]);
    }

    #[tokio::test]
    async fn whitespace_prompt_is_rejected_without_writing() {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = seed_user(&store).await;

        let err = create_chat(&store, &user.id, " \n\t ").await.unwrap_err();
        assert!(matches!(err, NotedError::Validation(ref m) if m == "Prompt is required"));
        assert!(list_chats(&store, &user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn chats_are_private_to_their_owner() {
        let store = SqliteStore::in_memory().await.unwrap();
        let alice = seed_user(&store).await;
        let bob = seed_user(&store).await;
        let (chat, _) = create_chat(&store, &alice.id, "hello").await.unwrap();

        assert!(matches!(
            get_chat(&store, &bob.id, &chat.id).await,
            Err(NotedError::NotFound(_))
        ));
        assert!(matches!(
            chat_messages(&store, &bob.id, &chat.id).await,
            Err(NotedError::NotFound(_))
        ));
        assert!(get_chat(&store, &alice.id, &chat.id).await.is_ok());
    }

    #[tokio::test]
    async fn rename_and_delete() {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = seed_user(&store).await;
        let (chat, _) = create_chat(&store, &user.id, "draft").await.unwrap();

        let renamed = rename_chat(&store, &user.id, &chat.id, " Weekly plan ").await.unwrap();
        assert_eq!(renamed.title, "Weekly plan");

        delete_chat(&store, &user.id, &chat.id).await.unwrap();
        assert!(list_chats(&store, &user.id).await.unwrap().is_empty());
        assert!(matches!(
            delete_chat(&store, &user.id, &chat.id).await,
            Err(NotedError::NotFound(_))
        ));
    }
}
