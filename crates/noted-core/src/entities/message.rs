use std::future::Future;

use uuid::Uuid;

use crate::entities::{
    ChatMessage, MessageRole, NewChatMessage, SqliteStore, UpsertResult, now_db_time,
    parse_db_time,
};

const MESSAGE_COLUMNS: &str =
    "id, chat_id, role, content, chat_context_id, created_at, updated_at";

type MessageRow = (String, String, String, String, Option<String>, String, String);

/// Query surface over `chat_messages` consumed by the reconciler.
pub trait ChatMessageStore: Send + Sync + 'static {
    /// Non-deleted messages of a chat, oldest first.  Unknown chat ids yield
    /// an empty list.
    fn list_messages(
        &self,
        chat_id: &str,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, sqlx::Error>> + Send;

    fn insert_message(
        &self,
        msg: NewChatMessage,
    ) -> impl Future<Output = Result<ChatMessage, sqlx::Error>> + Send;

    /// Replace the content of a row by durable id.
    fn update_message(
        &self,
        id: &str,
        content: &str,
    ) -> impl Future<Output = Result<Option<ChatMessage>, sqlx::Error>> + Send;

    /// Replace the content of the live row tagged with `context_id`; `None`
    /// when no live row carries that tag.
    fn update_message_by_context_id(
        &self,
        chat_id: &str,
        context_id: &str,
        content: &str,
    ) -> impl Future<Output = Result<Option<ChatMessage>, sqlx::Error>> + Send;

    /// Non-deleted rows with the given role and content that have no context
    /// id yet, oldest first.
    fn find_unlinked_messages(
        &self,
        chat_id: &str,
        role: MessageRole,
        content: &str,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, sqlx::Error>> + Send;

    /// Attach `context_id` to an unlinked row.  Returns `false` if the row is
    /// already linked, deleted, or another row already carries the tag.
    fn link_message(
        &self,
        id: &str,
        chat_id: &str,
        context_id: &str,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;

    /// Insert a row tagged with `context_id`, or update the content of the
    /// existing one, in a single statement.  `None` when the tagged row has
    /// been soft-deleted; it is left untouched.
    fn upsert_message_by_context_id(
        &self,
        chat_id: &str,
        context_id: &str,
        role: MessageRole,
        content: &str,
    ) -> impl Future<Output = Result<Option<UpsertResult>, sqlx::Error>> + Send;
}

fn into_message(row: MessageRow) -> ChatMessage {
    let (id, chat_id, role, content, chat_context_id, created_at, updated_at) = row;
    let role = role.parse().unwrap_or_else(|_| {
        tracing::warn!(message_id = %id, raw = %role, "unknown message role; treating as assistant");
        MessageRole::Assistant
    });
    ChatMessage {
        id,
        chat_id,
        role,
        content,
        chat_context_id,
        created_at: parse_db_time(&created_at),
        updated_at: parse_db_time(&updated_at),
    }
}

impl ChatMessageStore for SqliteStore {
    async fn list_messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages \
             WHERE chat_id = ?1 AND deleted_at IS NULL \
             ORDER BY created_at ASC, rowid ASC"
        ))
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(into_message).collect())
    }

    async fn insert_message(&self, msg: NewChatMessage) -> Result<ChatMessage, sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let now = now_db_time();
        let row: MessageRow = sqlx::query_as(&format!(
            "INSERT INTO chat_messages (id, chat_id, role, content, chat_context_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6) \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(&id)
        .bind(&msg.chat_id)
        .bind(msg.role.to_string())
        .bind(&msg.content)
        .bind(&msg.chat_context_id)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;
        Ok(into_message(row))
    }

    async fn update_message(
        &self,
        id: &str,
        content: &str,
    ) -> Result<Option<ChatMessage>, sqlx::Error> {
        let row: Option<MessageRow> = sqlx::query_as(&format!(
            "UPDATE chat_messages SET content = ?1, updated_at = ?2 \
             WHERE id = ?3 AND deleted_at IS NULL \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(content)
        .bind(now_db_time())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(into_message))
    }

    async fn update_message_by_context_id(
        &self,
        chat_id: &str,
        context_id: &str,
        content: &str,
    ) -> Result<Option<ChatMessage>, sqlx::Error> {
        let row: Option<MessageRow> = sqlx::query_as(&format!(
            "UPDATE chat_messages SET content = ?1, updated_at = ?2 \
             WHERE chat_id = ?3 AND chat_context_id = ?4 AND deleted_at IS NULL \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(content)
        .bind(now_db_time())
        .bind(chat_id)
        .bind(context_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(into_message))
    }

    async fn find_unlinked_messages(
        &self,
        chat_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages \
             WHERE chat_id = ?1 AND role = ?2 AND content = ?3 \
               AND chat_context_id IS NULL AND deleted_at IS NULL \
             ORDER BY created_at ASC, rowid ASC"
        ))
        .bind(chat_id)
        .bind(role.to_string())
        .bind(content)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(into_message).collect())
    }

    async fn link_message(
        &self,
        id: &str,
        chat_id: &str,
        context_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE chat_messages SET chat_context_id = ?1, updated_at = ?2 \
             WHERE id = ?3 AND chat_id = ?4 \
               AND chat_context_id IS NULL AND deleted_at IS NULL \
               AND NOT EXISTS ( \
                   SELECT 1 FROM chat_messages WHERE chat_id = ?4 AND chat_context_id = ?1 \
               )",
        )
        .bind(context_id)
        .bind(now_db_time())
        .bind(id)
        .bind(chat_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn upsert_message_by_context_id(
        &self,
        chat_id: &str,
        context_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<Option<UpsertResult>, sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let now = now_db_time();
        let row: Option<MessageRow> = sqlx::query_as(&format!(
            "INSERT INTO chat_messages (id, chat_id, role, content, chat_context_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6) \
             ON CONFLICT (chat_id, chat_context_id) WHERE chat_context_id IS NOT NULL \
             DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at \
             WHERE chat_messages.deleted_at IS NULL \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(&id)
        .bind(chat_id)
        .bind(role.to_string())
        .bind(content)
        .bind(context_id)
        .bind(&now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| {
            let message = into_message(row);
            let inserted = message.id == id;
            UpsertResult { message, inserted }
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::test_support::seed_chat;

    #[tokio::test]
    async fn unknown_chat_lists_no_messages() {
        let store = SqliteStore::in_memory().await.unwrap();
        let messages = store.list_messages("does-not-exist").await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn messages_come_back_in_insertion_order() {
        let store = SqliteStore::in_memory().await.unwrap();
        let chat_id = seed_chat(&store).await;
        for content in ["one", "two", "three"] {
            store
                .insert_message(NewChatMessage {
                    chat_id: chat_id.clone(),
                    role: MessageRole::User,
                    content: content.into(),
                    chat_context_id: None,
                })
                .await
                .unwrap();
        }
        let contents: Vec<_> = store
            .list_messages(&chat_id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, ["one", "two", "three"]);
    }

    #[tokio::test]
    async fn upsert_inserts_then_updates_same_row() {
        let store = SqliteStore::in_memory().await.unwrap();
        let chat_id = seed_chat(&store).await;

        let first = store
            .upsert_message_by_context_id(&chat_id, "ctx-1", MessageRole::Assistant, "partial")
            .await
            .unwrap()
            .unwrap();
        assert!(first.inserted);

        let second = store
            .upsert_message_by_context_id(&chat_id, "ctx-1", MessageRole::Assistant, "final")
            .await
            .unwrap()
            .unwrap();
        assert!(!second.inserted);
        assert_eq!(second.message.id, first.message.id);
        assert_eq!(second.message.content, "final");
        assert_eq!(store.list_messages(&chat_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_replaces_content_of_live_rows_only() {
        let store = SqliteStore::in_memory().await.unwrap();
        let chat_id = seed_chat(&store).await;
        let row = store
            .insert_message(NewChatMessage {
                chat_id: chat_id.clone(),
                role: MessageRole::Assistant,
                content: "draft".into(),
                chat_context_id: None,
            })
            .await
            .unwrap();

        let updated = store.update_message(&row.id, "final").await.unwrap().unwrap();
        assert_eq!(updated.content, "final");
        assert!(updated.updated_at >= row.updated_at);
        assert!(store.update_message("missing", "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn soft_deleted_tagged_row_is_never_rewritten() {
        let store = SqliteStore::in_memory().await.unwrap();
        let chat_id = seed_chat(&store).await;
        let row = store
            .insert_message(NewChatMessage {
                chat_id: chat_id.clone(),
                role: MessageRole::Assistant,
                content: "kept".into(),
                chat_context_id: Some("ctx-1".into()),
            })
            .await
            .unwrap();
        sqlx::query("UPDATE chat_messages SET deleted_at = updated_at WHERE id = ?1")
            .bind(&row.id)
            .execute(&store.pool)
            .await
            .unwrap();

        let upserted = store
            .upsert_message_by_context_id(&chat_id, "ctx-1", MessageRole::Assistant, "overwritten")
            .await
            .unwrap();
        assert!(upserted.is_none());
        let updated = store
            .update_message_by_context_id(&chat_id, "ctx-1", "overwritten")
            .await
            .unwrap();
        assert!(updated.is_none());

        let (content,): (String,) = sqlx::query_as("SELECT content FROM chat_messages WHERE id = ?1")
            .bind(&row.id)
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(content, "kept");
    }

    #[tokio::test]
    async fn update_by_unknown_context_id_touches_nothing() {
        let store = SqliteStore::in_memory().await.unwrap();
        let chat_id = seed_chat(&store).await;
        let updated = store
            .update_message_by_context_id(&chat_id, "missing", "text")
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn link_refuses_second_row_with_same_context_id() {
        let store = SqliteStore::in_memory().await.unwrap();
        let chat_id = seed_chat(&store).await;
        let a = store
            .insert_message(NewChatMessage {
                chat_id: chat_id.clone(),
                role: MessageRole::User,
                content: "hi".into(),
                chat_context_id: None,
            })
            .await
            .unwrap();
        let b = store
            .insert_message(NewChatMessage {
                chat_id: chat_id.clone(),
                role: MessageRole::User,
                content: "hi".into(),
                chat_context_id: None,
            })
            .await
            .unwrap();

        assert!(store.link_message(&a.id, &chat_id, "ctx").await.unwrap());
        assert!(!store.link_message(&b.id, &chat_id, "ctx").await.unwrap());
        assert!(!store.link_message(&a.id, &chat_id, "other").await.unwrap());

        let unlinked = store
            .find_unlinked_messages(&chat_id, MessageRole::User, "hi")
            .await
            .unwrap();
        assert_eq!(unlinked.len(), 1);
        assert_eq!(unlinked[0].id, b.id);
    }
}
