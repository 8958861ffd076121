use std::future::Future;

use uuid::Uuid;

use crate::entities::{
    Chat, ChatMessage, NewChatMessage, SqliteStore, now_db_time, parse_db_time,
    parse_opt_db_time, to_db_time,
};

type ChatRow = (String, String, String, Option<String>, String, String);

const CHAT_COLUMNS: &str = "id, user_profile_id, title, last_viewed_at, created_at, updated_at";

pub trait ChatStore: Send + Sync + 'static {
    /// Insert a chat together with its first message in one transaction.
    fn create_chat_with_message(
        &self,
        chat: Chat,
        first: NewChatMessage,
    ) -> impl Future<Output = Result<ChatMessage, sqlx::Error>> + Send;
    /// Non-deleted chat owned by `owner_id`.
    fn get_chat(
        &self,
        id: &str,
        owner_id: &str,
    ) -> impl Future<Output = Result<Option<Chat>, sqlx::Error>> + Send;
    /// Non-deleted chats of `owner_id`, newest first.
    fn list_chats(
        &self,
        owner_id: &str,
    ) -> impl Future<Output = Result<Vec<Chat>, sqlx::Error>> + Send;
    fn recent_chats(
        &self,
        owner_id: &str,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<Chat>, sqlx::Error>> + Send;
    fn touch_chat(&self, id: &str) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn rename_chat(
        &self,
        id: &str,
        owner_id: &str,
        title: &str,
    ) -> impl Future<Output = Result<Option<Chat>, sqlx::Error>> + Send;
    /// Soft delete.  Returns `false` when nothing matched.
    fn delete_chat(
        &self,
        id: &str,
        owner_id: &str,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

fn into_chat(row: ChatRow) -> Chat {
    let (id, user_profile_id, title, last_viewed_at, created_at, updated_at) = row;
    Chat {
        id,
        user_profile_id,
        title,
        last_viewed_at: parse_opt_db_time(last_viewed_at),
        created_at: parse_db_time(&created_at),
        updated_at: parse_db_time(&updated_at),
    }
}

impl ChatStore for SqliteStore {
    async fn create_chat_with_message(
        &self,
        chat: Chat,
        first: NewChatMessage,
    ) -> Result<ChatMessage, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO chats (id, user_profile_id, title, last_viewed_at, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&chat.id)
        .bind(&chat.user_profile_id)
        .bind(&chat.title)
        .bind(chat.last_viewed_at.as_ref().map(to_db_time))
        .bind(to_db_time(&chat.created_at))
        .bind(to_db_time(&chat.updated_at))
        .execute(&mut *tx)
        .await?;

        let message_id = Uuid::new_v4().to_string();
        let now = now_db_time();
        sqlx::query(
            "INSERT INTO chat_messages (id, chat_id, role, content, chat_context_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        )
        .bind(&message_id)
        .bind(&chat.id)
        .bind(first.role.to_string())
        .bind(&first.content)
        .bind(&first.chat_context_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let created = parse_db_time(&now);
        Ok(ChatMessage {
            id: message_id,
            chat_id: chat.id,
            role: first.role,
            content: first.content,
            chat_context_id: first.chat_context_id,
            created_at: created,
            updated_at: created,
        })
    }

    async fn get_chat(&self, id: &str, owner_id: &str) -> Result<Option<Chat>, sqlx::Error> {
        let row: Option<ChatRow> = sqlx::query_as(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats \
             WHERE id = ?1 AND user_profile_id = ?2 AND deleted_at IS NULL"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(into_chat))
    }

    async fn list_chats(&self, owner_id: &str) -> Result<Vec<Chat>, sqlx::Error> {
        let rows: Vec<ChatRow> = sqlx::query_as(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats \
             WHERE user_profile_id = ?1 AND deleted_at IS NULL \
             ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(into_chat).collect())
    }

    async fn recent_chats(&self, owner_id: &str, limit: i64) -> Result<Vec<Chat>, sqlx::Error> {
        let rows: Vec<ChatRow> = sqlx::query_as(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats \
             WHERE user_profile_id = ?1 AND deleted_at IS NULL \
             ORDER BY last_viewed_at IS NULL, last_viewed_at DESC LIMIT ?2"
        ))
        .bind(owner_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(into_chat).collect())
    }

    async fn touch_chat(&self, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE chats SET last_viewed_at = ?1 WHERE id = ?2")
            .bind(now_db_time())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn rename_chat(
        &self,
        id: &str,
        owner_id: &str,
        title: &str,
    ) -> Result<Option<Chat>, sqlx::Error> {
        let row: Option<ChatRow> = sqlx::query_as(&format!(
            "UPDATE chats SET title = ?1, updated_at = ?2 \
             WHERE id = ?3 AND user_profile_id = ?4 AND deleted_at IS NULL \
             RETURNING {CHAT_COLUMNS}"
        ))
        .bind(title)
        .bind(now_db_time())
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(into_chat))
    }

    async fn delete_chat(&self, id: &str, owner_id: &str) -> Result<bool, sqlx::Error> {
        let now = now_db_time();
        let result = sqlx::query(
            "UPDATE chats SET deleted_at = ?1, updated_at = ?1 \
             WHERE id = ?2 AND user_profile_id = ?3 AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

