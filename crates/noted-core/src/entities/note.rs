use std::future::Future;

use crate::entities::{
    Note, NoteAction, NoteEventType, SqliteStore, now_db_time, parse_db_time, parse_opt_db_time,
    to_db_time,
};

type NoteRow = (
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
);

type NoteActionRow = (String, String, String, String, Option<String>, String);

const NOTE_COLUMNS: &str =
    "id, author_id, project_id, title, content, last_viewed_at, created_at, updated_at";

pub trait NoteStore: Send + Sync + 'static {
    fn create_note(&self, note: Note) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_note(
        &self,
        id: &str,
        author_id: &str,
    ) -> impl Future<Output = Result<Option<Note>, sqlx::Error>> + Send;
    /// Persist title, content and project of an existing note.
    fn update_note(&self, note: &Note) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
    fn delete_note(
        &self,
        id: &str,
        author_id: &str,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
    /// Non-deleted notes of `author_id`, newest first, optionally filtered by a
    /// case-insensitive title substring.
    fn list_notes(
        &self,
        author_id: &str,
        title_filter: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> impl Future<Output = Result<Vec<Note>, sqlx::Error>> + Send;
    fn list_project_notes(
        &self,
        project_id: &str,
    ) -> impl Future<Output = Result<Vec<Note>, sqlx::Error>> + Send;
    fn recent_notes(
        &self,
        author_id: &str,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<Note>, sqlx::Error>> + Send;
    fn touch_note(&self, id: &str) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn record_note_action(
        &self,
        action: NoteAction,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// History of a note, newest first.
    fn list_note_actions(
        &self,
        note_id: &str,
    ) -> impl Future<Output = Result<Vec<NoteAction>, sqlx::Error>> + Send;
}

fn into_note(row: NoteRow) -> Note {
    let (id, author_id, project_id, title, content, last_viewed_at, created_at, updated_at) = row;
    Note {
        id,
        author_id,
        project_id,
        title,
        content,
        last_viewed_at: parse_opt_db_time(last_viewed_at),
        created_at: parse_db_time(&created_at),
        updated_at: parse_db_time(&updated_at),
    }
}

fn into_note_action(row: NoteActionRow) -> NoteAction {
    let (id, note_id, actor_id, event_type, details, created_at) = row;
    let event_type = event_type.parse().unwrap_or_else(|_| {
        tracing::warn!(action_id = %id, raw = %event_type, "unknown note event type; treating as update");
        NoteEventType::Updated
    });
    NoteAction {
        id,
        note_id,
        actor_id,
        event_type,
        details,
        created_at: parse_db_time(&created_at),
    }
}

impl NoteStore for SqliteStore {
    async fn create_note(&self, note: Note) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO notes (id, author_id, project_id, title, content, last_viewed_at, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&note.id)
        .bind(&note.author_id)
        .bind(&note.project_id)
        .bind(&note.title)
        .bind(&note.content)
        .bind(note.last_viewed_at.as_ref().map(to_db_time))
        .bind(to_db_time(&note.created_at))
        .bind(to_db_time(&note.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_note(&self, id: &str, author_id: &str) -> Result<Option<Note>, sqlx::Error> {
        let row: Option<NoteRow> = sqlx::query_as(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes \
             WHERE id = ?1 AND author_id = ?2 AND deleted_at IS NULL"
        ))
        .bind(id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(into_note))
    }

    async fn update_note(&self, note: &Note) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notes SET title = ?1, content = ?2, project_id = ?3, updated_at = ?4 \
             WHERE id = ?5 AND author_id = ?6 AND deleted_at IS NULL",
        )
        .bind(&note.title)
        .bind(&note.content)
        .bind(&note.project_id)
        .bind(to_db_time(&note.updated_at))
        .bind(&note.id)
        .bind(&note.author_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_note(&self, id: &str, author_id: &str) -> Result<bool, sqlx::Error> {
        let now = now_db_time();
        let result = sqlx::query(
            "UPDATE notes SET deleted_at = ?1, updated_at = ?1 \
             WHERE id = ?2 AND author_id = ?3 AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(id)
        .bind(author_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_notes(
        &self,
        author_id: &str,
        title_filter: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Note>, sqlx::Error> {
        let rows: Vec<NoteRow> = sqlx::query_as(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes \
             WHERE author_id = ?1 AND deleted_at IS NULL \
               AND (?2 IS NULL OR instr(lower(title), lower(?2)) > 0) \
             ORDER BY created_at DESC LIMIT ?3 OFFSET ?4"
        ))
        .bind(author_id)
        .bind(title_filter)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(into_note).collect())
    }

    async fn list_project_notes(&self, project_id: &str) -> Result<Vec<Note>, sqlx::Error> {
        let rows: Vec<NoteRow> = sqlx::query_as(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes \
             WHERE project_id = ?1 AND deleted_at IS NULL \
             ORDER BY created_at DESC"
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(into_note).collect())
    }

    async fn recent_notes(&self, author_id: &str, limit: i64) -> Result<Vec<Note>, sqlx::Error> {
        let rows: Vec<NoteRow> = sqlx::query_as(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes \
             WHERE author_id = ?1 AND deleted_at IS NULL \
             ORDER BY last_viewed_at IS NULL, last_viewed_at DESC LIMIT ?2"
        ))
        .bind(author_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(into_note).collect())
    }

    async fn touch_note(&self, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE notes SET last_viewed_at = ?1 WHERE id = ?2")
            .bind(now_db_time())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_note_action(&self, action: NoteAction) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO note_actions (id, note_id, actor_id, event_type, details, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&action.id)
        .bind(&action.note_id)
        .bind(&action.actor_id)
        .bind(action.event_type.to_string())
        .bind(&action.details)
        .bind(to_db_time(&action.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_note_actions(&self, note_id: &str) -> Result<Vec<NoteAction>, sqlx::Error> {
        let rows: Vec<NoteActionRow> = sqlx::query_as(
            "SELECT id, note_id, actor_id, event_type, details, created_at \
             FROM note_actions WHERE note_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(into_note_action).collect())
    }
}
