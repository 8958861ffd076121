//! Notes and their action history.
//!
//! Every mutation appends to `note_actions`.  History writes are best-effort:
//! a failure is logged and the note change still stands.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{Note, NoteAction, NoteEventType, NoteStore, ProjectStore};
use crate::error::{NotedError, Result};

pub const DEFAULT_NOTE_TITLE: &str = "Untitled";

/// Offset pagination; defaults to the first 50 rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self { limit: 50, offset: 0 }
    }
}

impl Page {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        let default = Self::default();
        Self {
            limit: limit.filter(|l| *l > 0).unwrap_or(default.limit),
            offset: offset.filter(|o| *o >= 0).unwrap_or(default.offset),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewNote {
    pub title: Option<String>,
    pub content: Option<String>,
    pub project_id: Option<String>,
}

/// Partial update.  `project_id: Some(None)` detaches the note.
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub project_id: Option<Option<String>>,
}

pub async fn create_note<S>(store: &S, user_id: &str, new: NewNote) -> Result<Note>
where
    S: NoteStore + ProjectStore,
{
    if let Some(project_id) = new.project_id.as_deref() {
        require_project(store, user_id, project_id).await?;
    }

    let now = Utc::now();
    let title = new
        .title
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_NOTE_TITLE.to_owned());
    let note = Note {
        id: Uuid::new_v4().to_string(),
        author_id: user_id.to_owned(),
        project_id: new.project_id,
        title,
        content: new.content,
        last_viewed_at: Some(now),
        created_at: now,
        updated_at: now,
    };
    store.create_note(note.clone()).await?;
    record(store, &note.id, user_id, NoteEventType::Created, None).await;
    info!(note_id = %note.id, user_id, "note created");
    Ok(note)
}

/// Fetch a note the user authored and mark it viewed.
pub async fn get_note<S: NoteStore>(store: &S, user_id: &str, note_id: &str) -> Result<Note> {
    let mut note = require_note(store, user_id, note_id).await?;
    store.touch_note(note_id).await?;
    note.last_viewed_at = Some(Utc::now());
    Ok(note)
}

pub async fn update_note<S>(
    store: &S,
    user_id: &str,
    note_id: &str,
    update: NoteUpdate,
) -> Result<Note>
where
    S: NoteStore + ProjectStore,
{
    let before = require_note(store, user_id, note_id).await?;
    let mut note = before.clone();
    let mut events: Vec<(NoteEventType, Option<String>)> = Vec::new();

    if let Some(title) = update.title {
        let title = title.trim();
        let title = if title.is_empty() { DEFAULT_NOTE_TITLE } else { title };
        if title != before.title {
            events.push((
                NoteEventType::Renamed,
                Some(format!("{} -> {}", before.title, title)),
            ));
            note.title = title.to_owned();
        }
    }

    if let Some(content) = update.content {
        if Some(&content) != before.content.as_ref() {
            events.push((NoteEventType::Updated, None));
            note.content = Some(content);
        }
    }

    if let Some(project_id) = update.project_id {
        if project_id != before.project_id {
            match &project_id {
                Some(id) => {
                    require_project(store, user_id, id).await?;
                    events.push((NoteEventType::AssignToProject, Some(id.clone())));
                }
                None => events.push((NoteEventType::RemoveFromProject, before.project_id.clone())),
            }
            note.project_id = project_id;
        }
    }

    if events.is_empty() {
        return Ok(before);
    }

    note.updated_at = Utc::now();
    if !store.update_note(&note).await? {
        return Err(NotedError::NotFound(format!("note {note_id}")));
    }
    for (event, details) in events {
        record(store, note_id, user_id, event, details).await;
    }
    Ok(note)
}

pub async fn delete_note<S: NoteStore>(store: &S, user_id: &str, note_id: &str) -> Result<()> {
    if !store.delete_note(note_id, user_id).await? {
        return Err(NotedError::NotFound(format!("note {note_id}")));
    }
    record(store, note_id, user_id, NoteEventType::Deleted, None).await;
    info!(note_id, user_id, "note deleted");
    Ok(())
}

pub async fn list_notes<S: NoteStore>(store: &S, user_id: &str, page: Page) -> Result<Vec<Note>> {
    Ok(store.list_notes(user_id, None, page.limit, page.offset).await?)
}

/// Case-insensitive title substring search.  A blank query lists everything.
pub async fn search_notes<S: NoteStore>(
    store: &S,
    user_id: &str,
    title: &str,
    page: Page,
) -> Result<Vec<Note>> {
    let title = title.trim();
    let filter = (!title.is_empty()).then_some(title);
    Ok(store.list_notes(user_id, filter, page.limit, page.offset).await?)
}

/// Notes filed under the user's project with the given slug.
pub async fn list_project_notes<S>(store: &S, user_id: &str, slug: &str) -> Result<Vec<Note>>
where
    S: NoteStore + ProjectStore,
{
    let project = store
        .get_project_by_slug(slug, user_id)
        .await?
        .ok_or_else(|| NotedError::NotFound(format!("project {slug}")))?;
    Ok(store.list_project_notes(&project.id).await?)
}

pub async fn list_note_actions<S: NoteStore>(
    store: &S,
    user_id: &str,
    note_id: &str,
) -> Result<Vec<NoteAction>> {
    require_note(store, user_id, note_id).await?;
    Ok(store.list_note_actions(note_id).await?)
}

async fn require_note<S: NoteStore>(store: &S, user_id: &str, note_id: &str) -> Result<Note> {
    store
        .get_note(note_id, user_id)
        .await?
        .ok_or_else(|| NotedError::NotFound(format!("note {note_id}")))
}

async fn require_project<S: ProjectStore>(store: &S, user_id: &str, project_id: &str) -> Result<()> {
    store
        .get_project(project_id, user_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| NotedError::NotFound(format!("project {project_id}")))
}

async fn record<S: NoteStore>(
    store: &S,
    note_id: &str,
    actor_id: &str,
    event_type: NoteEventType,
    details: Option<String>,
) {
    let action = NoteAction {
        id: Uuid::new_v4().to_string(),
        note_id: note_id.to_owned(),
        actor_id: actor_id.to_owned(),
        event_type,
        details,
        created_at: Utc::now(),
    };
    store
        .record_note_action(action)
        .await
        .unwrap_or_else(|e| warn!(note_id, %event_type, error = %e, "failed to record note action"));
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::SqliteStore;
    use crate::entities::test_support::seed_user;
    use crate::services::projects::{self, NewProject};

    fn events(actions: &[NoteAction]) -> Vec<NoteEventType> {
        actions.iter().map(|a| a.event_type).collect()
    }

    #[tokio::test]
    async fn new_note_defaults_title_and_records_creation() {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = seed_user(&store).await;

        let note = create_note(&store, &user.id, NewNote::default()).await.unwrap();
        assert_eq!(note.title, DEFAULT_NOTE_TITLE);

        let actions = list_note_actions(&store, &user.id, &note.id).await.unwrap();
        assert_eq!(events(&actions), [NoteEventType::Created]);
    }

    #[tokio::test]
    async fn update_records_one_action_per_change() {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = seed_user(&store).await;
        let project = projects::create_project(
            &store,
            &user.id,
            NewProject {
                name: "Garden".into(),
                description: None,
            },
        )
        .await
        .unwrap();
        let note = create_note(&store, &user.id, NewNote::default()).await.unwrap();

        let updated = update_note(
            &store,
            &user.id,
            &note.id,
            NoteUpdate {
                title: Some("Tomatoes".into()),
                content: Some("{\"type\":\"doc\"}".into()),
                project_id: Some(Some(project.id.clone())),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "Tomatoes");
        assert_eq!(updated.project_id.as_deref(), Some(project.id.as_str()));

        update_note(
            &store,
            &user.id,
            &note.id,
            NoteUpdate {
                project_id: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let actions = list_note_actions(&store, &user.id, &note.id).await.unwrap();
        let mut kinds = events(&actions);
        kinds.sort_by_key(|k| k.to_string());
        let mut expected = vec![
            NoteEventType::Created,
            NoteEventType::Renamed,
            NoteEventType::Updated,
            NoteEventType::AssignToProject,
            NoteEventType::RemoveFromProject,
        ];
        expected.sort_by_key(|k| k.to_string());
        assert_eq!(kinds, expected);
    }

    #[tokio::test]
    async fn no_op_update_records_nothing() {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = seed_user(&store).await;
        let note = create_note(
            &store,
            &user.id,
            NewNote {
                title: Some("Same".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        update_note(
            &store,
            &user.id,
            &note.id,
            NoteUpdate {
                title: Some("Same".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(list_note_actions(&store, &user.id, &note.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_paginated() {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = seed_user(&store).await;
        for title in ["Shopping list", "Reading LIST", "Ideas"] {
            create_note(
                &store,
                &user.id,
                NewNote {
                    title: Some(title.into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }

        let hits = search_notes(&store, &user.id, "list", Page::default()).await.unwrap();
        assert_eq!(hits.len(), 2);

        let first = list_notes(&store, &user.id, Page { limit: 1, offset: 0 }).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(Page::new(Some(0), Some(-3)), Page::default());
    }

    #[tokio::test]
    async fn deleted_note_disappears_and_is_recorded() {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = seed_user(&store).await;
        let note = create_note(&store, &user.id, NewNote::default()).await.unwrap();

        delete_note(&store, &user.id, &note.id).await.unwrap();
        assert!(matches!(
            get_note(&store, &user.id, &note.id).await,
            Err(NotedError::NotFound(_))
        ));
        let history = store.list_note_actions(&note.id).await.unwrap();
        assert_eq!(history[0].event_type, NoteEventType::Deleted);
    }

    #[tokio::test]
    async fn assigning_unknown_project_fails() {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = seed_user(&store).await;
        let result = create_note(
            &store,
            &user.id,
            NewNote {
                project_id: Some("missing".into()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(NotedError::NotFound(_))));
    }
}
