use crate::entities::{Chat, ChatStore, Note, NoteStore, Project, ProjectStore};
use crate::error::Result;

/// Items per category on the dashboard.
pub const RECENT_LIMIT: i64 = 5;

#[derive(Debug, Clone, Default)]
pub struct RecentActivity {
    pub notes: Vec<Note>,
    pub projects: Vec<Project>,
    pub chats: Vec<Chat>,
}

/// Most recently viewed notes, projects and chats of a user.
pub async fn recent_activity<S>(store: &S, user_id: &str) -> Result<RecentActivity>
where
    S: NoteStore + ProjectStore + ChatStore,
{
    let (notes, projects, chats) = futures::try_join!(
        store.recent_notes(user_id, RECENT_LIMIT),
        store.recent_projects(user_id, RECENT_LIMIT),
        store.recent_chats(user_id, RECENT_LIMIT),
    )?;
    Ok(RecentActivity {
        notes,
        projects,
        chats,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::SqliteStore;
    use crate::entities::test_support::seed_user;
    use crate::services::{chats, notes};

    #[tokio::test]
    async fn most_recently_viewed_come_first_and_are_capped() {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = seed_user(&store).await;

        let mut ids = Vec::new();
        for i in 0..7 {
            let note = notes::create_note(
                &store,
                &user.id,
                notes::NewNote {
                    title: Some(format!("note {i}")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
            ids.push(note.id);
        }
        notes::get_note(&store, &user.id, &ids[0]).await.unwrap();
        chats::create_chat(&store, &user.id, "hi").await.unwrap();

        let activity = recent_activity(&store, &user.id).await.unwrap();
        assert_eq!(activity.notes.len(), RECENT_LIMIT as usize);
        assert_eq!(activity.notes[0].id, ids[0]);
        assert_eq!(activity.chats.len(), 1);
        assert!(activity.projects.is_empty());
    }

    #[tokio::test]
    async fn other_users_activity_is_invisible() {
        let store = SqliteStore::in_memory().await.unwrap();
        let alice = seed_user(&store).await;
        let bob = seed_user(&store).await;
        chats::create_chat(&store, &alice.id, "private").await.unwrap();

        let activity = recent_activity(&store, &bob.id).await.unwrap();
        assert!(activity.chats.is_empty());
    }
}
