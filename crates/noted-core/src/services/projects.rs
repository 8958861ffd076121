use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::entities::{Project, ProjectStore};
use crate::error::{NotedError, Result};
use crate::services::notes::Page;
use crate::util::make_slug;

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub async fn create_project<S: ProjectStore>(
    store: &S,
    user_id: &str,
    new: NewProject,
) -> Result<Project> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(NotedError::Validation("Project name is required".into()));
    }
    let slug = make_slug(name)?;
    ensure_slug_free(store, user_id, &slug, None).await?;

    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4().to_string(),
        owner_id: user_id.to_owned(),
        name: name.to_owned(),
        slug,
        description: new.description,
        last_viewed_at: Some(now),
        created_at: now,
        updated_at: now,
    };
    store.create_project(project.clone()).await?;
    info!(project_id = %project.id, slug = %project.slug, user_id, "project created");
    Ok(project)
}

/// Fetch a project the user owns and mark it viewed.
pub async fn get_project<S: ProjectStore>(
    store: &S,
    user_id: &str,
    project_id: &str,
) -> Result<Project> {
    let project = store
        .get_project(project_id, user_id)
        .await?
        .ok_or_else(|| NotedError::NotFound(format!("project {project_id}")))?;
    viewed(store, project).await
}

pub async fn get_project_by_slug<S: ProjectStore>(
    store: &S,
    user_id: &str,
    slug: &str,
) -> Result<Project> {
    let project = store
        .get_project_by_slug(slug, user_id)
        .await?
        .ok_or_else(|| NotedError::NotFound(format!("project {slug}")))?;
    viewed(store, project).await
}

/// Apply a partial update; a new name re-derives the slug.
pub async fn update_project<S: ProjectStore>(
    store: &S,
    user_id: &str,
    project_id: &str,
    update: ProjectUpdate,
) -> Result<Project> {
    let mut project = store
        .get_project(project_id, user_id)
        .await?
        .ok_or_else(|| NotedError::NotFound(format!("project {project_id}")))?;

    if let Some(name) = update.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(NotedError::Validation("Project name is required".into()));
        }
        let slug = make_slug(name)?;
        if slug != project.slug {
            ensure_slug_free(store, user_id, &slug, Some(project_id)).await?;
        }
        project.name = name.to_owned();
        project.slug = slug;
    }
    if let Some(description) = update.description {
        project.description = Some(description);
    }

    project.updated_at = Utc::now();
    if !store.update_project(&project).await? {
        return Err(NotedError::NotFound(format!("project {project_id}")));
    }
    Ok(project)
}

/// Soft delete; notes filed under the project become unfiled.
pub async fn delete_project<S: ProjectStore>(
    store: &S,
    user_id: &str,
    project_id: &str,
) -> Result<()> {
    if !store.delete_project(project_id, user_id).await? {
        return Err(NotedError::NotFound(format!("project {project_id}")));
    }
    info!(project_id, user_id, "project deleted");
    Ok(())
}

pub async fn list_projects<S: ProjectStore>(
    store: &S,
    user_id: &str,
    page: Page,
) -> Result<Vec<Project>> {
    Ok(store.list_projects(user_id, None, page.limit, page.offset).await?)
}

/// Case-insensitive name substring search.
pub async fn search_projects<S: ProjectStore>(
    store: &S,
    user_id: &str,
    name: &str,
    page: Page,
) -> Result<Vec<Project>> {
    let name = name.trim();
    let filter = (!name.is_empty()).then_some(name);
    Ok(store.list_projects(user_id, filter, page.limit, page.offset).await?)
}

async fn viewed<S: ProjectStore>(store: &S, mut project: Project) -> Result<Project> {
    store.touch_project(&project.id).await?;
    project.last_viewed_at = Some(Utc::now());
    Ok(project)
}

async fn ensure_slug_free<S: ProjectStore>(
    store: &S,
    user_id: &str,
    slug: &str,
    except: Option<&str>,
) -> Result<()> {
    match store.get_project_by_slug(slug, user_id).await? {
        Some(existing) if Some(existing.id.as_str()) != except => Err(NotedError::Validation(
            format!("a project with slug '{slug}' already exists"),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::SqliteStore;
    use crate::entities::test_support::seed_user;
    use crate::services::notes::{self, NewNote};

    fn named(name: &str) -> NewProject {
        NewProject {
            name: name.into(),
            description: None,
        }
    }

    #[tokio::test]
    async fn create_derives_slug_and_rejects_duplicates() {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = seed_user(&store).await;

        let project = create_project(&store, &user.id, named("Home Renovation")).await.unwrap();
        assert_eq!(project.slug, "home_renovation");

        let dup = create_project(&store, &user.id, named("home  renovation!")).await;
        assert!(matches!(dup, Err(NotedError::Validation(_))));

        let other = seed_user(&store).await;
        assert!(create_project(&store, &other.id, named("Home Renovation")).await.is_ok());
    }

    #[tokio::test]
    async fn rename_reslugs() {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = seed_user(&store).await;
        let project = create_project(&store, &user.id, named("Draft")).await.unwrap();

        let updated = update_project(
            &store,
            &user.id,
            &project.id,
            ProjectUpdate {
                name: Some("Final Cut".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.slug, "final_cut");
        assert!(get_project_by_slug(&store, &user.id, "final_cut").await.is_ok());
        assert!(get_project_by_slug(&store, &user.id, "draft").await.is_err());
    }

    #[tokio::test]
    async fn delete_detaches_notes() {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = seed_user(&store).await;
        let project = create_project(&store, &user.id, named("Trip")).await.unwrap();
        let note = notes::create_note(
            &store,
            &user.id,
            NewNote {
                project_id: Some(project.id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        delete_project(&store, &user.id, &project.id).await.unwrap();
        let note = notes::get_note(&store, &user.id, &note.id).await.unwrap();
        assert!(note.project_id.is_none());
        assert!(list_projects(&store, &user.id, Page::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_matches_name_substring() {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = seed_user(&store).await;
        create_project(&store, &user.id, named("Kitchen")).await.unwrap();
        create_project(&store, &user.id, named("Garden")).await.unwrap();

        let hits = search_projects(&store, &user.id, "KIT", Page::default()).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Kitchen");
    }
}
