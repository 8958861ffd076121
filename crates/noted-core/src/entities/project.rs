use std::future::Future;

use crate::entities::{
    Project, SqliteStore, now_db_time, parse_db_time, parse_opt_db_time, to_db_time,
};

type ProjectRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
);

const PROJECT_COLUMNS: &str =
    "id, owner_id, name, slug, description, last_viewed_at, created_at, updated_at";

pub trait ProjectStore: Send + Sync + 'static {
    fn create_project(
        &self,
        project: Project,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_project(
        &self,
        id: &str,
        owner_id: &str,
    ) -> impl Future<Output = Result<Option<Project>, sqlx::Error>> + Send;
    fn get_project_by_slug(
        &self,
        slug: &str,
        owner_id: &str,
    ) -> impl Future<Output = Result<Option<Project>, sqlx::Error>> + Send;
    fn update_project(
        &self,
        project: &Project,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
    /// Soft delete and detach the project's notes.
    fn delete_project(
        &self,
        id: &str,
        owner_id: &str,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
    /// Non-deleted projects of `owner_id`, newest first, optionally filtered by
    /// a case-insensitive name substring.
    fn list_projects(
        &self,
        owner_id: &str,
        name_filter: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> impl Future<Output = Result<Vec<Project>, sqlx::Error>> + Send;
    fn recent_projects(
        &self,
        owner_id: &str,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<Project>, sqlx::Error>> + Send;
    fn touch_project(&self, id: &str) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

fn into_project(row: ProjectRow) -> Project {
    let (id, owner_id, name, slug, description, last_viewed_at, created_at, updated_at) = row;
    Project {
        id,
        owner_id,
        name,
        slug,
        description,
        last_viewed_at: parse_opt_db_time(last_viewed_at),
        created_at: parse_db_time(&created_at),
        updated_at: parse_db_time(&updated_at),
    }
}

impl ProjectStore for SqliteStore {
    async fn create_project(&self, project: Project) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO projects (id, owner_id, name, slug, description, last_viewed_at, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&project.id)
        .bind(&project.owner_id)
        .bind(&project.name)
        .bind(&project.slug)
        .bind(&project.description)
        .bind(project.last_viewed_at.as_ref().map(to_db_time))
        .bind(to_db_time(&project.created_at))
        .bind(to_db_time(&project.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_project(&self, id: &str, owner_id: &str) -> Result<Option<Project>, sqlx::Error> {
        let row: Option<ProjectRow> = sqlx::query_as(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects \
             WHERE id = ?1 AND owner_id = ?2 AND deleted_at IS NULL"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(into_project))
    }

    async fn get_project_by_slug(
        &self,
        slug: &str,
        owner_id: &str,
    ) -> Result<Option<Project>, sqlx::Error> {
        let row: Option<ProjectRow> = sqlx::query_as(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects \
             WHERE slug = ?1 AND owner_id = ?2 AND deleted_at IS NULL"
        ))
        .bind(slug)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(into_project))
    }

    async fn update_project(&self, project: &Project) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE projects SET name = ?1, slug = ?2, description = ?3, updated_at = ?4 \
             WHERE id = ?5 AND owner_id = ?6 AND deleted_at IS NULL",
        )
        .bind(&project.name)
        .bind(&project.slug)
        .bind(&project.description)
        .bind(to_db_time(&project.updated_at))
        .bind(&project.id)
        .bind(&project.owner_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_project(&self, id: &str, owner_id: &str) -> Result<bool, sqlx::Error> {
        let now = now_db_time();
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE projects SET deleted_at = ?1, updated_at = ?1 \
             WHERE id = ?2 AND owner_id = ?3 AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        sqlx::query("UPDATE notes SET project_id = NULL, updated_at = ?1 WHERE project_id = ?2")
            .bind(&now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn list_projects(
        &self,
        owner_id: &str,
        name_filter: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let rows: Vec<ProjectRow> = sqlx::query_as(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects \
             WHERE owner_id = ?1 AND deleted_at IS NULL \
               AND (?2 IS NULL OR instr(lower(name), lower(?2)) > 0) \
             ORDER BY created_at DESC LIMIT ?3 OFFSET ?4"
        ))
        .bind(owner_id)
        .bind(name_filter)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(into_project).collect())
    }

    async fn recent_projects(&self, owner_id: &str, limit: i64) -> Result<Vec<Project>, sqlx::Error> {
        let rows: Vec<ProjectRow> = sqlx::query_as(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects \
             WHERE owner_id = ?1 AND deleted_at IS NULL \
             ORDER BY last_viewed_at IS NULL, last_viewed_at DESC LIMIT ?2"
        ))
        .bind(owner_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(into_project).collect())
    }

    async fn touch_project(&self, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE projects SET last_viewed_at = ?1 WHERE id = ?2")
            .bind(now_db_time())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
