use std::future::Future;

use crate::entities::{SqliteStore, UserProfile, parse_db_time, to_db_time};

type ProfileRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    String,
    String,
);

const PROFILE_COLUMNS: &str = "id, email, first_name, last_name, middle_name, avatar_url, \
                               api_token, created_at, updated_at";

/// Partial update for a profile; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub avatar_url: Option<String>,
}

pub trait ProfileStore: Send + Sync + 'static {
    fn create_profile(
        &self,
        profile: UserProfile,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_profile_by_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<UserProfile>, sqlx::Error>> + Send;
    fn email_exists(&self, email: &str) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
    fn update_profile(
        &self,
        id: &str,
        update: ProfileUpdate,
    ) -> impl Future<Output = Result<Option<UserProfile>, sqlx::Error>> + Send;
}

fn into_profile(row: ProfileRow) -> UserProfile {
    let (id, email, first_name, last_name, middle_name, avatar_url, api_token, created_at, updated_at) =
        row;
    UserProfile {
        id,
        email,
        first_name,
        last_name,
        middle_name,
        avatar_url,
        api_token,
        created_at: parse_db_time(&created_at),
        updated_at: parse_db_time(&updated_at),
    }
}

impl ProfileStore for SqliteStore {
    async fn create_profile(&self, profile: UserProfile) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_profiles \
             (id, email, first_name, last_name, middle_name, avatar_url, api_token, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.middle_name)
        .bind(&profile.avatar_url)
        .bind(&profile.api_token)
        .bind(to_db_time(&profile.created_at))
        .bind(to_db_time(&profile.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_profile_by_token(&self, token: &str) -> Result<Option<UserProfile>, sqlx::Error> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE api_token = ?1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(into_profile))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM user_profiles WHERE email = ?1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn update_profile(
        &self,
        id: &str,
        update: ProfileUpdate,
    ) -> Result<Option<UserProfile>, sqlx::Error> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "UPDATE user_profiles SET \
                 first_name  = COALESCE(?1, first_name), \
                 last_name   = COALESCE(?2, last_name), \
                 middle_name = COALESCE(?3, middle_name), \
                 avatar_url  = COALESCE(?4, avatar_url), \
                 updated_at  = ?5 \
             WHERE id = ?6 \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.middle_name)
        .bind(&update.avatar_url)
        .bind(crate::entities::now_db_time())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(into_profile))
    }
}
