use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::entities::{ProfileStore, ProfileUpdate, UserProfile};
use crate::error::{NotedError, Result};

#[derive(Debug, Clone, Default)]
pub struct NewProfile {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Register a user and mint their API token.
pub async fn create_profile<S: ProfileStore>(store: &S, new: NewProfile) -> Result<UserProfile> {
    let email = new.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(NotedError::Validation(format!("invalid email '{}'", new.email)));
    }
    if store.email_exists(&email).await? {
        return Err(NotedError::Validation(format!("email '{email}' is already registered")));
    }

    let now = Utc::now();
    let profile = UserProfile {
        id: Uuid::new_v4().to_string(),
        email,
        first_name: new.first_name,
        last_name: new.last_name,
        middle_name: None,
        avatar_url: None,
        api_token: format!("nt_{}", Uuid::new_v4().simple()),
        created_at: now,
        updated_at: now,
    };
    store.create_profile(profile.clone()).await?;
    info!(user_id = %profile.id, email = %profile.email, "profile created");
    Ok(profile)
}

/// Resolve the bearer token of a request to its user.
pub async fn authenticate<S: ProfileStore>(store: &S, token: &str) -> Result<UserProfile> {
    let token = token.trim();
    if token.is_empty() {
        return Err(NotedError::Unauthenticated);
    }
    store
        .get_profile_by_token(token)
        .await?
        .ok_or(NotedError::Unauthenticated)
}

pub async fn update_profile<S: ProfileStore>(
    store: &S,
    user_id: &str,
    update: ProfileUpdate,
) -> Result<UserProfile> {
    store
        .update_profile(user_id, update)
        .await?
        .ok_or_else(|| NotedError::NotFound(format!("profile {user_id}")))
}

pub async fn email_exists<S: ProfileStore>(store: &S, email: &str) -> Result<bool> {
    Ok(store.email_exists(&email.trim().to_lowercase()).await?)
}
