use noted_core::entities::{ProfileUpdate, UserProfile};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Public view of a profile; the API token is never echoed back.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 100))]
    pub middle_name: Option<String>,
    #[validate(url)]
    pub avatar_url: Option<String>,
}

impl From<UserProfile> for ProfileResponse {
    fn from(p: UserProfile) -> Self {
        ProfileResponse {
            id: p.id,
            email: p.email,
            first_name: p.first_name,
            last_name: p.last_name,
            middle_name: p.middle_name,
            avatar_url: p.avatar_url,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(req: UpdateProfileRequest) -> Self {
        ProfileUpdate {
            first_name: req.first_name,
            last_name: req.last_name,
            middle_name: req.middle_name,
            avatar_url: req.avatar_url,
        }
    }
}
