use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use foundermentor_database::{Profile, User};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    /// Any combination of "mentee" and "mentor".
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 5000))]
    pub bio: Option<String>,

    pub skills: Option<Vec<String>>,
    pub interests: Option<Vec<String>>,
    pub industries: Option<Vec<String>>,

    #[validate(length(max = 200))]
    pub location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleChangeRequest {
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
    pub email_verified: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(row: User) -> Self {
        Self {
            user_id: row.user_id,
            username: row.username,
            email: row.email,
            roles: row.roles,
            email_verified: row.email_verified,
            is_verified: row.is_verified,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub industries: Vec<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(row: Profile) -> Self {
        Self {
            user_id: row.user_id,
            bio: row.bio,
            skills: row.skills,
            interests: row.interests,
            industries: row.industries,
            location: row.location,
            avatar_url: row.avatar_url,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
    pub profile: ProfileResponse,
}
