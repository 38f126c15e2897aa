use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// Credential digest, never serialized to clients.
    pub password: String,
    pub home_community: Option<String>,
    pub contact_info: Option<String>,
    pub allergies: Option<String>,
    pub dietary_restrictions: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Client-facing projection of a user, without the credential digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub home_community: Option<String>,
    pub contact_info: Option<String>,
    pub allergies: Option<String>,
    pub dietary_restrictions: Option<String>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            home_community: user.home_community,
            contact_info: user.contact_info,
            allergies: user.allergies,
            dietary_restrictions: user.dietary_restrictions,
        }
    }
}
