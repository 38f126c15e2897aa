use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::User;
use super::StoreError;

/// Read-side interface the guard chain depends on. The session liveness,
/// account-exists, username-availability and author-exists guards resolve
/// identities through this trait; tests substitute an in-memory directory.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Username lookups are case-insensitive: "Alice" and "alice" name the
    /// same account.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, StoreError>;
}

/// Partial account update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub password: Option<String>,
    pub home_community: Option<String>,
    pub contact_info: Option<String>,
    pub allergies: Option<String>,
    pub dietary_restrictions: Option<String>,
}

#[derive(Clone)]
pub struct UserCollection {
    pool: PgPool,
}

impl UserCollection {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn add_one(
        &self,
        username: &str,
        password: &str,
        profile: &ProfileChanges,
    ) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users
                (id, username, password, home_community, contact_info,
                 allergies, dietary_restrictions, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(digest_password(password))
        .bind(&profile.home_community)
        .bind(&profile.contact_info)
        .bind(&profile.allergies)
        .bind(&profile.dietary_restrictions)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if StoreError::is_unique_violation(&e) {
                StoreError::DuplicateUsername
            } else {
                e.into()
            }
        })
    }

    /// Partial update: each field is applied only when present in the input.
    pub async fn update_one(&self, id: Uuid, changes: &ProfileChanges) -> Result<User, StoreError> {
        let password_digest = changes.password.as_deref().map(digest_password);

        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                username = COALESCE($2, username),
                password = COALESCE($3, password),
                home_community = COALESCE($4, home_community),
                contact_info = COALESCE($5, contact_info),
                allergies = COALESCE($6, allergies),
                dietary_restrictions = COALESCE($7, dietary_restrictions)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.username)
        .bind(password_digest)
        .bind(&changes.home_community)
        .bind(&changes.contact_info)
        .bind(&changes.allergies)
        .bind(&changes.dietary_restrictions)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if StoreError::is_unique_violation(&e) {
                StoreError::DuplicateUsername
            } else {
                StoreError::from(e)
            }
        })?
        .ok_or_else(|| StoreError::NotFound(format!("user {} does not exist", id)))
    }

    pub async fn delete_one(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserDirectory for UserCollection {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(username) = LOWER($1)")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn find_by_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(username) = LOWER($1) AND password = $2",
        )
        .bind(username)
        .bind(digest_password(password))
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}

fn digest_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    digest.iter().map(|byte| format!("{:02x}", byte)).collect()
}
