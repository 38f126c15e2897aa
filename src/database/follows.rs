use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::Follow;
use super::StoreError;

/// Read-side interface for the repeat-follow guard.
#[async_trait]
pub trait FollowLookup: Send + Sync {
    async fn follow_exists(&self, user_id: Uuid, community: &str) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct FollowCollection {
    pool: PgPool,
}

impl FollowCollection {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a follow. The repeat-follow guard has already checked for a
    /// duplicate, but two concurrent requests can both pass it; the unique
    /// constraint on (user_id, community) rejects the loser, surfaced as the
    /// same conflict the guard would have produced.
    pub async fn add_one(&self, user_id: Uuid, community: &str) -> Result<Follow, StoreError> {
        sqlx::query_as::<_, Follow>(
            "INSERT INTO follows (id, user_id, community) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(community)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if StoreError::is_unique_violation(&e) {
                StoreError::DuplicateFollow
            } else {
                e.into()
            }
        })
    }

    /// Remove the matching follow; false when none existed.
    pub async fn delete_one(&self, user_id: Uuid, community: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND community = $2")
            .bind(user_id)
            .bind(community)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_all_by_user(&self, user_id: Uuid) -> Result<Vec<Follow>, StoreError> {
        let follows = sqlx::query_as::<_, Follow>(
            "SELECT * FROM follows WHERE user_id = $1 ORDER BY community ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(follows)
    }

    /// Account-deletion cascade; not exposed as a route.
    pub async fn delete_many_by_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl FollowLookup for FollowCollection {
    async fn follow_exists(&self, user_id: Uuid, community: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE user_id = $1 AND community = $2)",
        )
        .bind(user_id)
        .bind(community)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
