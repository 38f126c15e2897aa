use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::models::{Listing, ListingView, User, UserView};
use super::StoreError;

/// Read-side interface for the listing-existence guard.
#[async_trait]
pub trait ListingLookup: Send + Sync {
    async fn listing_by_id(&self, id: Uuid) -> Result<Option<Listing>, StoreError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewListing {
    pub name: String,
    pub quantity: i64,
    pub expiration: String,
    pub price: String,
    pub email: String,
}

/// Partial update. Presence decides whether a field is applied: a present
/// zero quantity and a present empty-string price are both legitimate
/// updates, an absent key never touches the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingUpdate {
    pub quantity: Option<i64>,
    pub price: Option<String>,
}

impl ListingUpdate {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none() && self.price.is_none()
    }
}

const SELECT_POPULATED: &str = r#"
    SELECT l.id, l.author_id, l.date_created, l.name, l.quantity,
           l.expiration, l.price, l.email,
           u.id AS owner_id,
           u.username AS owner_username,
           u.home_community AS owner_home_community,
           u.contact_info AS owner_contact_info,
           u.allergies AS owner_allergies,
           u.dietary_restrictions AS owner_dietary_restrictions
      FROM listings l
      LEFT JOIN users u ON u.id = l.author_id
"#;

/// Flattened join row; the owner columns are null when the listing has
/// outlived its author.
#[derive(FromRow)]
struct PopulatedRow {
    id: Uuid,
    author_id: Uuid,
    date_created: DateTime<Utc>,
    name: String,
    quantity: i64,
    expiration: String,
    price: String,
    email: String,
    owner_id: Option<Uuid>,
    owner_username: Option<String>,
    owner_home_community: Option<String>,
    owner_contact_info: Option<String>,
    owner_allergies: Option<String>,
    owner_dietary_restrictions: Option<String>,
}

impl From<PopulatedRow> for ListingView {
    fn from(row: PopulatedRow) -> Self {
        let author = match (row.owner_id, row.owner_username) {
            (Some(id), Some(username)) => Some(UserView {
                id,
                username,
                home_community: row.owner_home_community,
                contact_info: row.owner_contact_info,
                allergies: row.owner_allergies,
                dietary_restrictions: row.owner_dietary_restrictions,
            }),
            _ => None,
        };

        ListingView {
            id: row.id,
            author,
            date_created: row.date_created,
            name: row.name,
            quantity: row.quantity,
            expiration: row.expiration,
            price: row.price,
            email: row.email,
        }
    }
}

#[derive(Clone)]
pub struct ListingCollection {
    pool: PgPool,
}

impl ListingCollection {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a listing stamped with the current time and return it with the
    /// owning user resolved.
    pub async fn add_one(
        &self,
        author_id: Uuid,
        input: &NewListing,
    ) -> Result<ListingView, StoreError> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO listings
                (id, author_id, date_created, name, quantity, expiration, price, email)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id)
        .bind(author_id)
        .bind(Utc::now())
        .bind(&input.name)
        .bind(input.quantity)
        .bind(&input.expiration)
        .bind(&input.price)
        .bind(&input.email)
        .execute(&self.pool)
        .await?;

        self.find_one(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("listing {} does not exist", id)))
    }

    pub async fn find_one(&self, id: Uuid) -> Result<Option<ListingView>, StoreError> {
        let sql = format!("{} WHERE l.id = $1", SELECT_POPULATED);
        let row = sqlx::query_as::<_, PopulatedRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ListingView::from))
    }

    /// All listings, soonest expiration first.
    pub async fn find_all(&self) -> Result<Vec<ListingView>, StoreError> {
        let sql = format!(
            "{} ORDER BY l.expiration ASC, l.date_created ASC",
            SELECT_POPULATED
        );
        let rows = sqlx::query_as::<_, PopulatedRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ListingView::from).collect())
    }

    /// One user's listings, soonest expiration first. The user is resolved
    /// first and an unresolved id is an error, matching the author-query
    /// route contract.
    pub async fn find_all_by_user(&self, user_id: Uuid) -> Result<Vec<ListingView>, StoreError> {
        let author = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        if author.is_none() {
            return Err(StoreError::NotFound(format!(
                "user {} does not exist",
                user_id
            )));
        }

        let sql = format!(
            "{} WHERE l.author_id = $1 ORDER BY l.expiration ASC, l.date_created ASC",
            SELECT_POPULATED
        );
        let rows = sqlx::query_as::<_, PopulatedRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ListingView::from).collect())
    }

    /// Partial update; returns `None` when no listing with this id exists.
    pub async fn update_one(
        &self,
        id: Uuid,
        update: &ListingUpdate,
    ) -> Result<Option<ListingView>, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE listings SET
                quantity = COALESCE($2, quantity),
                price = COALESCE($3, price)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.quantity)
        .bind(&update.price)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_one(id).await
    }

    pub async fn delete_one(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every listing owned by the given user. Account-deletion
    /// cascade; not exposed as a route.
    pub async fn delete_many(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM listings WHERE author_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ListingLookup for ListingCollection {
    async fn listing_by_id(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        let listing = sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(listing)
    }
}
