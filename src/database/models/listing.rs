use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::user::UserView;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Listing {
    pub id: Uuid,
    pub author_id: Uuid,
    pub date_created: DateTime<Utc>,
    pub name: String,
    pub quantity: i64,
    pub expiration: String,
    pub price: String,
    pub email: String,
}

/// A listing with its owning user resolved for response construction. The
/// author is `None` when the listing has outlived its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingView {
    pub id: Uuid,
    pub author: Option<UserView>,
    pub date_created: DateTime<Utc>,
    pub name: String,
    pub quantity: i64,
    pub expiration: String,
    pub price: String,
    pub email: String,
}
