pub mod follows;
pub mod listings;
pub mod manager;
pub mod models;
pub mod users;

use thiserror::Error;

pub use follows::{FollowCollection, FollowLookup};
pub use listings::{ListingCollection, ListingLookup, ListingUpdate, NewListing};
pub use users::{ProfileChanges, UserCollection, UserDirectory};

/// Errors from the data-access layer. Callers translate these into HTTP
/// status codes; missing records are signalled with `Option`/`bool` results
/// rather than errors wherever the caller decides the policy.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("An account with this username already exists")]
    DuplicateUsername,

    #[error("A follow for this user and community already exists")]
    DuplicateFollow,

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    /// True when the wrapped database error is a unique-constraint violation.
    /// The follow and username writes rely on this to stay correct under
    /// concurrent requests that both passed their guard's existence check.
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(
            err,
            sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation
        )
    }
}
