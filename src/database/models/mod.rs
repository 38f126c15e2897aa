pub mod follow;
pub mod listing;
pub mod user;

pub use follow::Follow;
pub use listing::{Listing, ListingView};
pub use user::{User, UserView};
