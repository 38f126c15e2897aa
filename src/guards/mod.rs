//! Validation guard chain.
//!
//! Every route names an ordered list of [`Guard`] values; the dispatcher
//! walks the list and the handler's collection operation runs only if every
//! guard continued. A guard evaluation produces exactly one [`Outcome`]:
//! continue to the next guard, or respond with a terminal error. The two are
//! mutually exclusive by construction, so a guard can neither double-respond
//! nor silently drop a request.
//!
//! Ordering matters: session liveness runs first on any route whose later
//! guards read the session user, syntactic checks run before directory
//! lookups, and authentication-state checks run before checks that assume an
//! authenticated identity.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::community::Community;
use crate::database::models::{Listing, User};
use crate::database::{FollowLookup, ListingLookup, UserDirectory};
use crate::error::ApiError;
use crate::session::SessionContext;

pub const LOGIN_REQUIRED: &str = "You must be logged in to complete this action.";
pub const ALREADY_SIGNED_IN: &str = "You are already signed in.";

/// The single decision a guard execution is allowed to make.
#[derive(Debug)]
pub enum Outcome {
    Continue,
    Respond(ApiError),
}

/// Everything a guard may read, plus the slots where lookup guards stash what
/// they resolved so the handler does not repeat the query. The session is the
/// one thing a guard may mutate (liveness clears a dangling user id).
pub struct GuardContext<'a> {
    pub session: &'a mut SessionContext,
    pub directory: &'a dyn UserDirectory,
    pub follows: &'a dyn FollowLookup,
    pub listings: &'a dyn ListingLookup,
    pub body: &'a Map<String, Value>,
    pub resolved_user: Option<User>,
    pub resolved_listing: Option<Listing>,
}

impl<'a> GuardContext<'a> {
    pub fn new(
        session: &'a mut SessionContext,
        directory: &'a dyn UserDirectory,
        follows: &'a dyn FollowLookup,
        listings: &'a dyn ListingLookup,
        body: &'a Map<String, Value>,
    ) -> Self {
        Self {
            session,
            directory,
            follows,
            listings,
            body,
            resolved_user: None,
            resolved_listing: None,
        }
    }
}

/// One precondition check, tagged by capability. Path-parameter guards carry
/// their operand; body guards read the raw JSON map so that "key absent" and
/// "key present but null" stay distinguishable.
#[derive(Debug)]
pub enum Guard<'a> {
    /// The session's referenced user still exists in the directory. Clears
    /// the session user id when it does not.
    SessionAlive,
    /// The session carries a user id.
    LoggedIn,
    /// The session carries no user id.
    LoggedOut,
    /// Body `username` is a nonempty word-character string. An absent key
    /// passes only when the field is optional for this route.
    ValidUsername { required: bool },
    /// Body `password` is nonempty and whitespace-free.
    ValidPassword { required: bool },
    /// Body `home_community`, when the key is present, is in the fixed set.
    ValidHomeCommunity,
    /// Body `contact_info`, when the key is present, has length >= 1.
    ValidContactInfo,
    /// Body field, when the key is present, carries a defined string value;
    /// the empty string is a defined value.
    DefinedIfPresent {
        field: &'static str,
        label: &'static str,
    },
    /// Body username and password both supplied and matching an account via
    /// the credential lookup. Stashes the account.
    AccountExists,
    /// A username being set is not already held by a different account.
    UsernameAvailable,
    /// The author query parameter resolves to an account. Stashes it.
    AuthorExists { username: &'a str },
    /// The (session user, community) pair has no existing follow.
    NoRepeatFollow { community: &'a str },
    /// The path parameter names a community in the fixed set.
    ValidCommunityName { value: &'a str },
    /// The path id parses and resolves to a listing. Stashes it.
    ListingExists { id: &'a str },
    /// The stashed listing is owned by the session user.
    ListingOwner,
    /// Creation body carries a nonempty name/expiration/price/email and a
    /// non-negative integer quantity.
    ValidListingFields,
}

impl Guard<'_> {
    pub async fn evaluate(&self, ctx: &mut GuardContext<'_>) -> Outcome {
        match self {
            Guard::SessionAlive => session_alive(ctx).await,
            Guard::LoggedIn => logged_in(ctx),
            Guard::LoggedOut => logged_out(ctx),
            Guard::ValidUsername { required } => valid_username(ctx, *required),
            Guard::ValidPassword { required } => valid_password(ctx, *required),
            Guard::ValidHomeCommunity => valid_home_community(ctx),
            Guard::ValidContactInfo => valid_contact_info(ctx),
            Guard::DefinedIfPresent { field, label } => defined_if_present(ctx, field, label),
            Guard::AccountExists => account_exists(ctx).await,
            Guard::UsernameAvailable => username_available(ctx).await,
            Guard::AuthorExists { username } => author_exists(ctx, username).await,
            Guard::NoRepeatFollow { community } => no_repeat_follow(ctx, community).await,
            Guard::ValidCommunityName { value } => valid_community_name(value),
            Guard::ListingExists { id } => listing_exists(ctx, id).await,
            Guard::ListingOwner => listing_owner(ctx),
            Guard::ValidListingFields => valid_listing_fields(ctx),
        }
    }
}

/// Evaluate an ordered guard list, stopping at the first terminal response.
pub async fn run_chain(guards: &[Guard<'_>], ctx: &mut GuardContext<'_>) -> Result<(), ApiError> {
    for guard in guards {
        match guard.evaluate(ctx).await {
            Outcome::Continue => {}
            Outcome::Respond(error) => {
                tracing::debug!(guard = ?guard, status = error.status_code(), "guard halted request");
                return Err(error);
            }
        }
    }
    Ok(())
}

/// Accepts iff nonempty and entirely letters, digits or underscores.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Accepts iff nonempty and free of whitespace.
pub fn is_valid_password(password: &str) -> bool {
    !password.is_empty() && !password.chars().any(char::is_whitespace)
}

async fn session_alive(ctx: &mut GuardContext<'_>) -> Outcome {
    let Some(user_id) = ctx.session.current_user() else {
        return Outcome::Continue;
    };

    match ctx.directory.find_by_id(user_id).await {
        Ok(Some(_)) => Outcome::Continue,
        Ok(None) => {
            tracing::warn!(
                session = %ctx.session.id(),
                user = %user_id,
                "session references a deleted account, clearing it"
            );
            ctx.session.sign_out().await;
            Outcome::Respond(ApiError::stale_session())
        }
        Err(e) => Outcome::Respond(e.into()),
    }
}

fn logged_in(ctx: &GuardContext<'_>) -> Outcome {
    if ctx.session.is_authenticated() {
        Outcome::Continue
    } else {
        Outcome::Respond(ApiError::forbidden(LOGIN_REQUIRED))
    }
}

fn logged_out(ctx: &GuardContext<'_>) -> Outcome {
    if ctx.session.is_authenticated() {
        Outcome::Respond(ApiError::forbidden(ALREADY_SIGNED_IN))
    } else {
        Outcome::Continue
    }
}

fn valid_username(ctx: &GuardContext<'_>, required: bool) -> Outcome {
    match ctx.body.get("username") {
        None if !required => Outcome::Continue,
        Some(Value::String(s)) if is_valid_username(s) => Outcome::Continue,
        _ => Outcome::Respond(ApiError::bad_request(
            "Username must be a nonempty string of letters, numbers and underscores.",
        )),
    }
}

fn valid_password(ctx: &GuardContext<'_>, required: bool) -> Outcome {
    match ctx.body.get("password") {
        None if !required => Outcome::Continue,
        Some(Value::String(s)) if is_valid_password(s) => Outcome::Continue,
        _ => Outcome::Respond(ApiError::bad_request(
            "Password must be a nonempty string containing no whitespace.",
        )),
    }
}

fn valid_home_community(ctx: &GuardContext<'_>) -> Outcome {
    match ctx.body.get("home_community") {
        None => Outcome::Continue,
        Some(Value::String(s)) if Community::is_valid_name(s) => Outcome::Continue,
        _ => Outcome::Respond(ApiError::bad_request(
            "Home community must be one of the recognized communities.",
        )),
    }
}

fn valid_contact_info(ctx: &GuardContext<'_>) -> Outcome {
    match ctx.body.get("contact_info") {
        None => Outcome::Continue,
        Some(Value::String(s)) if !s.is_empty() => Outcome::Continue,
        _ => Outcome::Respond(ApiError::bad_request("Contact info must not be empty.")),
    }
}

fn defined_if_present(ctx: &GuardContext<'_>, field: &str, label: &str) -> Outcome {
    match ctx.body.get(field) {
        None => Outcome::Continue,
        // The empty string is a defined value; null is not.
        Some(Value::String(_)) => Outcome::Continue,
        _ => Outcome::Respond(ApiError::bad_request(format!(
            "{} must carry a value when the field is supplied.",
            label
        ))),
    }
}

async fn account_exists(ctx: &mut GuardContext<'_>) -> Outcome {
    let username = ctx
        .body
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let password = ctx
        .body
        .get("password")
        .and_then(Value::as_str)
        .unwrap_or_default();

    if username.is_empty() || password.is_empty() {
        return Outcome::Respond(ApiError::bad_request(
            "Missing username or password credentials for signing in.",
        ));
    }

    match ctx.directory.find_by_credentials(username, password).await {
        Ok(Some(user)) => {
            ctx.resolved_user = Some(user);
            Outcome::Continue
        }
        Ok(None) => Outcome::Respond(ApiError::unauthorized(
            "Invalid username or password provided.",
        )),
        Err(e) => Outcome::Respond(e.into()),
    }
}

async fn username_available(ctx: &mut GuardContext<'_>) -> Outcome {
    // Nothing being set, nothing to collide with.
    let Some(candidate) = ctx.body.get("username").and_then(Value::as_str) else {
        return Outcome::Continue;
    };

    match ctx.directory.find_by_username(candidate).await {
        Ok(Some(existing)) if ctx.session.current_user() != Some(existing.id) => {
            Outcome::Respond(ApiError::conflict(
                "An account with this username already exists.",
            ))
        }
        Ok(_) => Outcome::Continue,
        Err(e) => Outcome::Respond(e.into()),
    }
}

async fn author_exists(ctx: &mut GuardContext<'_>, username: &str) -> Outcome {
    if username.is_empty() {
        return Outcome::Respond(ApiError::bad_request("Author username must not be empty."));
    }

    match ctx.directory.find_by_username(username).await {
        Ok(Some(user)) => {
            ctx.resolved_user = Some(user);
            Outcome::Continue
        }
        Ok(None) => Outcome::Respond(ApiError::not_found(format!(
            "A user with username {} does not exist.",
            username
        ))),
        Err(e) => Outcome::Respond(e.into()),
    }
}

async fn no_repeat_follow(ctx: &mut GuardContext<'_>, community: &str) -> Outcome {
    let Some(user_id) = ctx.session.current_user() else {
        return Outcome::Respond(ApiError::forbidden(LOGIN_REQUIRED));
    };

    match ctx.follows.follow_exists(user_id, community).await {
        Ok(true) => Outcome::Respond(ApiError::conflict(
            "You are already following this community.",
        )),
        Ok(false) => Outcome::Continue,
        Err(e) => Outcome::Respond(e.into()),
    }
}

fn valid_community_name(value: &str) -> Outcome {
    if Community::is_valid_name(value) {
        Outcome::Continue
    } else {
        Outcome::Respond(ApiError::bad_request(format!(
            "{} is not a recognized community.",
            value
        )))
    }
}

async fn listing_exists(ctx: &mut GuardContext<'_>, id: &str) -> Outcome {
    // A malformed id cannot name a listing; same answer as an unknown one.
    let Ok(listing_id) = Uuid::parse_str(id) else {
        return Outcome::Respond(ApiError::not_found(format!(
            "A listing with id {} does not exist.",
            id
        )));
    };

    match ctx.listings.listing_by_id(listing_id).await {
        Ok(Some(listing)) => {
            ctx.resolved_listing = Some(listing);
            Outcome::Continue
        }
        Ok(None) => Outcome::Respond(ApiError::not_found(format!(
            "A listing with id {} does not exist.",
            id
        ))),
        Err(e) => Outcome::Respond(e.into()),
    }
}

fn listing_owner(ctx: &GuardContext<'_>) -> Outcome {
    let (Some(listing), Some(user_id)) =
        (ctx.resolved_listing.as_ref(), ctx.session.current_user())
    else {
        // Reachable only through a misordered chain; never blame the client.
        return Outcome::Respond(ApiError::internal_server_error(
            "An error occurred while processing your request.",
        ));
    };

    if listing.author_id == user_id {
        Outcome::Continue
    } else {
        Outcome::Respond(ApiError::forbidden(
            "You cannot modify listings that you do not own.",
        ))
    }
}

fn valid_listing_fields(ctx: &GuardContext<'_>) -> Outcome {
    for (field, label) in [
        ("name", "Listing name"),
        ("expiration", "Listing expiration"),
        ("price", "Listing price"),
        ("email", "Listing contact email"),
    ] {
        let ok = matches!(ctx.body.get(field), Some(Value::String(s)) if !s.trim().is_empty());
        if !ok {
            return Outcome::Respond(ApiError::bad_request(format!(
                "{} must not be empty.",
                label
            )));
        }
    }

    let quantity_ok = ctx
        .body
        .get("quantity")
        .and_then(Value::as_i64)
        .is_some_and(|q| q >= 0);
    if !quantity_ok {
        return Outcome::Respond(ApiError::bad_request(
            "Listing quantity must be a non-negative integer.",
        ));
    }

    Outcome::Continue
}
