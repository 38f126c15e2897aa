use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::{json, Map};

use crate::database::{FollowCollection, ListingCollection, UserCollection};
use crate::error::ApiError;
use crate::guards::{run_chain, Guard, GuardContext};
use crate::session::SessionContext;
use crate::AppState;

/// GET /follows/session - the session user's follows.
pub async fn for_session(
    State(state): State<AppState>,
    Extension(mut session): Extension<SessionContext>,
) -> Result<Response, ApiError> {
    let users = UserCollection::new(state.pool.clone());
    let follows = FollowCollection::new(state.pool.clone());
    let listings = ListingCollection::new(state.pool.clone());
    let body = Map::new();

    let mut ctx = GuardContext::new(&mut session, &users, &follows, &listings, &body);
    run_chain(&[Guard::SessionAlive, Guard::LoggedIn], &mut ctx).await?;

    let user_id = session.current_user().ok_or_else(|| {
        ApiError::internal_server_error("An error occurred while processing your request.")
    })?;

    let all = follows.find_all_by_user(user_id).await?;
    Ok(Json(all).into_response())
}

/// GET /follows/listings - listings posted by members of followed
/// communities. The cross-collection join contract is still undecided, so
/// the route answers with an explicit error instead of a silent empty body.
pub async fn followed_listings(
    State(state): State<AppState>,
    Extension(mut session): Extension<SessionContext>,
) -> Result<Response, ApiError> {
    let users = UserCollection::new(state.pool.clone());
    let follows = FollowCollection::new(state.pool.clone());
    let listings = ListingCollection::new(state.pool.clone());
    let body = Map::new();

    let mut ctx = GuardContext::new(&mut session, &users, &follows, &listings, &body);
    run_chain(&[Guard::SessionAlive, Guard::LoggedIn], &mut ctx).await?;

    Err(ApiError::not_implemented(
        "Listings from followed communities are not yet supported.",
    ))
}

/// PUT /follows/:community_name - follow a community.
pub async fn follow(
    State(state): State<AppState>,
    Extension(mut session): Extension<SessionContext>,
    Path(community): Path<String>,
) -> Result<Response, ApiError> {
    let users = UserCollection::new(state.pool.clone());
    let follows = FollowCollection::new(state.pool.clone());
    let listings = ListingCollection::new(state.pool.clone());
    let body = Map::new();

    let mut ctx = GuardContext::new(&mut session, &users, &follows, &listings, &body);
    run_chain(
        &[
            Guard::SessionAlive,
            Guard::LoggedIn,
            Guard::NoRepeatFollow {
                community: &community,
            },
            Guard::ValidCommunityName { value: &community },
        ],
        &mut ctx,
    )
    .await?;

    let user_id = session.current_user().ok_or_else(|| {
        ApiError::internal_server_error("An error occurred while processing your request.")
    })?;

    // The guard's existence check is not atomic with this insert; a
    // concurrent duplicate surfaces as the same 409 via the unique pair
    // constraint.
    follows.add_one(user_id, &community).await?;

    Ok(Json(json!({ "message": format!("You are now following {}.", community) })).into_response())
}

/// DELETE /follows/:community_name - unfollow a community.
pub async fn unfollow(
    State(state): State<AppState>,
    Extension(mut session): Extension<SessionContext>,
    Path(community): Path<String>,
) -> Result<Response, ApiError> {
    let users = UserCollection::new(state.pool.clone());
    let follows = FollowCollection::new(state.pool.clone());
    let listings = ListingCollection::new(state.pool.clone());
    let body = Map::new();

    let mut ctx = GuardContext::new(&mut session, &users, &follows, &listings, &body);
    run_chain(
        &[
            Guard::SessionAlive,
            Guard::LoggedIn,
            Guard::ValidCommunityName { value: &community },
        ],
        &mut ctx,
    )
    .await?;

    let user_id = session.current_user().ok_or_else(|| {
        ApiError::internal_server_error("An error occurred while processing your request.")
    })?;

    let removed = follows.delete_one(user_id, &community).await?;
    if !removed {
        return Err(ApiError::not_found(format!(
            "You are not following {}.",
            community
        )));
    }

    Ok(
        Json(json!({ "message": format!("You are no longer following {}.", community) }))
            .into_response(),
    )
}
