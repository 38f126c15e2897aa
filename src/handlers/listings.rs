use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::database::{
    FollowCollection, ListingCollection, ListingUpdate, NewListing, UserCollection,
};
use crate::error::ApiError;
use crate::guards::{run_chain, Guard, GuardContext};
use crate::session::SessionContext;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListingsQuery {
    /// Filter by author username; when present, the author must resolve.
    pub author: Option<String>,
}

/// GET /listings - all listings, or one author's when ?author= is given.
pub async fn list(
    State(state): State<AppState>,
    Extension(mut session): Extension<SessionContext>,
    Query(query): Query<ListingsQuery>,
) -> Result<Response, ApiError> {
    let users = UserCollection::new(state.pool.clone());
    let follows = FollowCollection::new(state.pool.clone());
    let listings = ListingCollection::new(state.pool.clone());
    let body = Map::new();

    let Some(author) = query.author else {
        let all = listings.find_all().await?;
        return Ok(Json(all).into_response());
    };

    let mut ctx = GuardContext::new(&mut session, &users, &follows, &listings, &body);
    run_chain(&[Guard::AuthorExists { username: &author }], &mut ctx).await?;

    let user = ctx.resolved_user.take().ok_or_else(|| {
        ApiError::internal_server_error("An error occurred while processing your request.")
    })?;

    let items = listings.find_all_by_user(user.id).await?;
    Ok(Json(items).into_response())
}

/// POST /listings - create a listing owned by the session user.
pub async fn create(
    State(state): State<AppState>,
    Extension(mut session): Extension<SessionContext>,
    Json(payload): Json<Value>,
) -> Result<Response, ApiError> {
    let users = UserCollection::new(state.pool.clone());
    let follows = FollowCollection::new(state.pool.clone());
    let listings = ListingCollection::new(state.pool.clone());
    let body = payload.as_object().cloned().unwrap_or_default();

    let mut ctx = GuardContext::new(&mut session, &users, &follows, &listings, &body);
    run_chain(
        &[
            Guard::SessionAlive,
            Guard::LoggedIn,
            Guard::ValidListingFields,
        ],
        &mut ctx,
    )
    .await?;

    let author_id = session.current_user().ok_or_else(|| {
        ApiError::internal_server_error("An error occurred while processing your request.")
    })?;

    let input: NewListing = serde_json::from_value(Value::Object(body))
        .map_err(|e| ApiError::bad_request(format!("Invalid listing payload: {}.", e)))?;

    let listing = listings.add_one(author_id, &input).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Your listing was created successfully.",
            "listing": listing
        })),
    )
        .into_response())
}

/// PATCH /listings/:listing_id - partial update (quantity and/or price).
pub async fn update(
    State(state): State<AppState>,
    Extension(mut session): Extension<SessionContext>,
    Path(listing_id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Response, ApiError> {
    let users = UserCollection::new(state.pool.clone());
    let follows = FollowCollection::new(state.pool.clone());
    let listings = ListingCollection::new(state.pool.clone());
    let body = payload.as_object().cloned().unwrap_or_default();

    let mut ctx = GuardContext::new(&mut session, &users, &follows, &listings, &body);
    run_chain(
        &[
            Guard::SessionAlive,
            Guard::LoggedIn,
            Guard::ListingExists { id: &listing_id },
            Guard::ListingOwner,
        ],
        &mut ctx,
    )
    .await?;

    let resolved = ctx.resolved_listing.take().ok_or_else(|| {
        ApiError::internal_server_error("An error occurred while processing your request.")
    })?;

    let changes: ListingUpdate = serde_json::from_value(Value::Object(body))
        .map_err(|e| ApiError::bad_request(format!("Invalid listing payload: {}.", e)))?;

    let listing = listings
        .update_one(resolved.id, &changes)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!("A listing with id {} does not exist.", listing_id))
        })?;

    Ok(Json(json!({
        "message": "Your listing was updated successfully.",
        "listing": listing
    }))
    .into_response())
}

/// DELETE /listings/:listing_id - remove an owned listing.
pub async fn remove(
    State(state): State<AppState>,
    Extension(mut session): Extension<SessionContext>,
    Path(listing_id): Path<String>,
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
            Guard::ListingExists { id: &listing_id },
            Guard::ListingOwner,
        ],
        &mut ctx,
    )
    .await?;

    let resolved = ctx.resolved_listing.take().ok_or_else(|| {
        ApiError::internal_server_error("An error occurred while processing your request.")
    })?;

    listings.delete_one(resolved.id).await?;

    Ok(Json(json!({ "message": "Your listing was deleted successfully." })).into_response())
}
