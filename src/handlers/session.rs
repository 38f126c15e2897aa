use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::{json, Map, Value};

use crate::database::models::UserView;
use crate::database::{FollowCollection, ListingCollection, UserCollection, UserDirectory};
use crate::error::ApiError;
use crate::guards::{run_chain, Guard, GuardContext};
use crate::session::SessionContext;
use crate::AppState;

/// GET /session - the account behind the current session, or null.
pub async fn current(
    State(state): State<AppState>,
    Extension(mut session): Extension<SessionContext>,
) -> Result<Response, ApiError> {
    let users = UserCollection::new(state.pool.clone());
    let follows = FollowCollection::new(state.pool.clone());
    let listings = ListingCollection::new(state.pool.clone());
    let body = Map::new();

    let mut ctx = GuardContext::new(&mut session, &users, &follows, &listings, &body);
    run_chain(&[Guard::SessionAlive], &mut ctx).await?;

    let user = match session.current_user() {
        Some(id) => users.find_by_id(id).await?.map(UserView::from),
        None => None,
    };

    Ok(Json(json!({ "user": user })).into_response())
}

/// POST /session - sign in.
pub async fn login(
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
            Guard::LoggedOut,
            Guard::ValidUsername { required: true },
            Guard::ValidPassword { required: true },
            Guard::AccountExists,
        ],
        &mut ctx,
    )
    .await?;

    let user = ctx.resolved_user.take().ok_or_else(|| {
        ApiError::internal_server_error("An error occurred while processing your request.")
    })?;

    session.sign_in(user.id).await;

    Ok(Json(json!({
        "message": "You have signed in successfully.",
        "user": UserView::from(user)
    }))
    .into_response())
}

/// DELETE /session - sign out.
pub async fn logout(
    State(state): State<AppState>,
    Extension(mut session): Extension<SessionContext>,
) -> Result<Response, ApiError> {
    let users = UserCollection::new(state.pool.clone());
    let follows = FollowCollection::new(state.pool.clone());
    let listings = ListingCollection::new(state.pool.clone());
    let body = Map::new();

    let mut ctx = GuardContext::new(&mut session, &users, &follows, &listings, &body);
    run_chain(&[Guard::SessionAlive, Guard::LoggedIn], &mut ctx).await?;

    session.sign_out().await;

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "You have been signed out successfully." })),
    )
        .into_response())
}
