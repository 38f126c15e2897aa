use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::{json, Map, Value};

use crate::database::models::UserView;
use crate::database::{
    FollowCollection, ListingCollection, ProfileChanges, UserCollection,
};
use crate::error::ApiError;
use crate::guards::{run_chain, Guard, GuardContext};
use crate::session::SessionContext;
use crate::AppState;

const PROFILE_GUARDS: [Guard<'static>; 4] = [
    Guard::ValidHomeCommunity,
    Guard::ValidContactInfo,
    Guard::DefinedIfPresent {
        field: "allergies",
        label: "Allergies",
    },
    Guard::DefinedIfPresent {
        field: "dietary_restrictions",
        label: "Dietary restrictions",
    },
];

fn parse_profile(body: &Map<String, Value>) -> Result<ProfileChanges, ApiError> {
    serde_json::from_value(Value::Object(body.clone()))
        .map_err(|e| ApiError::bad_request(format!("Invalid account payload: {}.", e)))
}

/// POST /users - create an account and sign it in.
pub async fn create(
    State(state): State<AppState>,
    Extension(mut session): Extension<SessionContext>,
    Json(payload): Json<Value>,
) -> Result<Response, ApiError> {
    let users = UserCollection::new(state.pool.clone());
    let follows = FollowCollection::new(state.pool.clone());
    let listings = ListingCollection::new(state.pool.clone());
    let body = payload.as_object().cloned().unwrap_or_default();

    // Syntactic checks first, the uniqueness lookup last.
    let mut chain = vec![
        Guard::SessionAlive,
        Guard::LoggedOut,
        Guard::ValidUsername { required: true },
        Guard::ValidPassword { required: true },
    ];
    chain.extend(PROFILE_GUARDS);
    chain.push(Guard::UsernameAvailable);

    let mut ctx = GuardContext::new(&mut session, &users, &follows, &listings, &body);
    run_chain(&chain, &mut ctx).await?;

    let changes = parse_profile(&body)?;
    let (Some(username), Some(password)) = (changes.username.clone(), changes.password.clone())
    else {
        return Err(ApiError::internal_server_error(
            "An error occurred while processing your request.",
        ));
    };

    let user = users.add_one(&username, &password, &changes).await?;
    session.sign_in(user.id).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Your account was created successfully. You have been signed in.",
            "user": UserView::from(user)
        })),
    )
        .into_response())
}

/// PATCH /users - partial profile update for the signed-in account.
pub async fn update(
    State(state): State<AppState>,
    Extension(mut session): Extension<SessionContext>,
    Json(payload): Json<Value>,
) -> Result<Response, ApiError> {
    let users = UserCollection::new(state.pool.clone());
    let follows = FollowCollection::new(state.pool.clone());
    let listings = ListingCollection::new(state.pool.clone());
    let body = payload.as_object().cloned().unwrap_or_default();

    let mut chain = vec![
        Guard::SessionAlive,
        Guard::LoggedIn,
        Guard::ValidUsername { required: false },
        Guard::ValidPassword { required: false },
    ];
    chain.extend(PROFILE_GUARDS);
    chain.push(Guard::UsernameAvailable);

    let mut ctx = GuardContext::new(&mut session, &users, &follows, &listings, &body);
    run_chain(&chain, &mut ctx).await?;

    let user_id = session.current_user().ok_or_else(|| {
        ApiError::internal_server_error("An error occurred while processing your request.")
    })?;

    let changes = parse_profile(&body)?;
    let user = users.update_one(user_id, &changes).await?;

    Ok(Json(json!({
        "message": "Your profile was updated successfully.",
        "user": UserView::from(user)
    }))
    .into_response())
}

/// DELETE /users - delete the signed-in account, its listings and follows.
pub async fn remove(
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

    // Explicit cascade: the listings and follows go first, then the account.
    listings.delete_many(user_id).await?;
    follows.delete_many_by_user(user_id).await?;
    users.delete_one(user_id).await?;
    session.sign_out().await;

    Ok(Json(json!({ "message": "Your account has been deleted." })).into_response())
}
