pub mod community;
pub mod config;
pub mod database;
pub mod error;
pub mod guards;
pub mod handlers;
pub mod session;

use axum::{
    extract::State,
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use session::SessionStore;

/// Shared application state: the connection pool and the session store.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub sessions: SessionStore,
}

pub fn app(state: AppState) -> Router {
    let server = &config::config().server;

    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(session_routes())
        .merge(user_routes())
        .merge(listing_routes())
        .merge(follow_routes())
        // Every route sees a session context, even the anonymous ones.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::session_middleware,
        ));

    if server.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    if server.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn session_routes() -> Router<AppState> {
    use handlers::session;

    Router::new().route(
        "/session",
        get(session::current)
            .post(session::login)
            .delete(session::logout),
    )
}

fn user_routes() -> Router<AppState> {
    use handlers::users;

    Router::new().route(
        "/users",
        post(users::create).patch(users::update).delete(users::remove),
    )
}

fn listing_routes() -> Router<AppState> {
    use handlers::listings;

    Router::new()
        .route("/listings", get(listings::list).post(listings::create))
        .route(
            "/listings/:listing_id",
            patch(listings::update).delete(listings::remove),
        )
}

fn follow_routes() -> Router<AppState> {
    use handlers::follows;

    Router::new()
        .route("/follows/session", get(follows::for_session))
        .route("/follows/listings", get(follows::followed_listings))
        .route(
            "/follows/:community_name",
            put(follows::follow).delete(follows::unfollow),
        )
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "name": "Pantry API",
        "version": version,
        "description": "Community food-sharing backend built with Rust (Axum)",
        "endpoints": {
            "home": "/ (public)",
            "session": "GET/POST/DELETE /session",
            "users": "POST/PATCH/DELETE /users",
            "listings": "GET/POST /listings, PATCH/DELETE /listings/:listingId",
            "follows": "GET /follows/session, GET /follows/listings, PUT/DELETE /follows/:communityName",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match database::manager::health_check(&state.pool).await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "status": "degraded",
                "timestamp": now,
                "error": "database unavailable",
                "database_error": e.to_string()
            })),
        ),
    }
}
