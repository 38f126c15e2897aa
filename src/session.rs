//! Server-held session state.
//!
//! Each client carries an opaque session id in a cookie; the id keys into an
//! in-process store holding at most an authenticated user id. The session
//! context is an explicit value handed to guards and handlers - its lifecycle
//! (set on login, cleared on logout or detected staleness) is an observable
//! state transition on the store, not ambient state.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config;
use crate::AppState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Option<Uuid>,
}

/// Shared session store, keyed by session id.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, SessionData>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve an existing session or issue a fresh one. The second element
    /// is true when a new id was issued and a cookie must be set.
    pub async fn open(&self, existing: Option<Uuid>) -> (SessionContext, bool) {
        if let Some(id) = existing {
            let sessions = self.inner.read().await;
            if let Some(data) = sessions.get(&id) {
                return (
                    SessionContext {
                        id,
                        data: *data,
                        store: self.clone(),
                    },
                    false,
                );
            }
        }

        // Unknown or absent id: issue a fresh anonymous session.
        let id = Uuid::new_v4();
        let data = SessionData::default();
        self.inner.write().await.insert(id, data);
        (
            SessionContext {
                id,
                data,
                store: self.clone(),
            },
            true,
        )
    }

    /// Current stored state for a session id, if the session exists.
    pub async fn peek(&self, id: Uuid) -> Option<SessionData> {
        self.inner.read().await.get(&id).copied()
    }

    async fn write(&self, id: Uuid, data: SessionData) {
        self.inner.write().await.insert(id, data);
    }
}

/// Per-request session context. Mutations write through to the store
/// immediately, so a later request with the same cookie observes them.
#[derive(Clone)]
pub struct SessionContext {
    id: Uuid,
    data: SessionData,
    store: SessionStore,
}

impl SessionContext {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn current_user(&self) -> Option<Uuid> {
        self.data.user_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.data.user_id.is_some()
    }

    pub async fn sign_in(&mut self, user_id: Uuid) {
        self.data.user_id = Some(user_id);
        self.store.write(self.id, self.data).await;
    }

    pub async fn sign_out(&mut self) {
        self.data.user_id = None;
        self.store.write(self.id, self.data).await;
    }
}

/// Middleware that attaches a `SessionContext` to every request and sets the
/// session cookie when a new id was issued.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let session_config = &config::config().session;

    let existing = jar
        .get(&session_config.cookie_name)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok());

    let (context, issued) = state.sessions.open(existing).await;
    let session_id = context.id();
    request.extensions_mut().insert(context);

    let response = next.run(request).await;

    if issued {
        let cookie = Cookie::build((session_config.cookie_name.clone(), session_id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(session_config.cookie_secure)
            .build();
        (jar.add(cookie), response).into_response()
    } else {
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_issues_fresh_anonymous_session() {
        let store = SessionStore::new();
        let (context, issued) = store.open(None).await;

        assert!(issued);
        assert!(!context.is_authenticated());
        assert_eq!(store.peek(context.id()).await, Some(SessionData::default()));
    }

    #[tokio::test]
    async fn sign_in_and_out_write_through_to_the_store() {
        let store = SessionStore::new();
        let (mut context, _) = store.open(None).await;
        let user = Uuid::new_v4();

        context.sign_in(user).await;
        assert_eq!(context.current_user(), Some(user));
        assert_eq!(
            store.peek(context.id()).await,
            Some(SessionData { user_id: Some(user) })
        );

        context.sign_out().await;
        assert_eq!(context.current_user(), None);
        assert_eq!(store.peek(context.id()).await, Some(SessionData::default()));
    }

    #[tokio::test]
    async fn open_resolves_existing_session_state() {
        let store = SessionStore::new();
        let (mut first, _) = store.open(None).await;
        let user = Uuid::new_v4();
        first.sign_in(user).await;

        let (second, issued) = store.open(Some(first.id())).await;
        assert!(!issued);
        assert_eq!(second.id(), first.id());
        assert_eq!(second.current_user(), Some(user));
    }

    #[tokio::test]
    async fn unknown_session_id_gets_a_new_session() {
        let store = SessionStore::new();
        let (context, issued) = store.open(Some(Uuid::new_v4())).await;

        assert!(issued);
        assert!(!context.is_authenticated());
    }
}
