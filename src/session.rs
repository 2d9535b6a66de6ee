use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Role;

/// Session
///
/// The authenticated identity held for the lifetime of a login. Exactly one
/// session exists per issued token; it is written at login, read at every
/// guard check, and removed at logout. The original system kept this blob in
/// browser localStorage with ambient lookups; here it is an explicit store
/// with a defined init/teardown lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Session {
    pub token: String,
    pub usuario_id: Uuid,
    pub role: Role,
    pub username: String,
    pub email: String,
}

// 1. SessionStore Contract
/// SessionStore
///
/// Abstract contract for the persisted session blob. The indirection keeps the
/// guard and the auth extractor independent of where sessions actually live
/// (process memory today, an external store if the portal is ever scaled out).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a freshly authenticated session, keyed by its token.
    async fn save(&self, session: Session);

    /// Looks up the session for a bearer token. `None` means the token was
    /// never issued or has been invalidated by logout.
    async fn load(&self, token: &str) -> Option<Session>;

    /// Removes the session for a token (logout / invalid-role teardown).
    /// Returns true if a session was actually present.
    async fn clear(&self, token: &str) -> bool;
}

/// SessionState
///
/// The concrete type used to share the session store across the application state.
pub type SessionState = Arc<dyn SessionStore>;

// 2. The In-Memory Implementation
/// InMemorySessionStore
///
/// Single-process implementation backed by a `HashMap` behind an async RwLock.
/// The portal has a single logical writer per session (the authenticated user)
/// and many readers (every guarded view), which this lock shape mirrors.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, session: Session) {
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session);
    }

    async fn load(&self, token: &str) -> Option<Session> {
        self.sessions.read().await.get(token).cloned()
    }

    async fn clear(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(token: &str, role: Role) -> Session {
        Session {
            token: token.to_string(),
            usuario_id: Uuid::new_v4(),
            role,
            username: "Usuario Paciente".to_string(),
            email: "usuario@citasalud.com".to_string(),
        }
    }

    #[tokio::test]
    async fn save_then_load_returns_the_session() {
        let store = InMemorySessionStore::new();
        store.save(session("tok-1", Role::User)).await;

        let loaded = store.load("tok-1").await.unwrap();
        assert_eq!(loaded.role, Role::User);
        assert_eq!(loaded.email, "usuario@citasalud.com");
    }

    #[tokio::test]
    async fn clear_invalidates_the_token() {
        let store = InMemorySessionStore::new();
        store.save(session("tok-2", Role::Gestor)).await;

        assert!(store.clear("tok-2").await);
        assert!(store.load("tok-2").await.is_none());
        // Clearing twice is a no-op.
        assert!(!store.clear("tok-2").await);
    }

    #[tokio::test]
    async fn unknown_token_loads_nothing() {
        let store = InMemorySessionStore::new();
        assert!(store.load("never-issued").await.is_none());
    }
}
