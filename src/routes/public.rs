use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client.
/// Everything else in the application sits behind the session guard, so this
/// module is deliberately small: the monitoring probe and the credential
/// exchange itself.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/login
        // Exchanges { nickname, password } for a session token. Validation of
        // empty fields happens before any repository access; failures surface
        // a user-visible error and leave no partial session behind.
        .route("/auth/login", post(handlers::login))
}
