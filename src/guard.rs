use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use uuid::Uuid;

use crate::{AppState, auth::bearer_token, config::Env, models::Role, session::Session};

// Route guard for role-gated subtrees. The decision itself is a pure function
// over (session, required role); the axum middleware below only resolves the
// bearer token against the session store and converts the decision into a
// response. The guard never mutates session state.

/// Landing page for unauthorized-but-authenticated callers.
pub const UNAUTHORIZED_TARGET: &str = "/unauthorized";

/// GuardDecision
///
/// Outcome of a guard check for a view declaring an optional required role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session valid and role acceptable (or the view is public).
    Allow,
    /// No session: send the caller to the login entry point of the required role.
    RedirectToLogin(&'static str),
    /// Session present but the role does not match the required one.
    RedirectToUnauthorized,
}

/// login_target
///
/// The login entry point associated with a required role: admins and gestores
/// have dedicated login pages, everything else lands on the patient login.
pub fn login_target(required: Option<Role>) -> &'static str {
    match required {
        Some(Role::Admin) => "/admin-login",
        Some(Role::Gestor) => "/gestor-login",
        _ => "/patient-login",
    }
}

/// dashboard_target
///
/// The role-based landing page used as the post-login redirect.
pub fn dashboard_target(role: Role) -> &'static str {
    match role {
        Role::User => "/dashboard",
        Role::Admin => "/admin/dashboard",
        Role::Gestor => "/gestor/dashboard",
    }
}

/// evaluate
///
/// Decides whether the current caller may proceed into a view declaring
/// `required`. Role comparison is **exact equality**: there is no privilege
/// hierarchy, so an ADMIN session does not satisfy a USER-gated view.
pub fn evaluate(session: Option<&Session>, required: Option<Role>) -> GuardDecision {
    let Some(session) = session else {
        return GuardDecision::RedirectToLogin(login_target(required));
    };

    match required {
        Some(role) if session.role != role => GuardDecision::RedirectToUnauthorized,
        _ => GuardDecision::Allow,
    }
}

/// resolve_session
///
/// Resolves the caller's session the same way the `AuthUser` extractor does:
/// bearer token against the session store first, then the `Env::Local`
/// `x-user-id` dev bypass (which still requires the usuario to exist in the
/// repository). The bypass yields an ephemeral session that is never stored.
async fn resolve_session(state: &AppState, headers: &HeaderMap) -> Option<Session> {
    if let Some(token) = bearer_token(headers) {
        if let Some(session) = state.sessions.load(token).await {
            return Some(session);
        }
    }

    if state.config.env == Env::Local {
        if let Some(header) = headers.get("x-user-id") {
            if let Ok(id) = Uuid::parse_str(header.to_str().ok()?) {
                if let Some(usuario) = state.repo.get_usuario(id).await {
                    return Some(Session {
                        token: String::new(),
                        usuario_id: usuario.id,
                        role: usuario.rol,
                        username: usuario.nombre,
                        email: usuario.email,
                    });
                }
            }
        }
    }

    None
}

/// guard_middleware
///
/// Applies `evaluate` to an incoming request. Installed per subtree with
/// `middleware::from_fn_with_state((state, required_role), guard_middleware)`;
/// `required_role = None` gates on session presence alone.
pub async fn guard_middleware(
    State((state, required)): State<(AppState, Option<Role>)>,
    request: Request,
    next: Next,
) -> Response {
    let session = resolve_session(&state, request.headers()).await;

    match evaluate(session.as_ref(), required) {
        GuardDecision::Allow => next.run(request).await,
        GuardDecision::RedirectToLogin(target) => Redirect::temporary(target).into_response(),
        GuardDecision::RedirectToUnauthorized => {
            Redirect::temporary(UNAUTHORIZED_TARGET).into_response()
        }
    }
}
