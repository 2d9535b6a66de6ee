use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Routes accessible to any caller with a valid session, regardless of role.
/// This covers the patient-facing core: submitting a PQRS, tracking its
/// progress, and editing it while it remains open.
///
/// Access Control Strategy:
/// The session guard installed on this subtree in `create_router` rejects
/// anonymous callers before a handler runs. Every handler then receives the
/// resolved `AuthUser` and applies its own ownership rules (e.g. a USER can
/// only list or edit their own records).
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /auth/logout
        // Destroys the caller's session; the token is invalid from then on.
        .route("/auth/logout", post(handlers::logout))
        // GET /me
        // The authenticated caller's own profile.
        .route("/me", get(handlers::get_me))
        // GET /usuarios/{nickname}
        // Resolves a usuario by login nickname (the dashboard needs the owner
        // reference for the PQRS queries).
        .route("/usuarios/{nickname}", get(handlers::get_usuario_by_nickname))
        // --- PQRS Submission & Tracking ---
        // POST /pqrs
        // Submits a new record. The server assigns radicado, Pendiente state
        // and generation timestamp; the owner is the authenticated caller.
        .route("/pqrs", post(handlers::create_pqrs))
        // GET /pqrs/usuario/{id}
        // One owner's records. USERs may only pass their own id.
        .route("/pqrs/usuario/{id}", get(handlers::get_pqrs_by_user))
        // GET/PUT /pqrs/{id}
        // Detail view and the owner edit path. Edits touch only tipo,
        // descripcion and adjunto, and only while the record is open.
        .route(
            "/pqrs/{id}",
            get(handlers::get_pqrs_detail).put(handlers::update_pqrs),
        )
}
