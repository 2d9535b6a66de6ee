use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Management Router Module
///
/// The processing surface for PQRS records, mounted under `/gestion`. Both the
/// admin and the gestor dashboards drive these endpoints, so the subtree is
/// gated on session presence and each handler enforces the manager-role check
/// (ADMIN or GESTOR, exact match per role — no hierarchy).
pub fn management_routes() -> Router<AppState> {
    Router::new()
        // GET /gestion/pqrs
        // Every record in the system, for the processing queues.
        .route("/pqrs", get(handlers::get_all_pqrs))
        // PUT /gestion/pqrs/{id}/estado
        // Drives a lifecycle transition and optionally records the response
        // text. Terminal records are absorbing; the state machine rejects any
        // further change.
        .route("/pqrs/{id}/estado", put(handlers::update_estado))
        // GET /gestion/stats
        // Per-estado counters for the statistics dashboard.
        .route("/stats", get(handlers::get_stats))
}

/// Admin Account Router
///
/// Gestor account provisioning, mounted under `/gestion/usuarios`. This
/// subtree is wrapped in the exact-ADMIN guard in `create_router`: a GESTOR
/// session is redirected to `/unauthorized`, it does not inherit access.
pub fn admin_account_routes() -> Router<AppState> {
    Router::new()
        // GET /gestion/usuarios
        // Lists the provisioned GESTOR accounts.
        // POST /gestion/usuarios
        // Creates a new GESTOR account.
        .route(
            "/usuarios",
            get(handlers::list_gestores).post(handlers::create_gestor),
        )
}
