use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod repository;
pub mod session;

// Module for routing segregation (Public, Authenticated, Management).
pub mod routes;
use models::Role;
use routes::{authenticated, management, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use config::AppConfig;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use session::{InMemorySessionStore, SessionState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the application,
/// aggregating every path and schema decorated with the `#[utoipa::path]` and
/// `#[derive(utoipa::ToSchema)]` macros. The resulting JSON is served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::logout, handlers::get_me,
        handlers::get_usuario_by_nickname, handlers::create_pqrs,
        handlers::get_pqrs_by_user, handlers::get_pqrs_detail, handlers::update_pqrs,
        handlers::get_all_pqrs, handlers::update_estado, handlers::get_stats,
        handlers::create_gestor, handlers::list_gestores
    ),
    components(
        schemas(
            models::Role, models::Tipo, models::TipoWire, models::Estado, models::EstadoWire,
            models::Usuario, models::PqrsRecord, models::LoginRequest, models::LoginResponse,
            models::CreatePqrsRequest, models::UpdatePqrsRequest, models::TransitionRequest,
            models::CreateGestorRequest, models::PqrsCreatedResponse, models::UsuarioResponse,
            models::PqrsStats, error::ErrorBody,
        )
    ),
    tags(
        (name = "pqrs-portal", description = "CITASalud PQRS tracking API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The **Unified State Pattern**: a single, thread-safe, immutable container
/// holding all essential application services and configuration, shared across
/// all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: abstracts persistence of usuarios and PQRS records.
    pub repo: RepositoryState,
    /// Session Layer: the persisted session blob, read at every guard check.
    pub sessions: SessionState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These implementations allow extractors to selectively pull components from
// the shared AppState, keeping dependency boundaries explicit.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and
/// scoped middleware, and registers the application state.
///
/// Guard placement:
/// - public routes carry no guard;
/// - the authenticated subtree is gated on session presence (`required = None`);
/// - the management subtree (`/gestion`) is likewise session-gated, with the
///   manager-role rule applied per handler because it serves two roles;
/// - the gestor account subtree (`/gestion/usuarios`) carries the exact-ADMIN
///   guard: a GESTOR session lands on `/unauthorized`, no hierarchy applies.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // Guard layers, parameterized by the required role for the subtree.
    let session_guard = middleware::from_fn_with_state(
        (state.clone(), None::<Role>),
        guard::guard_middleware,
    );
    let admin_guard = middleware::from_fn_with_state(
        (state.clone(), Some(Role::Admin)),
        guard::guard_middleware,
    );

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: No middleware applied.
        .merge(public::public_routes())
        // Authenticated Routes: session presence required.
        .merge(authenticated::authenticated_routes().route_layer(session_guard.clone()))
        // Management Routes: nested under '/gestion'. The manager-role check is
        // performed inside the handlers; the admin account subtree additionally
        // carries the exact-ADMIN guard.
        .nest(
            "/gestion",
            management::management_routes()
                .route_layer(session_guard)
                .merge(management::admin_account_routes().route_layer(admin_guard)),
        )
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a unique UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: wraps the request/response lifecycle in a
                // tracing span that carries the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: returns x-request-id to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes the `TraceLayer` span creation: extracts the `x-request-id`
/// header (if present) and includes it in the structured logging metadata
/// alongside the HTTP method and URI, so every log line of one request is
/// correlated by a unique ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
