use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    models::{Role, Usuario},
    repository::RepositoryState,
    session::{Session, SessionState},
};

/// Claims
///
/// Payload of the session JWT issued at login and validated on every
/// authenticated request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the UUID of the usuario. Primary key into the usuarios table.
    pub sub: Uuid,
    /// Expiration Time (exp): timestamp after which the JWT must not be accepted.
    pub exp: usize,
    /// Issued At (iat): timestamp when the JWT was issued.
    pub iat: usize,
}

/// issue_token
///
/// Signs a session JWT for an authenticated usuario. The lifetime comes from
/// `AppConfig::session_ttl_secs`.
pub fn issue_token(usuario: &Usuario, config: &AppConfig) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: usuario.id,
        iat: now.timestamp() as usize,
        exp: (now + Duration::seconds(config.session_ttl_secs)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
}

/// bearer_token
///
/// Pulls the raw token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Handlers use it for
/// ownership checks (`id`) and role checks (`role`); `token` is carried so
/// logout can tear down the exact session that authenticated the call.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub username: String,
    pub email: String,
    /// Absent when the identity came through the Env::Local dev bypass.
    pub token: Option<String>,
}

impl AuthUser {
    fn from_session(session: Session) -> Self {
        AuthUser {
            id: session.usuario_id,
            role: session.role,
            username: session.username,
            email: session.email,
            token: Some(session.token),
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making AuthUser usable as a function
/// argument in any authenticated handler, and keeping authentication separate
/// from the handler's business logic.
///
/// The resolution order:
/// 1. Local Bypass: in `Env::Local` only, a valid `x-user-id` header naming an
///    existing usuario authenticates the request. This is the explicit,
///    config-gated test mode; it never activates in Production and it never
///    fabricates identities that do not exist in the repository.
/// 2. Bearer token extraction.
/// 3. Session lookup: the token must still be present in the SessionStore
///    (logout removes it, invalidating the token before its JWT expiry).
/// 4. JWT validation: signature and expiry checked against the configured secret.
///
/// Rejection: `ApiError::Authentication` (401) on any failure. There is no
/// fallback identity: an unreachable or inconsistent backing store fails closed.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionState: FromRef<S>,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionState::from_ref(state);
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // 1. Local Development Bypass Check
        if config.env == Env::Local {
            if let Some(user_id_header) = parts.headers.get("x-user-id") {
                if let Ok(id_str) = user_id_header.to_str() {
                    if let Ok(user_id) = Uuid::parse_str(id_str) {
                        // The UUID must map to a real usuario so the role is
                        // loaded from the repository, not trusted from input.
                        if let Some(usuario) = repo.get_usuario(user_id).await {
                            return Ok(AuthUser {
                                id: usuario.id,
                                role: usuario.rol,
                                username: usuario.nombre,
                                email: usuario.email,
                                token: None,
                            });
                        }
                    }
                }
            }
        }
        // In Production, or when the bypass did not match, fall through to the
        // standard token validation flow.

        // 2. Token Extraction
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            ApiError::Authentication("Token no disponible.".to_string())
        })?;

        // 3. Session Lookup (logout invalidation)
        let session = sessions.load(token).await.ok_or_else(|| {
            ApiError::Authentication("Sesión no encontrada o cerrada.".to_string())
        })?;

        // 4. JWT Decoding and Validation
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|_| {
            ApiError::Authentication("Token inválido o expirado.".to_string())
        })?;

        // The session blob and the signed claims must agree on the identity.
        if token_data.claims.sub != session.usuario_id {
            return Err(ApiError::Authentication(
                "La sesión no corresponde al token presentado.".to_string(),
            ));
        }

        Ok(AuthUser::from_session(session))
    }
}
