use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// ApiError
///
/// The error taxonomy surfaced by every handler. Each variant carries the
/// user-visible message for the originating view; nothing is silently
/// swallowed and no automatic retry is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// A required field was empty or a payload value was out of range.
    Validation(String),
    /// Bad credentials, or the authentication backend rejected the exchange.
    Authentication(String),
    /// The caller's role does not permit the requested view or transition.
    Authorization(String),
    /// Mutation of a terminal record, or an edit by a non-owner.
    InvalidTransition(String),
    /// The referenced record does not exist (or is not visible to the caller).
    NotFound,
    /// Unexpected repository or infrastructure failure.
    Internal(String),
}

/// ErrorBody
///
/// JSON envelope for error responses: `{ "error": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Authorization(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidTransition(_) => StatusCode::CONFLICT,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Validation(m)
            | ApiError::Authentication(m)
            | ApiError::Authorization(m)
            | ApiError::InvalidTransition(m) => m.clone(),
            ApiError::NotFound => "Recurso no encontrado.".to_string(),
            // Internal details are logged, not leaked to the client.
            ApiError::Internal(_) => "Error interno del servidor.".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!("internal error: {detail}");
        }
        let body = ErrorBody {
            error: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}
