use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Domain Enums (Closed Sets) ---

/// Role
///
/// The closed set of actor roles recognized by the portal. Authorization is an
/// **exact match** on this enum: there is no privilege hierarchy, so ADMIN does
/// not implicitly satisfy a USER-gated view and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Role {
    /// Patient: submits and tracks their own PQRS records.
    User,
    /// Administrator: full management surface, including gestor accounts.
    Admin,
    /// Gestor: processes and responds to PQRS records.
    Gestor,
}

impl Role {
    /// Canonical wire representation, matching the serde rename.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
            Role::Gestor => "GESTOR",
        }
    }

    /// Parses the role marker stored in the database / session storage.
    /// Unrecognized strings are rejected, never coerced to a default role.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "USER" => Some(Role::User),
            "ADMIN" => Some(Role::Admin),
            "GESTOR" => Some(Role::Gestor),
            _ => None,
        }
    }

    /// True for the roles allowed to drive PQRS state transitions.
    pub fn is_manager(&self) -> bool {
        matches!(self, Role::Admin | Role::Gestor)
    }
}

/// Tipo
///
/// PQRS category. The numeric ids and descriptions mirror the upstream catalog
/// table, which the frontend consumes as a nested `{ idTipo, descripcion }` object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(into = "TipoWire", try_from = "TipoWire")]
#[ts(export)]
pub enum Tipo {
    Peticion,
    Queja,
    Reclamo,
    Sugerencia,
    Felicitacion,
}

impl Tipo {
    pub fn id(&self) -> i32 {
        match self {
            Tipo::Peticion => 1,
            Tipo::Queja => 2,
            Tipo::Reclamo => 3,
            Tipo::Sugerencia => 4,
            Tipo::Felicitacion => 5,
        }
    }

    pub fn descripcion(&self) -> &'static str {
        match self {
            Tipo::Peticion => "Petición",
            Tipo::Queja => "Queja",
            Tipo::Reclamo => "Reclamo",
            Tipo::Sugerencia => "Sugerencia",
            Tipo::Felicitacion => "Felicitación",
        }
    }

    pub fn from_id(id: i32) -> Option<Tipo> {
        match id {
            1 => Some(Tipo::Peticion),
            2 => Some(Tipo::Queja),
            3 => Some(Tipo::Reclamo),
            4 => Some(Tipo::Sugerencia),
            5 => Some(Tipo::Felicitacion),
            _ => None,
        }
    }
}

/// TipoWire
///
/// JSON shape of a `Tipo` on the wire: `{ "idTipo": 1, "descripcion": "Petición" }`.
/// Deserialization keys off the numeric id; the description is advisory.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TipoWire {
    pub id_tipo: i32,
    pub descripcion: String,
}

impl From<Tipo> for TipoWire {
    fn from(t: Tipo) -> Self {
        TipoWire {
            id_tipo: t.id(),
            descripcion: t.descripcion().to_string(),
        }
    }
}

impl TryFrom<TipoWire> for Tipo {
    type Error = String;

    fn try_from(w: TipoWire) -> Result<Self, Self::Error> {
        Tipo::from_id(w.id_tipo).ok_or_else(|| format!("tipo desconocido: {}", w.id_tipo))
    }
}

/// Estado
///
/// Lifecycle state of a PQRS record. `Pendiente` is the initial state assigned
/// at creation; `Resuelta`, `Cerrada` and `Anulada` are terminal (absorbing).
/// Transition rules live in the `lifecycle` module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(into = "EstadoWire", try_from = "EstadoWire")]
#[ts(export)]
pub enum Estado {
    Pendiente,
    EnProceso,
    Resuelta,
    Cerrada,
    Anulada,
}

impl Estado {
    pub fn id(&self) -> i32 {
        match self {
            Estado::Pendiente => 1,
            Estado::EnProceso => 2,
            Estado::Resuelta => 3,
            Estado::Cerrada => 4,
            Estado::Anulada => 5,
        }
    }

    pub fn descripcion(&self) -> &'static str {
        match self {
            Estado::Pendiente => "Pendiente",
            Estado::EnProceso => "En proceso",
            Estado::Resuelta => "Resuelta",
            Estado::Cerrada => "Cerrada",
            Estado::Anulada => "Anulada",
        }
    }

    pub fn from_id(id: i32) -> Option<Estado> {
        match id {
            1 => Some(Estado::Pendiente),
            2 => Some(Estado::EnProceso),
            3 => Some(Estado::Resuelta),
            4 => Some(Estado::Cerrada),
            5 => Some(Estado::Anulada),
            _ => None,
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Estado::Resuelta | Estado::Cerrada | Estado::Anulada)
    }
}

/// EstadoWire
///
/// JSON shape of an `Estado`: `{ "idEstado": 1, "descripcion": "Pendiente" }`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EstadoWire {
    pub id_estado: i32,
    pub descripcion: String,
}

impl From<Estado> for EstadoWire {
    fn from(e: Estado) -> Self {
        EstadoWire {
            id_estado: e.id(),
            descripcion: e.descripcion().to_string(),
        }
    }
}

impl TryFrom<EstadoWire> for Estado {
    type Error = String;

    fn try_from(w: EstadoWire) -> Result<Self, Self::Error> {
        Estado::from_id(w.id_estado).ok_or_else(|| format!("estado desconocido: {}", w.id_estado))
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// Usuario
///
/// The user's canonical identity record. `nickname` is the login identifier,
/// `nombre` the display name shown in the portal header.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Usuario {
    pub id: Uuid,
    pub nickname: String,
    pub nombre: String,
    pub email: String,
    // The RBAC field: exact-match only, no hierarchy.
    pub rol: Role,
}

/// PqrsRecord
///
/// A PQRS ticket. The JSON field names (`idPqrs`, `fechaDeGeneracion`, nested
/// `tipo`/`estado` objects) are the contract the SPA consumes.
///
/// Invariants enforced across the lifecycle module and the repository:
/// - `radicado` is generated once at creation and never rewritten.
/// - `respuesta` / `fecha_de_respuesta` stay empty until a manager transition
///   supplies a response text.
/// - owner-side edits touch only `tipo`, `descripcion`, `adjunto`, and only
///   while the record is in `Pendiente` or `EnProceso`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PqrsRecord {
    #[serde(rename = "idPqrs")]
    pub id: Uuid,
    #[serde(rename = "idUsuario")]
    pub usuario_id: Uuid,
    pub radicado: String,
    pub tipo: Tipo,
    pub estado: Estado,
    pub descripcion: String,
    // Object key of an optional attached file; blob storage is out of scope.
    pub adjunto: Option<String>,
    #[ts(type = "string")]
    pub fecha_de_generacion: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub fecha_de_respuesta: Option<DateTime<Utc>>,
    pub respuesta: Option<String>,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Credentials exchanged for a session (POST /auth/login). Both fields must be
/// non-empty after trimming; validation happens before any repository access.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub nickname: String,
    pub password: String,
}

/// CreatePqrsRequest
///
/// Input payload for submitting a new PQRS (POST /pqrs). The server assigns
/// the radicado, the initial `Pendiente` state and the generation timestamp;
/// clients cannot supply them.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreatePqrsRequest {
    pub tipo: Tipo,
    pub descripcion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjunto: Option<String>,
}

/// UpdatePqrsRequest
///
/// Partial update payload for the owner edit path (PUT /pqrs/{id}). Only the
/// fields a patient may touch are present; `estado`, `respuesta` and
/// `radicado` are immutable from this path.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdatePqrsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo: Option<Tipo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjunto: Option<String>,
}

/// TransitionRequest
///
/// Manager-side state change payload (PUT /pqrs/{id}/estado). `respuesta`, when
/// non-empty, is recorded on the ticket together with the response timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TransitionRequest {
    pub estado_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respuesta: Option<String>,
}

/// CreateGestorRequest
///
/// Admin payload for provisioning a new gestor account (POST /gestion/usuarios).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateGestorRequest {
    pub nickname: String,
    pub password: String,
    pub nombre: String,
    pub email: String,
}

// --- Response Schemas (Output) ---

/// LoginResponse
///
/// Successful authentication result. `redirect_to` is the role-based landing
/// page: USER → patient dashboard, ADMIN → admin dashboard, GESTOR → gestor
/// dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginResponse {
    pub rol: Role,
    pub email: String,
    pub token: String,
    pub username: String,
    pub redirect_to: String,
}

/// PqrsCreatedResponse
///
/// Confirmation payload returned after a successful submission, echoing the
/// assigned radicado and the textual initial state for the confirmation page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PqrsCreatedResponse {
    #[serde(rename = "idPqrs")]
    pub id: Uuid,
    pub radicado: String,
    pub estado_texto: String,
}

/// UsuarioResponse
///
/// Output schema for the user lookup endpoint (GET /usuarios/{nickname}).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UsuarioResponse {
    #[serde(rename = "idUsuario")]
    pub id_usuario: Uuid,
    pub nombre: String,
    pub email: String,
    pub username: String,
    pub rol: Role,
}

impl From<Usuario> for UsuarioResponse {
    fn from(u: Usuario) -> Self {
        UsuarioResponse {
            id_usuario: u.id,
            nombre: u.nombre,
            username: u.nickname,
            email: u.email,
            rol: u.rol,
        }
    }
}

/// PqrsStats
///
/// Output schema for the management statistics dashboard (GET /gestion/stats).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PqrsStats {
    pub total: i64,
    pub pendientes: i64,
    pub en_proceso: i64,
    pub resueltas: i64,
    pub cerradas: i64,
    pub anuladas: i64,
}
