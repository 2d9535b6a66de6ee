use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{Estado, PqrsRecord, Role},
};

// PQRS lifecycle rules. Everything in this module is a pure function over an
// in-memory record; the repository persists the result afterwards. Two guards
// apply to every state change: only ADMIN or GESTOR may transition a record,
// and terminal records (Resuelta, Cerrada, Anulada) accept no further
// transitions. Between non-terminal states no ordering is imposed: Pendiente
// may jump straight to Resuelta without passing through EnProceso.

/// transition
///
/// Applies a manager-driven state change to `record`.
///
/// On success `estado` becomes `new_state`; if `response_text` is non-empty
/// after trimming, `respuesta` and `fecha_de_respuesta` are set as well.
/// On failure the record is left untouched.
pub fn transition(
    record: &mut PqrsRecord,
    new_state: Estado,
    response_text: Option<&str>,
    acting_role: Role,
    now: DateTime<Utc>,
) -> Result<(), ApiError> {
    if !acting_role.is_manager() {
        return Err(ApiError::Authorization(
            "Solo un gestor o administrador puede cambiar el estado de una PQRS.".to_string(),
        ));
    }

    if record.estado.is_terminal() {
        return Err(ApiError::InvalidTransition(format!(
            "La PQRS {} ya está en estado terminal ({}).",
            record.radicado,
            record.estado.descripcion()
        )));
    }

    record.estado = new_state;

    if let Some(text) = response_text {
        let text = text.trim();
        if !text.is_empty() {
            record.respuesta = Some(text.to_string());
            record.fecha_de_respuesta = Some(now);
        }
    }

    Ok(())
}

/// can_edit
///
/// Patient-side edit eligibility: the requester must own the record and the
/// record must still be in `Pendiente` or `EnProceso`. Only `tipo`,
/// `descripcion` and `adjunto` may be changed through that path; everything
/// else is immutable for the owner.
pub fn can_edit(record: &PqrsRecord, requester_id: Uuid) -> bool {
    record.usuario_id == requester_id
        && matches!(record.estado, Estado::Pendiente | Estado::EnProceso)
}

/// generar_radicado
///
/// Builds the immutable human-readable tracking code assigned at creation:
/// `PQRS-<millis in base36>-<4 hex chars>`, uppercase. The timestamp component
/// keeps codes roughly sortable; the random suffix disambiguates submissions
/// within the same millisecond.
pub fn generar_radicado(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().max(0) as u64;
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(4).collect();
    format!("PQRS-{}-{}", to_base36(millis), suffix).to_uppercase()
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
