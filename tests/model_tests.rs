use chrono::Utc;
use pqrs_portal::models::{
    Estado, LoginResponse, PqrsRecord, Role, Tipo, TransitionRequest, UpdatePqrsRequest,
};
use uuid::Uuid;

#[test]
fn estado_serializes_as_nested_catalog_object() {
    // The SPA consumes estado as { idEstado, descripcion }.
    let json = serde_json::to_value(Estado::Pendiente).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "idEstado": 1, "descripcion": "Pendiente" })
    );

    let json = serde_json::to_value(Estado::EnProceso).unwrap();
    assert_eq!(json["idEstado"], 2);
    assert_eq!(json["descripcion"], "En proceso");
}

#[test]
fn estado_deserializes_from_the_numeric_id() {
    // The description is advisory; the id is authoritative.
    let estado: Estado =
        serde_json::from_value(serde_json::json!({ "idEstado": 3, "descripcion": "whatever" }))
            .unwrap();
    assert_eq!(estado, Estado::Resuelta);
}

#[test]
fn unknown_estado_id_is_rejected() {
    let result: Result<Estado, _> =
        serde_json::from_value(serde_json::json!({ "idEstado": 42, "descripcion": "" }));
    assert!(result.is_err());
}

#[test]
fn tipo_catalog_round_trips_through_ids() {
    for tipo in [
        Tipo::Peticion,
        Tipo::Queja,
        Tipo::Reclamo,
        Tipo::Sugerencia,
        Tipo::Felicitacion,
    ] {
        assert_eq!(Tipo::from_id(tipo.id()), Some(tipo));
    }
    assert_eq!(Tipo::from_id(0), None);
    assert_eq!(serde_json::to_value(Tipo::Peticion).unwrap()["descripcion"], "Petición");
}

#[test]
fn role_uses_screaming_wire_markers_and_rejects_strangers() {
    assert_eq!(serde_json::to_value(Role::Gestor).unwrap(), "GESTOR");
    assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
    assert_eq!(Role::parse("Administrador"), None);
    assert_eq!(Role::parse(""), None);
}

#[test]
fn pqrs_record_uses_the_spa_field_names() {
    let record = PqrsRecord {
        id: Uuid::new_v4(),
        usuario_id: Uuid::new_v4(),
        radicado: "PQRS-ABC-1234".to_string(),
        tipo: Tipo::Queja,
        estado: Estado::Pendiente,
        descripcion: "Demora en la atención.".to_string(),
        adjunto: None,
        fecha_de_generacion: Utc::now(),
        fecha_de_respuesta: None,
        respuesta: None,
    };

    let json = serde_json::to_value(&record).unwrap();
    assert!(json.get("idPqrs").is_some());
    assert!(json.get("idUsuario").is_some());
    assert!(json.get("fechaDeGeneracion").is_some());
    assert!(json["fechaDeRespuesta"].is_null());
    assert_eq!(json["tipo"]["idTipo"], 2);
    // Internal Rust names never leak.
    assert!(json.get("usuario_id").is_none());
    assert!(json.get("fecha_de_generacion").is_none());
}

#[test]
fn update_request_omits_absent_fields() {
    let partial = UpdatePqrsRequest {
        descripcion: Some("Solo la descripción.".to_string()),
        ..Default::default()
    };
    let json = serde_json::to_string(&partial).unwrap();
    assert!(json.contains("Solo la descripción."));
    assert!(!json.contains("tipo"));
    assert!(!json.contains("adjunto"));
}

#[test]
fn transition_request_reads_the_camel_case_estado_id() {
    let req: TransitionRequest =
        serde_json::from_value(serde_json::json!({ "estadoId": 3, "respuesta": "Atendido" }))
            .unwrap();
    assert_eq!(req.estado_id, 3);
    assert_eq!(req.respuesta.as_deref(), Some("Atendido"));
}

#[test]
fn login_response_exposes_the_redirect_target_in_camel_case() {
    let response = LoginResponse {
        rol: Role::User,
        email: "usuario@citasalud.com".to_string(),
        token: "tok".to_string(),
        username: "Usuario Paciente".to_string(),
        redirect_to: "/dashboard".to_string(),
    };
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["redirectTo"], "/dashboard");
    assert_eq!(json["rol"], "USER");
}

#[test]
fn terminal_state_classification_matches_the_lifecycle() {
    assert!(!Estado::Pendiente.is_terminal());
    assert!(!Estado::EnProceso.is_terminal());
    assert!(Estado::Resuelta.is_terminal());
    assert!(Estado::Cerrada.is_terminal());
    assert!(Estado::Anulada.is_terminal());
}
