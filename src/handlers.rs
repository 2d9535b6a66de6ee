use crate::{
    AppState,
    auth::{AuthUser, issue_token},
    error::ApiError,
    guard::dashboard_target,
    lifecycle,
    models::{
        CreateGestorRequest, CreatePqrsRequest, Estado, LoginRequest, LoginResponse,
        PqrsCreatedResponse, PqrsRecord, PqrsStats, Role, TransitionRequest, UpdatePqrsRequest,
        Usuario, UsuarioResponse,
    },
    session::Session,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

// --- Authentication Flow ---

/// login
///
/// [Public Route] Exchanges credentials for a session.
///
/// Empty input (after trimming) fails fast with a validation error before any
/// repository access. On success the session is persisted in the store and the
/// response carries the role-based redirect target. On any failure no partial
/// session is left behind; there is no mock fallback when the backing store is
/// unreachable, the exchange fails closed.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 422, description = "Missing fields")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let nickname = payload.nickname.trim();
    let password = payload.password.trim();
    if nickname.is_empty() || password.is_empty() {
        return Err(ApiError::Validation(
            "Completa todos los campos requeridos.".to_string(),
        ));
    }

    let usuario = state
        .repo
        .verify_credentials(nickname, password)
        .await
        .ok_or_else(|| ApiError::Authentication("Credenciales inválidas.".to_string()))?;

    let token = issue_token(&usuario, &state.config)?;

    let session = Session {
        token: token.clone(),
        usuario_id: usuario.id,
        role: usuario.rol,
        username: usuario.nombre.clone(),
        email: usuario.email.clone(),
    };
    state.sessions.save(session).await;

    tracing::info!(usuario = %usuario.nickname, rol = usuario.rol.as_str(), "login ok");

    Ok(Json(LoginResponse {
        rol: usuario.rol,
        email: usuario.email,
        token,
        username: usuario.nombre,
        redirect_to: dashboard_target(usuario.rol).to_string(),
    }))
}

/// logout
///
/// [Authenticated Route] Tears down the caller's session. The token becomes
/// invalid immediately, before its JWT expiry.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Session cleared"))
)]
pub async fn logout(auth: AuthUser, State(state): State<AppState>) -> StatusCode {
    if let Some(token) = auth.token {
        state.sessions.clear(&token).await;
    }
    StatusCode::NO_CONTENT
}

/// get_me
///
/// [Authenticated Route] Returns the authenticated caller's own profile.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UsuarioResponse))
)]
pub async fn get_me(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UsuarioResponse>, ApiError> {
    let usuario = state.repo.get_usuario(auth.id).await.ok_or(ApiError::NotFound)?;
    Ok(Json(usuario.into()))
}

/// get_usuario_by_nickname
///
/// [Authenticated Route] Looks up a usuario by login nickname. The dashboard
/// uses this to resolve the numeric owner reference after login.
#[utoipa::path(
    get,
    path = "/usuarios/{nickname}",
    params(("nickname" = String, Path, description = "Login nickname")),
    responses(
        (status = 200, description = "Found", body = UsuarioResponse),
        (status = 404, description = "Unknown usuario")
    )
)]
pub async fn get_usuario_by_nickname(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(nickname): Path<String>,
) -> Result<Json<UsuarioResponse>, ApiError> {
    let usuario = state
        .repo
        .get_usuario_by_nickname(&nickname)
        .await
        .ok_or(ApiError::NotFound)?;
    Ok(Json(usuario.into()))
}

// --- PQRS: Patient Side ---

/// create_pqrs
///
/// [Authenticated Route] Submits a new PQRS. The server assigns the radicado,
/// the `Pendiente` initial state and the generation timestamp; the owner is
/// the authenticated caller, never a field of the payload.
#[utoipa::path(
    post,
    path = "/pqrs",
    request_body = CreatePqrsRequest,
    responses(
        (status = 201, description = "Created", body = PqrsCreatedResponse),
        (status = 422, description = "Empty description")
    )
)]
pub async fn create_pqrs(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePqrsRequest>,
) -> Result<(StatusCode, Json<PqrsCreatedResponse>), ApiError> {
    let descripcion = payload.descripcion.trim();
    if descripcion.is_empty() {
        return Err(ApiError::Validation(
            "La descripción es obligatoria.".to_string(),
        ));
    }

    let now = Utc::now();
    let record = PqrsRecord {
        id: Uuid::new_v4(),
        usuario_id: auth.id,
        radicado: lifecycle::generar_radicado(now),
        tipo: payload.tipo,
        estado: Estado::Pendiente,
        descripcion: descripcion.to_string(),
        adjunto: payload.adjunto,
        fecha_de_generacion: now,
        fecha_de_respuesta: None,
        respuesta: None,
    };

    let created = state
        .repo
        .create_pqrs(record)
        .await
        .ok_or_else(|| ApiError::Internal("create_pqrs insert failed".to_string()))?;

    tracing::info!(radicado = %created.radicado, "pqrs created");

    Ok((
        StatusCode::CREATED,
        Json(PqrsCreatedResponse {
            id: created.id,
            radicado: created.radicado,
            estado_texto: created.estado.descripcion().to_string(),
        }),
    ))
}

/// get_pqrs_by_user
///
/// [Authenticated Route] Lists the records of one owner, newest first.
/// A USER may only fetch their own list; ADMIN/GESTOR may fetch anyone's.
#[utoipa::path(
    get,
    path = "/pqrs/usuario/{id}",
    params(("id" = Uuid, Path, description = "Owner usuario ID")),
    responses(
        (status = 200, description = "Records", body = [PqrsRecord]),
        (status = 403, description = "Not your records")
    )
)]
pub async fn get_pqrs_by_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(usuario_id): Path<Uuid>,
) -> Result<Json<Vec<PqrsRecord>>, ApiError> {
    if !auth.role.is_manager() && auth.id != usuario_id {
        return Err(ApiError::Authorization(
            "No puede consultar las PQRS de otro usuario.".to_string(),
        ));
    }
    Ok(Json(state.repo.get_pqrs_by_user(usuario_id).await))
}

/// get_pqrs_detail
///
/// [Authenticated Route] Single record detail. Non-managers only see their own
/// records; a foreign id answers 404 rather than confirming existence.
#[utoipa::path(
    get,
    path = "/pqrs/{id}",
    params(("id" = Uuid, Path, description = "PQRS ID")),
    responses(
        (status = 200, description = "Found", body = PqrsRecord),
        (status = 404, description = "Not found or not visible")
    )
)]
pub async fn get_pqrs_detail(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PqrsRecord>, ApiError> {
    let record = state.repo.get_pqrs(id).await.ok_or(ApiError::NotFound)?;
    if !auth.role.is_manager() && record.usuario_id != auth.id {
        return Err(ApiError::NotFound);
    }
    Ok(Json(record))
}

/// update_pqrs
///
/// [Authenticated Route] Owner edit path. Eligibility is the lifecycle rule:
/// the caller owns the record and it is still `Pendiente` or `EnProceso`.
/// Only `tipo`, `descripcion` and `adjunto` can change here; the repository
/// re-checks the same condition in its WHERE clause.
#[utoipa::path(
    put,
    path = "/pqrs/{id}",
    params(("id" = Uuid, Path, description = "PQRS ID")),
    request_body = UpdatePqrsRequest,
    responses(
        (status = 200, description = "Updated", body = PqrsRecord),
        (status = 409, description = "Not editable"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_pqrs(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePqrsRequest>,
) -> Result<Json<PqrsRecord>, ApiError> {
    if let Some(descripcion) = &payload.descripcion {
        if descripcion.trim().is_empty() {
            return Err(ApiError::Validation(
                "La descripción no puede quedar vacía.".to_string(),
            ));
        }
    }

    let record = state.repo.get_pqrs(id).await.ok_or(ApiError::NotFound)?;
    if !lifecycle::can_edit(&record, auth.id) {
        return Err(ApiError::InvalidTransition(
            "La PQRS no le pertenece o ya no admite modificaciones.".to_string(),
        ));
    }

    let updated = state
        .repo
        .update_pqrs(id, auth.id, payload)
        .await
        .ok_or_else(|| {
            // Lost the race against a manager transition between check and write.
            ApiError::InvalidTransition(
                "La PQRS ya no admite modificaciones.".to_string(),
            )
        })?;
    Ok(Json(updated))
}

// --- PQRS: Management Side ---

/// get_all_pqrs
///
/// [Management Route] Every record in the system, for the ADMIN and GESTOR
/// processing queues.
#[utoipa::path(
    get,
    path = "/gestion/pqrs",
    responses(
        (status = 200, description = "All records", body = [PqrsRecord]),
        (status = 403, description = "Not a manager")
    )
)]
pub async fn get_all_pqrs(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PqrsRecord>>, ApiError> {
    require_manager(&auth)?;
    Ok(Json(state.repo.get_all_pqrs().await))
}

/// update_estado
///
/// [Management Route] Drives a lifecycle transition. The state machine guards
/// run first (acting role, terminal absorption); the repository repeats the
/// terminal check in its WHERE clause so a concurrent resolution cannot be
/// overwritten.
#[utoipa::path(
    put,
    path = "/gestion/pqrs/{id}/estado",
    params(("id" = Uuid, Path, description = "PQRS ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Transitioned", body = PqrsRecord),
        (status = 403, description = "Not a manager"),
        (status = 409, description = "Terminal record"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_estado(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> Result<Json<PqrsRecord>, ApiError> {
    let new_state = Estado::from_id(payload.estado_id).ok_or_else(|| {
        ApiError::Validation(format!("Estado desconocido: {}.", payload.estado_id))
    })?;

    let mut record = state.repo.get_pqrs(id).await.ok_or(ApiError::NotFound)?;

    lifecycle::transition(
        &mut record,
        new_state,
        payload.respuesta.as_deref(),
        auth.role,
        Utc::now(),
    )?;

    let saved = state
        .repo
        .save_transition(&record)
        .await
        .ok_or_else(|| {
            ApiError::InvalidTransition(
                "La PQRS alcanzó un estado terminal mientras se procesaba el cambio.".to_string(),
            )
        })?;

    tracing::info!(
        radicado = %saved.radicado,
        estado = saved.estado.descripcion(),
        actor = auth.role.as_str(),
        "pqrs transitioned"
    );

    Ok(Json(saved))
}

/// get_stats
///
/// [Management Route] Per-estado counters for the statistics dashboard.
#[utoipa::path(
    get,
    path = "/gestion/stats",
    responses(
        (status = 200, description = "Stats", body = PqrsStats),
        (status = 403, description = "Not a manager")
    )
)]
pub async fn get_stats(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<PqrsStats>, ApiError> {
    require_manager(&auth)?;
    Ok(Json(state.repo.get_stats().await))
}

// --- Gestor Account Management (Admin Only) ---

/// create_gestor
///
/// [Admin Route] Provisions a new GESTOR account. The route subtree is already
/// gated on the exact ADMIN role; the check is repeated here so the handler is
/// safe even if remounted.
#[utoipa::path(
    post,
    path = "/gestion/usuarios",
    request_body = CreateGestorRequest,
    responses(
        (status = 201, description = "Created", body = UsuarioResponse),
        (status = 403, description = "Not an admin"),
        (status = 422, description = "Missing fields or duplicate nickname")
    )
)]
pub async fn create_gestor(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateGestorRequest>,
) -> Result<(StatusCode, Json<UsuarioResponse>), ApiError> {
    require_admin(&auth)?;

    if payload.nickname.trim().is_empty()
        || payload.password.trim().is_empty()
        || payload.nombre.trim().is_empty()
        || payload.email.trim().is_empty()
    {
        return Err(ApiError::Validation(
            "Completa todos los campos requeridos.".to_string(),
        ));
    }

    let usuario = Usuario {
        id: Uuid::new_v4(),
        nickname: payload.nickname.trim().to_string(),
        nombre: payload.nombre.trim().to_string(),
        email: payload.email.trim().to_string(),
        rol: Role::Gestor,
    };

    // Store the trimmed password: login verifies the trimmed form, so the
    // stored value must be the same canonical form or the account is unusable.
    let created = state
        .repo
        .create_usuario(usuario, payload.password.trim().to_string())
        .await
        .ok_or_else(|| {
            ApiError::Validation("El nickname ya está registrado.".to_string())
        })?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// list_gestores
///
/// [Admin Route] Lists the provisioned GESTOR accounts.
#[utoipa::path(
    get,
    path = "/gestion/usuarios",
    responses(
        (status = 200, description = "Gestores", body = [UsuarioResponse]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_gestores(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UsuarioResponse>>, ApiError> {
    require_admin(&auth)?;
    let gestores = state.repo.list_gestores().await;
    Ok(Json(gestores.into_iter().map(Into::into).collect()))
}

// --- Role Checks ---

fn require_manager(auth: &AuthUser) -> Result<(), ApiError> {
    if auth.role.is_manager() {
        Ok(())
    } else {
        Err(ApiError::Authorization(
            "Se requiere rol de gestor o administrador.".to_string(),
        ))
    }
}

fn require_admin(auth: &AuthUser) -> Result<(), ApiError> {
    if auth.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::Authorization(
            "Se requiere rol de administrador.".to_string(),
        ))
    }
}
