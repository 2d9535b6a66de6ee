use crate::models::{
    Estado, PqrsRecord, PqrsStats, Role, Tipo, UpdatePqrsRequest, Usuario,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, letting the
/// handlers interact with the data layer without knowing the concrete backend
/// (Postgres in production, the in-memory double in tests).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's async task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Usuarios / Auth ---
    /// Credential check for login. Returns the usuario only on an exact match;
    /// there is no fallback identity of any kind.
    async fn verify_credentials(&self, nickname: &str, password: &str) -> Option<Usuario>;
    async fn get_usuario(&self, id: Uuid) -> Option<Usuario>;
    async fn get_usuario_by_nickname(&self, nickname: &str) -> Option<Usuario>;
    /// Admin action: provisions an account (used for gestor management).
    /// Returns None when the nickname is already taken.
    async fn create_usuario(&self, usuario: Usuario, password: String) -> Option<Usuario>;
    /// Admin listing of gestor accounts.
    async fn list_gestores(&self) -> Vec<Usuario>;

    // --- PQRS Retrieval ---
    async fn get_pqrs(&self, id: Uuid) -> Option<PqrsRecord>;
    /// The owner's records, newest first.
    async fn get_pqrs_by_user(&self, usuario_id: Uuid) -> Vec<PqrsRecord>;
    /// Management access: every record regardless of owner or state.
    async fn get_all_pqrs(&self) -> Vec<PqrsRecord>;

    // --- PQRS Mutations ---
    /// Inserts a fully built record (radicado and initial state assigned by the caller).
    async fn create_pqrs(&self, record: PqrsRecord) -> Option<PqrsRecord>;
    /// Owner-only partial update of `tipo`/`descripcion`/`adjunto`. The WHERE
    /// clause re-checks ownership and the open-state requirement so a stale
    /// in-process check can never write through.
    async fn update_pqrs(
        &self,
        id: Uuid,
        usuario_id: Uuid,
        req: UpdatePqrsRequest,
    ) -> Option<PqrsRecord>;
    /// Persists the result of a lifecycle transition. The WHERE clause refuses
    /// to overwrite a record that has already reached a terminal state.
    async fn save_transition(&self, record: &PqrsRecord) -> Option<PqrsRecord>;

    // --- Dashboard ---
    async fn get_stats(&self) -> PqrsStats;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Row Mapping ---

/// Raw usuarios row. The role marker is stored as text and parsed into the
/// closed `Role` enum at this boundary; rows with an unrecognized marker are
/// dropped (and logged) rather than coerced.
#[derive(FromRow)]
struct UsuarioRow {
    id: Uuid,
    nickname: String,
    nombre: String,
    email: String,
    rol: String,
}

impl UsuarioRow {
    fn into_domain(self) -> Option<Usuario> {
        let Some(rol) = Role::parse(&self.rol) else {
            tracing::error!("usuario {} carries unknown role {:?}", self.id, self.rol);
            return None;
        };
        Some(Usuario {
            id: self.id,
            nickname: self.nickname,
            nombre: self.nombre,
            email: self.email,
            rol,
        })
    }
}

/// Raw pqrs row; `tipo`/`estado` live as catalog ids.
#[derive(FromRow)]
struct PqrsRow {
    id: Uuid,
    usuario_id: Uuid,
    radicado: String,
    tipo_id: i32,
    estado_id: i32,
    descripcion: String,
    adjunto: Option<String>,
    fecha_de_generacion: DateTime<Utc>,
    fecha_de_respuesta: Option<DateTime<Utc>>,
    respuesta: Option<String>,
}

impl PqrsRow {
    fn into_domain(self) -> Option<PqrsRecord> {
        let (Some(tipo), Some(estado)) = (Tipo::from_id(self.tipo_id), Estado::from_id(self.estado_id))
        else {
            tracing::error!(
                "pqrs {} carries unknown catalog ids tipo={} estado={}",
                self.id,
                self.tipo_id,
                self.estado_id
            );
            return None;
        };
        Some(PqrsRecord {
            id: self.id,
            usuario_id: self.usuario_id,
            radicado: self.radicado,
            tipo,
            estado,
            descripcion: self.descripcion,
            adjunto: self.adjunto,
            fecha_de_generacion: self.fecha_de_generacion,
            fecha_de_respuesta: self.fecha_de_respuesta,
            respuesta: self.respuesta,
        })
    }
}

const PQRS_COLUMNS: &str = "id, usuario_id, radicado, tipo_id, estado_id, descripcion, adjunto, \
                            fecha_de_generacion, fecha_de_respuesta, respuesta";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// verify_credentials
    ///
    /// Exact-match credential lookup. A failed match and a missing usuario are
    /// indistinguishable to the caller.
    async fn verify_credentials(&self, nickname: &str, password: &str) -> Option<Usuario> {
        sqlx::query_as::<_, UsuarioRow>(
            "SELECT id, nickname, nombre, email, rol FROM usuarios \
             WHERE nickname = $1 AND password = $2",
        )
        .bind(nickname)
        .bind(password)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("verify_credentials error: {:?}", e);
            None
        })
        .and_then(UsuarioRow::into_domain)
    }

    async fn get_usuario(&self, id: Uuid) -> Option<Usuario> {
        sqlx::query_as::<_, UsuarioRow>(
            "SELECT id, nickname, nombre, email, rol FROM usuarios WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_usuario error: {:?}", e);
            None
        })
        .and_then(UsuarioRow::into_domain)
    }

    async fn get_usuario_by_nickname(&self, nickname: &str) -> Option<Usuario> {
        sqlx::query_as::<_, UsuarioRow>(
            "SELECT id, nickname, nombre, email, rol FROM usuarios WHERE nickname = $1",
        )
        .bind(nickname)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_usuario_by_nickname error: {:?}", e);
            None
        })
        .and_then(UsuarioRow::into_domain)
    }

    /// create_usuario
    ///
    /// `ON CONFLICT DO NOTHING` on the nickname makes a duplicate insert report
    /// as `None` instead of erroring.
    async fn create_usuario(&self, usuario: Usuario, password: String) -> Option<Usuario> {
        sqlx::query_as::<_, UsuarioRow>(
            "INSERT INTO usuarios (id, nickname, nombre, email, rol, password) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (nickname) DO NOTHING \
             RETURNING id, nickname, nombre, email, rol",
        )
        .bind(usuario.id)
        .bind(&usuario.nickname)
        .bind(&usuario.nombre)
        .bind(&usuario.email)
        .bind(usuario.rol.as_str())
        .bind(&password)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_usuario error: {:?}", e);
            None
        })
        .and_then(UsuarioRow::into_domain)
    }

    async fn list_gestores(&self) -> Vec<Usuario> {
        match sqlx::query_as::<_, UsuarioRow>(
            "SELECT id, nickname, nombre, email, rol FROM usuarios \
             WHERE rol = 'GESTOR' ORDER BY nombre ASC",
        )
        .fetch_all(&self.pool)
        .await
        {
            Ok(rows) => rows.into_iter().filter_map(UsuarioRow::into_domain).collect(),
            Err(e) => {
                tracing::error!("list_gestores error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_pqrs(&self, id: Uuid) -> Option<PqrsRecord> {
        sqlx::query_as::<_, PqrsRow>(&format!(
            "SELECT {PQRS_COLUMNS} FROM pqrs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_pqrs error: {:?}", e);
            None
        })
        .and_then(PqrsRow::into_domain)
    }

    async fn get_pqrs_by_user(&self, usuario_id: Uuid) -> Vec<PqrsRecord> {
        match sqlx::query_as::<_, PqrsRow>(&format!(
            "SELECT {PQRS_COLUMNS} FROM pqrs WHERE usuario_id = $1 \
             ORDER BY fecha_de_generacion DESC"
        ))
        .bind(usuario_id)
        .fetch_all(&self.pool)
        .await
        {
            Ok(rows) => rows.into_iter().filter_map(PqrsRow::into_domain).collect(),
            Err(e) => {
                tracing::error!("get_pqrs_by_user error: {:?}", e);
                vec![]
            }
        }
    }

    async fn get_all_pqrs(&self) -> Vec<PqrsRecord> {
        match sqlx::query_as::<_, PqrsRow>(&format!(
            "SELECT {PQRS_COLUMNS} FROM pqrs ORDER BY fecha_de_generacion DESC"
        ))
        .fetch_all(&self.pool)
        .await
        {
            Ok(rows) => rows.into_iter().filter_map(PqrsRow::into_domain).collect(),
            Err(e) => {
                tracing::error!("get_all_pqrs error: {:?}", e);
                vec![]
            }
        }
    }

    async fn create_pqrs(&self, record: PqrsRecord) -> Option<PqrsRecord> {
        sqlx::query_as::<_, PqrsRow>(&format!(
            "INSERT INTO pqrs (id, usuario_id, radicado, tipo_id, estado_id, descripcion, \
                               adjunto, fecha_de_generacion, fecha_de_respuesta, respuesta) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NULL, NULL) \
             RETURNING {PQRS_COLUMNS}"
        ))
        .bind(record.id)
        .bind(record.usuario_id)
        .bind(&record.radicado)
        .bind(record.tipo.id())
        .bind(record.estado.id())
        .bind(&record.descripcion)
        .bind(&record.adjunto)
        .bind(record.fecha_de_generacion)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_pqrs error: {:?}", e);
            None
        })
        .and_then(PqrsRow::into_domain)
    }

    /// update_pqrs
    ///
    /// COALESCE keeps columns whose request field is None. The WHERE clause
    /// enforces ownership and the open-state requirement at the database, so
    /// the patient edit path cannot touch a resolved or foreign record.
    async fn update_pqrs(
        &self,
        id: Uuid,
        usuario_id: Uuid,
        req: UpdatePqrsRequest,
    ) -> Option<PqrsRecord> {
        sqlx::query_as::<_, PqrsRow>(&format!(
            "UPDATE pqrs \
             SET tipo_id = COALESCE($3, tipo_id), \
                 descripcion = COALESCE($4, descripcion), \
                 adjunto = COALESCE($5, adjunto) \
             WHERE id = $1 AND usuario_id = $2 AND estado_id IN (1, 2) \
             RETURNING {PQRS_COLUMNS}"
        ))
        .bind(id)
        .bind(usuario_id)
        .bind(req.tipo.map(|t| t.id()))
        .bind(req.descripcion)
        .bind(req.adjunto)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_pqrs error: {:?}", e);
            None
        })
        .and_then(PqrsRow::into_domain)
    }

    /// save_transition
    ///
    /// Persists estado/respuesta/fecha from an already validated transition.
    /// `estado_id NOT IN (3, 4, 5)` repeats the terminal guard so concurrent
    /// managers cannot both win.
    async fn save_transition(&self, record: &PqrsRecord) -> Option<PqrsRecord> {
        sqlx::query_as::<_, PqrsRow>(&format!(
            "UPDATE pqrs \
             SET estado_id = $2, respuesta = $3, fecha_de_respuesta = $4 \
             WHERE id = $1 AND estado_id NOT IN (3, 4, 5) \
             RETURNING {PQRS_COLUMNS}"
        ))
        .bind(record.id)
        .bind(record.estado.id())
        .bind(&record.respuesta)
        .bind(record.fecha_de_respuesta)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("save_transition error: {:?}", e);
            None
        })
        .and_then(PqrsRow::into_domain)
    }

    /// get_stats
    ///
    /// Compiles the per-estado counters for the management dashboard. A single
    /// GROUP BY query keeps the counters mutually consistent: total always
    /// equals the sum of the per-estado counts, even under concurrent writes.
    async fn get_stats(&self) -> PqrsStats {
        let rows = sqlx::query_as::<_, (i32, i64)>(
            "SELECT estado_id, COUNT(*) FROM pqrs GROUP BY estado_id",
        )
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_stats error: {:?}", e);
            vec![]
        });

        let mut stats = PqrsStats::default();
        for (estado_id, count) in rows {
            let Some(estado) = Estado::from_id(estado_id) else {
                tracing::error!("stats row carries unknown estado_id {estado_id}");
                continue;
            };
            stats.total += count;
            match estado {
                Estado::Pendiente => stats.pendientes = count,
                Estado::EnProceso => stats.en_proceso = count,
                Estado::Resuelta => stats.resueltas = count,
                Estado::Cerrada => stats.cerradas = count,
                Estado::Anulada => stats.anuladas = count,
            }
        }
        stats
    }
}

// --- The In-Memory Implementation (Test Double) ---

/// MemoryRepository
///
/// A HashMap-backed implementation used by the test suite and local demos.
/// It is constructed explicitly (`new` / `seeded`) and wired in by whoever
/// builds the AppState. It is **never** selected at runtime as a fallback for
/// an unreachable database; authentication fails closed instead.
#[derive(Default)]
pub struct MemoryRepository {
    usuarios: RwLock<HashMap<Uuid, (Usuario, String)>>,
    pqrs: RwLock<HashMap<Uuid, PqrsRecord>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// seeded
    ///
    /// Pre-populates the well-known development identities (one per role).
    /// This is the explicit test identity source that replaces the original
    /// frontend's silent mock-login fallback.
    pub fn seeded() -> Self {
        let repo = Self::new();
        let seeds = [
            (
                "admin",
                "admin123",
                "Administrador CITASalud",
                "admin@citasalud.com",
                Role::Admin,
            ),
            (
                "gestor",
                "gestor123",
                "Gestor PQRS",
                "gestor@citasalud.com",
                Role::Gestor,
            ),
            (
                "usuario",
                "123456",
                "Usuario Paciente",
                "usuario@citasalud.com",
                Role::User,
            ),
        ];
        {
            let mut usuarios = repo.usuarios.try_write().expect("fresh lock");
            for (nickname, password, nombre, email, rol) in seeds {
                let usuario = Usuario {
                    id: Uuid::new_v4(),
                    nickname: nickname.to_string(),
                    nombre: nombre.to_string(),
                    email: email.to_string(),
                    rol,
                };
                usuarios.insert(usuario.id, (usuario, password.to_string()));
            }
        }
        repo
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn verify_credentials(&self, nickname: &str, password: &str) -> Option<Usuario> {
        self.usuarios
            .read()
            .await
            .values()
            .find(|(u, p)| u.nickname == nickname && p == password)
            .map(|(u, _)| u.clone())
    }

    async fn get_usuario(&self, id: Uuid) -> Option<Usuario> {
        self.usuarios.read().await.get(&id).map(|(u, _)| u.clone())
    }

    async fn get_usuario_by_nickname(&self, nickname: &str) -> Option<Usuario> {
        self.usuarios
            .read()
            .await
            .values()
            .find(|(u, _)| u.nickname == nickname)
            .map(|(u, _)| u.clone())
    }

    async fn create_usuario(&self, usuario: Usuario, password: String) -> Option<Usuario> {
        let mut usuarios = self.usuarios.write().await;
        if usuarios.values().any(|(u, _)| u.nickname == usuario.nickname) {
            return None;
        }
        usuarios.insert(usuario.id, (usuario.clone(), password));
        Some(usuario)
    }

    async fn list_gestores(&self) -> Vec<Usuario> {
        let mut gestores: Vec<Usuario> = self
            .usuarios
            .read()
            .await
            .values()
            .filter(|(u, _)| u.rol == Role::Gestor)
            .map(|(u, _)| u.clone())
            .collect();
        gestores.sort_by(|a, b| a.nombre.cmp(&b.nombre));
        gestores
    }

    async fn get_pqrs(&self, id: Uuid) -> Option<PqrsRecord> {
        self.pqrs.read().await.get(&id).cloned()
    }

    async fn get_pqrs_by_user(&self, usuario_id: Uuid) -> Vec<PqrsRecord> {
        let mut records: Vec<PqrsRecord> = self
            .pqrs
            .read()
            .await
            .values()
            .filter(|r| r.usuario_id == usuario_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.fecha_de_generacion.cmp(&a.fecha_de_generacion));
        records
    }

    async fn get_all_pqrs(&self) -> Vec<PqrsRecord> {
        let mut records: Vec<PqrsRecord> = self.pqrs.read().await.values().cloned().collect();
        records.sort_by(|a, b| b.fecha_de_generacion.cmp(&a.fecha_de_generacion));
        records
    }

    async fn create_pqrs(&self, record: PqrsRecord) -> Option<PqrsRecord> {
        self.pqrs.write().await.insert(record.id, record.clone());
        Some(record)
    }

    async fn update_pqrs(
        &self,
        id: Uuid,
        usuario_id: Uuid,
        req: UpdatePqrsRequest,
    ) -> Option<PqrsRecord> {
        let mut pqrs = self.pqrs.write().await;
        let record = pqrs.get_mut(&id)?;
        // Same ownership + open-state guard the SQL WHERE clause applies.
        if record.usuario_id != usuario_id
            || !matches!(record.estado, Estado::Pendiente | Estado::EnProceso)
        {
            return None;
        }
        if let Some(tipo) = req.tipo {
            record.tipo = tipo;
        }
        if let Some(descripcion) = req.descripcion {
            record.descripcion = descripcion;
        }
        if let Some(adjunto) = req.adjunto {
            record.adjunto = Some(adjunto);
        }
        Some(record.clone())
    }

    async fn save_transition(&self, record: &PqrsRecord) -> Option<PqrsRecord> {
        let mut pqrs = self.pqrs.write().await;
        let stored = pqrs.get_mut(&record.id)?;
        if stored.estado.is_terminal() {
            return None;
        }
        stored.estado = record.estado;
        stored.respuesta = record.respuesta.clone();
        stored.fecha_de_respuesta = record.fecha_de_respuesta;
        Some(stored.clone())
    }

    async fn get_stats(&self) -> PqrsStats {
        let pqrs = self.pqrs.read().await;
        let count = |estado: Estado| pqrs.values().filter(|r| r.estado == estado).count() as i64;
        PqrsStats {
            total: pqrs.len() as i64,
            pendientes: count(Estado::Pendiente),
            en_proceso: count(Estado::EnProceso),
            resueltas: count(Estado::Resuelta),
            cerradas: count(Estado::Cerrada),
            anuladas: count(Estado::Anulada),
        }
    }
}
