//! Router Module Index
//!
//! Organizes the application's routing logic into security-segregated modules.
//! Access control is applied explicitly at the module level (via the guard
//! middleware installed in `create_router`), preventing accidental exposure of
//! protected endpoints.

/// Routes accessible to anonymous callers: health probe and login.
pub mod public;

/// Routes gated on a valid session (any role). Ownership checks happen in the
/// handlers against the resolved `AuthUser`.
pub mod authenticated;

/// Routes for processing PQRS records (ADMIN/GESTOR), plus the admin-only
/// gestor account subtree gated on the exact ADMIN role.
pub mod management;
