//! Shared admin-API functionality
//!
//! Provides admin key verification, role parsing and the admin identity type
//! used by every ICC service exposing admin endpoints.
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Shared types
//!
//! Each service wraps these with framework-specific middleware (Axum, etc.).

pub mod auth;

pub use auth::{
    digest_admin_key, resolve_identity, AdminIdentity, AdminRole, AuthMode, IdentityError,
    IdentityHeaders,
};
