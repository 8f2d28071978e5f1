//! Admin identity resolution
//!
//! An admin request is authenticated one of two ways:
//! - `session`: a trusted upstream gateway has already authenticated the
//!   user and forwards `x-admin-user-id`, `x-admin-role` and optionally
//!   `x-admin-actor`. Only honoured when the service is configured to trust
//!   gateway headers.
//! - `admin_key`: the request carries `x-admin-key` matching the static
//!   admin key. The acting name comes from `x-admin-actor` (default
//!   `admin_key`) and the role is always `admin`.
//!
//! # Pure Functions
//!
//! Header extraction happens in the service; this module only decides.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Name recorded as actor when a key-authenticated caller gives none
pub const DEFAULT_KEY_ACTOR: &str = "admin_key";

// ========================================
// Types
// ========================================

/// How the admin was authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    Session,
    AdminKey,
}

/// Admin role. Only `Viewer` is read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    Viewer,
    Moderator,
    Admin,
    Owner,
}

impl AdminRole {
    /// Whether this role may mutate moderation state
    pub fn can_write(self) -> bool {
        !matches!(self, AdminRole::Viewer)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AdminRole::Viewer => "viewer",
            AdminRole::Moderator => "moderator",
            AdminRole::Admin => "admin",
            AdminRole::Owner => "owner",
        }
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminRole {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "viewer" => Ok(AdminRole::Viewer),
            "moderator" | "mod" => Ok(AdminRole::Moderator),
            "admin" => Ok(AdminRole::Admin),
            "owner" | "superadmin" => Ok(AdminRole::Owner),
            other => Err(IdentityError::UnknownRole(other.to_string())),
        }
    }
}

/// Authenticated admin, as passed to moderation operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    pub user_id: Option<String>,
    pub actor: String,
    pub role: AdminRole,
    pub mode: AuthMode,
}

/// Raw identity headers, already trimmed, empty values as `None`
#[derive(Debug, Clone, Default)]
pub struct IdentityHeaders {
    pub admin_key: Option<String>,
    pub actor: Option<String>,
    pub user_id: Option<String>,
    pub role: Option<String>,
}

/// Identity resolution failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// No usable credentials (401)
    Unauthenticated,
    /// Authenticated, but not an admin (403)
    NotAdmin,
    /// Role string not recognised (403)
    UnknownRole(String),
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityError::Unauthenticated => write!(f, "UNAUTHENTICATED"),
            IdentityError::NotAdmin => write!(f, "NOT_ADMIN"),
            IdentityError::UnknownRole(role) => write!(f, "UNKNOWN_ROLE: {}", role),
        }
    }
}

impl std::error::Error for IdentityError {}

// ========================================
// Key digest
// ========================================

/// SHA-256 digest of an admin key.
///
/// Keys are compared by digest so the comparison always runs over 32 bytes
/// regardless of the provided key's length.
pub fn digest_admin_key(key: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.finalize().into()
}

/// Constant-time comparison of a provided key against a stored digest
pub fn admin_key_matches(provided: &str, expected_digest: &[u8; 32]) -> bool {
    let provided_digest = digest_admin_key(provided);
    provided_digest
        .iter()
        .zip(expected_digest.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

// ========================================
// Resolution
// ========================================

/// Resolve the admin identity for a request.
///
/// Gateway session headers take precedence when trusted, mirroring a
/// logged-in admin session winning over a static key.
pub fn resolve_identity(
    headers: &IdentityHeaders,
    key_digest: Option<&[u8; 32]>,
    trust_gateway_headers: bool,
) -> Result<AdminIdentity, IdentityError> {
    if trust_gateway_headers {
        if let Some(user_id) = &headers.user_id {
            let role = match &headers.role {
                Some(role) => role.parse::<AdminRole>()?,
                None => return Err(IdentityError::NotAdmin),
            };
            return Ok(AdminIdentity {
                user_id: Some(user_id.clone()),
                actor: headers.actor.clone().unwrap_or_else(|| user_id.clone()),
                role,
                mode: AuthMode::Session,
            });
        }
    }

    match (&headers.admin_key, key_digest) {
        (Some(provided), Some(expected)) if admin_key_matches(provided, expected) => {
            Ok(AdminIdentity {
                user_id: None,
                actor: headers
                    .actor
                    .clone()
                    .unwrap_or_else(|| DEFAULT_KEY_ACTOR.to_string()),
                role: AdminRole::Admin,
                mode: AuthMode::AdminKey,
            })
        }
        _ => Err(IdentityError::Unauthenticated),
    }
}
