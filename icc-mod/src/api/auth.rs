//! Admin authentication middleware
//!
//! Resolves the caller's [`AdminIdentity`] from request headers and stores
//! it in the request extensions for handlers to extract. Applied to the
//! admin routes only; `/health` and report submission are public.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use icc_common::api::{resolve_identity, AdminIdentity, IdentityHeaders};
use serde::Serialize;
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

pub const HEADER_ADMIN_KEY: &str = "x-admin-key";
pub const HEADER_ADMIN_ACTOR: &str = "x-admin-actor";
pub const HEADER_ADMIN_USER_ID: &str = "x-admin-user-id";
pub const HEADER_ADMIN_ROLE: &str = "x-admin-role";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Collect the identity headers of a request
pub fn identity_headers(headers: &HeaderMap) -> IdentityHeaders {
    IdentityHeaders {
        admin_key: header_value(headers, HEADER_ADMIN_KEY),
        actor: header_value(headers, HEADER_ADMIN_ACTOR),
        user_id: header_value(headers, HEADER_ADMIN_USER_ID),
        role: header_value(headers, HEADER_ADMIN_ROLE),
    }
}

/// Authentication middleware
///
/// Returns 401 without credentials and 403 for a non-admin or unknown role.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let headers = identity_headers(request.headers());
    let identity = resolve_identity(
        &headers,
        state.key_digest.as_ref(),
        state.trust_gateway_headers,
    )
    .map_err(|e| {
        warn!("Rejected admin request to {}: {}", request.uri().path(), e);
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Reject read-only roles on mutating routes
pub fn require_writer(admin: &AdminIdentity) -> Result<(), ApiError> {
    if admin.role.can_write() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("FORBIDDEN".to_string()))
    }
}

/// `auth` block echoed in every admin response
#[derive(Debug, Clone, Serialize)]
pub struct AuthSummary {
    pub mode: icc_common::api::AuthMode,
    pub role: icc_common::api::AdminRole,
}

impl From<&AdminIdentity> for AuthSummary {
    fn from(admin: &AdminIdentity) -> Self {
        Self {
            mode: admin.mode,
            role: admin.role,
        }
    }
}
