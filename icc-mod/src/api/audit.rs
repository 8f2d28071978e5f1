//! Audit log and statistics endpoints

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use icc_common::api::AdminIdentity;
use serde::{Deserialize, Serialize};

use super::auth::AuthSummary;
use super::queue::parse_limit;
use crate::error::ApiError;
use crate::moderation::audit::{DEFAULT_AUDIT_LIMIT, MAX_AUDIT_LIMIT};
use crate::moderation::queue::clamp_limit;
use crate::moderation::{fetch_stats, list_audit, AuditEntry, AuditFilter, ModerationStats};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AuditParams {
    pub case_id: Option<String>,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub action: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFilters {
    pub case_id: Option<String>,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub action: Option<String>,
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub ok: bool,
    pub items: Vec<AuditEntry>,
    pub filters: AuditFilters,
    pub auth: AuthSummary,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub ok: bool,
    pub stats: ModerationStats,
    pub auth: AuthSummary,
}

fn param(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// GET /api/admin/audit?case_id&target_type&target_id&action&limit
pub async fn get_audit(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminIdentity>,
    params: Result<Query<AuditParams>, QueryRejection>,
) -> Result<Json<AuditResponse>, ApiError> {
    let Query(params) = params?;

    let filter = AuditFilter {
        case_id: param(params.case_id),
        target_type: param(params.target_type),
        target_id: param(params.target_id),
        action: param(params.action),
        limit: Some(clamp_limit(
            parse_limit(params.limit.as_deref()),
            DEFAULT_AUDIT_LIMIT,
            MAX_AUDIT_LIMIT,
        )),
    };

    let items = list_audit(&state.db, &filter).await?;

    Ok(Json(AuditResponse {
        ok: true,
        items,
        filters: AuditFilters {
            limit: filter.limit.unwrap_or(DEFAULT_AUDIT_LIMIT),
            case_id: filter.case_id,
            target_type: filter.target_type,
            target_id: filter.target_id,
            action: filter.action,
        },
        auth: AuthSummary::from(&admin),
    }))
}

/// GET /api/admin/moderation/stats
pub async fn get_stats(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminIdentity>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = fetch_stats(&state.db).await?;

    Ok(Json(StatsResponse {
        ok: true,
        stats,
        auth: AuthSummary::from(&admin),
    }))
}
