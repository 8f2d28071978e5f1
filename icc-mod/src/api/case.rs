//! Case detail endpoint

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use icc_common::api::AdminIdentity;
use serde::{Deserialize, Serialize};

use super::auth::AuthSummary;
use crate::error::ApiError;
use crate::moderation::{fetch_case_detail, CaseDetail};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CaseParams {
    pub id: Option<String>,
}

/// Envelope shared by case detail, action and assign responses
#[derive(Debug, Serialize)]
pub struct CaseResponse {
    pub ok: bool,
    pub detail: Option<CaseDetail>,
    pub auth: AuthSummary,
}

/// GET /api/admin/moderation/case?id
pub async fn get_case(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminIdentity>,
    params: Result<Query<CaseParams>, QueryRejection>,
) -> Result<Json<CaseResponse>, ApiError> {
    let Query(params) = params?;
    let case_id = params
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("Missing case id.".to_string()))?;

    let detail = fetch_case_detail(&state.db, case_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Case not found.".to_string()))?;

    Ok(Json(CaseResponse {
        ok: true,
        detail: Some(detail),
        auth: AuthSummary::from(&admin),
    }))
}
