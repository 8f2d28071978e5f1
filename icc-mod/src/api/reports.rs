//! Report submission endpoint
//!
//! Public: reports come from community users, not admins.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::moderation::{submit_report, NewReport, ReportReceipt, TargetType};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBody {
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub reason: Option<String>,
    pub details: Option<String>,
    pub message: Option<String>,
    pub reporter_user_id: Option<String>,
    pub reporter_device_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub receipt: ReportReceipt,
}

/// POST /api/community/reports
pub async fn post_report(
    State(state): State<AppState>,
    body: Result<Json<ReportBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ReportResponse>), ApiError> {
    let Json(body) = body?;

    let target_type = body
        .target_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("Missing targetType/targetId.".to_string()))?
        .parse::<TargetType>()?;

    let report = NewReport {
        target_type,
        target_id: body.target_id.unwrap_or_default(),
        reason: body.reason,
        details: body.details,
        message: body.message,
        reporter_user_id: body.reporter_user_id,
        reporter_device_id: body.reporter_device_id,
    };

    let receipt = submit_report(&state.db, &report).await?;

    Ok((
        StatusCode::CREATED,
        Json(ReportResponse { ok: true, receipt }),
    ))
}
