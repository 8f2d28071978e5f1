//! Report triage endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use icc_common::api::AdminIdentity;
use serde::{Deserialize, Serialize};

use super::auth::{require_writer, AuthSummary};
use crate::error::ApiError;
use crate::moderation::{
    fetch_case_detail, set_report_status, CaseDetail, ReportResolution, ReportStatusOutcome,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatusBody {
    pub report_id: Option<String>,
    pub status: Option<String>,
    pub reason: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportStatusResponse {
    pub ok: bool,
    pub result: ReportStatusOutcome,
    pub detail: Option<CaseDetail>,
    pub auth: AuthSummary,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ReportStatusBody {
    fn validate(self) -> Result<(String, ReportResolution, Option<String>, Option<String>), ApiError> {
        let report_id = trimmed(self.report_id)
            .ok_or_else(|| ApiError::InvalidInput("Missing reportId.".to_string()))?;
        let status = trimmed(self.status)
            .ok_or_else(|| ApiError::InvalidInput("Invalid status.".to_string()))?
            .parse::<ReportResolution>()?;
        Ok((report_id, status, trimmed(self.reason), trimmed(self.note)))
    }
}

/// POST /api/admin/moderation/report
pub async fn post_report_status(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminIdentity>,
    body: Result<Json<ReportStatusBody>, JsonRejection>,
) -> Result<Json<ReportStatusResponse>, ApiError> {
    require_writer(&admin)?;
    let Json(body) = body?;
    let (report_id, status, reason, note) = body.validate()?;

    let outcome = set_report_status(
        &state.db,
        &report_id,
        status,
        reason.as_deref(),
        note.as_deref(),
        &admin,
    )
    .await?;
    let detail = match &outcome.case_id {
        Some(case_id) => fetch_case_detail(&state.db, case_id).await?,
        None => None,
    };

    Ok(Json(ReportStatusResponse {
        ok: true,
        result: outcome,
        detail,
        auth: AuthSummary::from(&admin),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_validation() {
        let missing = ReportStatusBody {
            status: Some("closed".into()),
            ..ReportStatusBody::default()
        };
        assert!(matches!(missing.validate(), Err(ApiError::InvalidInput(m)) if m == "Missing reportId."));

        let bad = ReportStatusBody {
            report_id: Some("r1".into()),
            status: Some("merged".into()),
            ..ReportStatusBody::default()
        };
        assert!(matches!(bad.validate(), Err(ApiError::InvalidInput(m)) if m == "Invalid status."));

        let ok = ReportStatusBody {
            report_id: Some(" r1 ".into()),
            status: Some("triaged".into()),
            reason: Some("  ".into()),
            note: Some("checked".into()),
        };
        let (id, status, reason, note) = ok.validate().unwrap();
        assert_eq!(id, "r1");
        assert_eq!(status, ReportResolution::Triaged);
        assert_eq!(reason, None);
        assert_eq!(note.as_deref(), Some("checked"));
    }
}
