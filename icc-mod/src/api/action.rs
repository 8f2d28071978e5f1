//! Action endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use icc_common::api::AdminIdentity;
use serde::{Deserialize, Serialize};

use super::auth::{require_writer, AuthSummary};
use crate::error::ApiError;
use crate::moderation::{
    apply_action, fetch_case_detail, ActionKind, ActionOutcome, ActionRequest, CaseDetail,
    TargetType,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionBody {
    pub case_id: Option<String>,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub action: Option<String>,
    pub reason: Option<String>,
    pub note: Option<String>,
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub ok: bool,
    pub result: ActionOutcome,
    pub detail: Option<CaseDetail>,
    pub auth: AuthSummary,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ActionBody {
    /// Validate into an [`ActionRequest`]
    pub fn into_request(self) -> Result<ActionRequest, ApiError> {
        let (Some(case_id), Some(target_type), Some(target_id), Some(action)) = (
            trimmed(self.case_id),
            trimmed(self.target_type),
            trimmed(self.target_id),
            trimmed(self.action),
        ) else {
            return Err(ApiError::InvalidInput(
                "Missing caseId/targetType/targetId/action.".to_string(),
            ));
        };

        Ok(ActionRequest {
            case_id,
            target_type: target_type.parse::<TargetType>()?,
            target_id,
            action: action.parse::<ActionKind>()?,
            reason: trimmed(self.reason),
            note: trimmed(self.note),
            device_id: trimmed(self.device_id),
        })
    }
}

/// POST /api/admin/moderation/action
pub async fn post_action(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminIdentity>,
    body: Result<Json<ActionBody>, JsonRejection>,
) -> Result<Json<ActionResponse>, ApiError> {
    require_writer(&admin)?;
    let Json(body) = body?;
    let request = body.into_request()?;

    let outcome = apply_action(&state.db, &request, &admin).await?;
    let detail = fetch_case_detail(&state.db, &request.case_id).await?;

    Ok(Json(ActionResponse {
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
    fn test_body_validation_messages() {
        let err = ActionBody::default().into_request().unwrap_err();
        assert_eq!(err.to_string(), "Missing caseId/targetType/targetId/action.");

        let body = ActionBody {
            case_id: Some("c1".into()),
            target_type: Some("story".into()),
            target_id: Some("s1".into()),
            action: Some("hide".into()),
            ..ActionBody::default()
        };
        assert_eq!(body.into_request().unwrap_err().to_string(), "Invalid targetType.");

        let body = ActionBody {
            case_id: Some("c1".into()),
            target_type: Some("post".into()),
            target_id: Some("p1".into()),
            action: Some("assign".into()),
            ..ActionBody::default()
        };
        assert_eq!(body.into_request().unwrap_err().to_string(), "Invalid action.");
    }

    #[test]
    fn test_body_blank_optionals_dropped() {
        let body = ActionBody {
            case_id: Some(" c1 ".into()),
            target_type: Some("post".into()),
            target_id: Some("p1".into()),
            action: Some("ban_device".into()),
            reason: Some("  ".into()),
            device_id: Some(" dev ".into()),
            ..ActionBody::default()
        };
        let request = body.into_request().unwrap();
        assert_eq!(request.case_id, "c1");
        assert_eq!(request.action, ActionKind::BanDevice);
        assert!(request.reason.is_none());
        assert_eq!(request.device_id.as_deref(), Some("dev"));
    }
}
