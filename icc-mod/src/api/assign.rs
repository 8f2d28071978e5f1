//! Assignment endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use icc_common::api::{AdminIdentity, AuthMode};
use serde::{Deserialize, Deserializer};

use super::auth::{require_writer, AuthSummary};
use super::case::CaseResponse;
use crate::error::ApiError;
use crate::moderation::{assign_case, fetch_case_detail};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignBody {
    pub case_id: Option<String>,
    /// Absent: assign to the caller. `null`: unassign.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub assigned_to: Option<Option<String>>,
}

/// Distinguish an explicit `null` from an absent field
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Resolve the assignee the request asks for
pub fn resolve_assignee(
    assigned_to: Option<Option<String>>,
    admin: &AdminIdentity,
) -> Result<Option<String>, ApiError> {
    match assigned_to {
        Some(explicit) => Ok(explicit
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())),
        None => match (&admin.user_id, admin.mode) {
            (Some(user_id), _) => Ok(Some(user_id.clone())),
            (None, AuthMode::AdminKey) => Err(ApiError::InvalidInput(
                "assignedTo is required when using the admin key.".to_string(),
            )),
            (None, AuthMode::Session) => Ok(None),
        },
    }
}

/// POST /api/admin/moderation/assign
pub async fn post_assign(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminIdentity>,
    body: Result<Json<AssignBody>, JsonRejection>,
) -> Result<Json<CaseResponse>, ApiError> {
    require_writer(&admin)?;
    let Json(body) = body?;

    let case_id = body
        .case_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("Missing caseId.".to_string()))?
        .to_string();
    let assignee = resolve_assignee(body.assigned_to, &admin)?;

    assign_case(&state.db, &case_id, assignee.as_deref(), &admin).await?;
    let detail = fetch_case_detail(&state.db, &case_id).await?;

    Ok(Json(CaseResponse {
        ok: true,
        detail,
        auth: AuthSummary::from(&admin),
    }))
}
