//! Case assignment

use icc_common::api::AdminIdentity;
use icc_common::{Error, Result};
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use tracing::info;

use super::audit::{self, AuditRecord};
use super::case::fetch_case_row;
use super::types::CaseStatus;

/// Set or clear a case's assignee.
///
/// Assigning moves the case to `reviewing`, clearing moves it back to
/// `open`. A blank assignee counts as clearing. Logs `assign` or `unassign`.
pub async fn assign_case(
    pool: &SqlitePool,
    case_id: &str,
    assigned_to: Option<&str>,
    admin: &AdminIdentity,
) -> Result<CaseStatus> {
    let assigned_to = assigned_to.map(str::trim).filter(|a| !a.is_empty());
    let status = if assigned_to.is_some() {
        CaseStatus::Reviewing
    } else {
        CaseStatus::Open
    };

    let updated = sqlx::query(
        "UPDATE moderation_cases SET assigned_to = ?, status = ?, updated_at = ? WHERE id = ?",
    )
    .bind(assigned_to)
    .bind(status.as_str())
    .bind(icc_common::time::now_store())
    .bind(case_id)
    .execute(pool)
    .await
    .map_err(Error::from_write)?;

    if updated.rows_affected() == 0 {
        return Err(Error::NotFound("Case not found.".to_string()));
    }

    let case = fetch_case_row(pool, case_id)
        .await?
        .ok_or_else(|| Error::NotFound("Case not found.".to_string()))?;

    let mut metadata = Map::new();
    if let Some(assignee) = assigned_to {
        metadata.insert("assignedTo".to_string(), Value::String(assignee.to_string()));
    }

    audit::record(
        pool,
        &AuditRecord {
            case_id: Some(case_id),
            action: if assigned_to.is_some() { "assign" } else { "unassign" },
            target_type: &case.target_type,
            target_id: &case.target_id,
            reason: None,
            note: None,
            metadata,
        },
        admin,
    )
    .await?;

    match assigned_to {
        Some(assignee) => info!("{} assigned case {} to {}", admin.actor, case_id, assignee),
        None => info!("{} unassigned case {}", admin.actor, case_id),
    }

    Ok(status)
}
