//! Action application
//!
//! Applying an action is a sequence of independent writes:
//! 1. target mutation (post visibility, hard delete, device block)
//! 2. one audit row
//! 3. open reports moved to `dismissed` / `merged`
//! 4. case status, `updated_at` and `reports_count`
//!
//! There is no transaction around the sequence; a failure part way leaves
//! the earlier steps applied. Validation and device resolution happen before
//! step 1 so a rejected request writes nothing.

use icc_common::api::AdminIdentity;
use icc_common::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::audit::{self, AuditRecord};
use super::case::fetch_case_row;
use super::preview::load_target_content;
use super::reports::transition_open_reports;
use super::types::{ActionKind, CaseStatus, TargetType};

/// Suspension length for `suspend_device`
pub const SUSPEND_DAYS: i64 = 7;

/// Visibility restored by `unhide` when none was recorded
pub const DEFAULT_VISIBILITY: &str = "public";

/// Block reason when the admin gives none
const DEFAULT_BLOCK_REASON: &str = "admin_action";

#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub case_id: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub action: ActionKind,
    pub reason: Option<String>,
    pub note: Option<String>,
    pub device_id: Option<String>,
}

/// What an applied action changed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub audit_id: String,
    pub case_status: CaseStatus,
    pub reports_transitioned: u64,
    pub device_id: Option<String>,
}

/// Apply an admin decision to a case and its target
pub async fn apply_action(
    pool: &SqlitePool,
    request: &ActionRequest,
    admin: &AdminIdentity,
) -> Result<ActionOutcome> {
    let case = fetch_case_row(pool, &request.case_id)
        .await?
        .ok_or_else(|| Error::NotFound("Case not found.".to_string()))?;
    if case.target_type != request.target_type.as_str() || case.target_id != request.target_id {
        return Err(Error::InvalidInput(
            "targetType/targetId do not match the case.".to_string(),
        ));
    }

    let device_id = if request.action.is_device_block() {
        Some(resolve_device_id(pool, request).await?)
    } else {
        None
    };

    let mut metadata = Map::new();
    if let Some(device_id) = &device_id {
        metadata.insert("deviceId".to_string(), Value::String(device_id.clone()));
    }

    match (request.target_type, request.action) {
        (TargetType::Post, action) if action.is_visibility_change() => {
            if let Some(previous) =
                patch_post_visibility(pool, &request.target_id, action, admin).await?
            {
                metadata.insert("previousVisibility".to_string(), Value::String(previous));
            }
        }
        (TargetType::Comment, ActionKind::Remove) => {
            delete_target(pool, "community_comments", &request.target_id).await?;
        }
        (TargetType::Group, ActionKind::Remove) => {
            delete_target(pool, "community_groups", &request.target_id).await?;
        }
        _ => {}
    }

    if let Some(device_id) = &device_id {
        block_device(pool, device_id, request.action, request.reason.as_deref()).await?;
    }

    let audit_id = audit::record(
        pool,
        &AuditRecord {
            case_id: Some(&request.case_id),
            action: request.action.as_str(),
            target_type: request.target_type.as_str(),
            target_id: &request.target_id,
            reason: request.reason.as_deref(),
            note: request.note.as_deref(),
            metadata,
        },
        admin,
    )
    .await?;

    let reports_transitioned =
        transition_open_reports(pool, request.target_type, &request.target_id, request.action)
            .await?;

    let case_status = request.action.resulting_case_status();
    update_case_after_action(pool, &request.case_id, case_status).await?;

    info!(
        "{} applied {} to {} {} (case {}, {} report(s) moved, case now {})",
        admin.actor,
        request.action,
        request.target_type,
        request.target_id,
        request.case_id,
        reports_transitioned,
        case_status
    );

    Ok(ActionOutcome {
        audit_id,
        case_status,
        reports_transitioned,
        device_id,
    })
}

/// Device to block: the one given, else the target author's device
async fn resolve_device_id(pool: &SqlitePool, request: &ActionRequest) -> Result<String> {
    if let Some(device_id) = request
        .device_id
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        return Ok(device_id.to_string());
    }

    let content = load_target_content(pool, request.target_type, &request.target_id).await?;
    match content.as_ref().and_then(|c| c.author_device_id()) {
        Some(device_id) => {
            debug!(
                "Resolved device {} from {} {}",
                device_id, request.target_type, request.target_id
            );
            Ok(device_id.to_string())
        }
        None => Err(Error::InvalidInput(
            "deviceId is required: the target has no known author device.".to_string(),
        )),
    }
}

/// Update a post's visibility columns.
///
/// Returns the visibility to record as `previousVisibility`: the current one
/// when hiding or removing a post that is not already hidden or removed.
async fn patch_post_visibility(
    pool: &SqlitePool,
    post_id: &str,
    action: ActionKind,
    admin: &AdminIdentity,
) -> Result<Option<String>> {
    let current: Option<String> =
        sqlx::query_scalar::<_, Option<String>>("SELECT visibility FROM community_posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(pool)
            .await
            .map_err(Error::from_write)?
            .flatten();

    let now = icc_common::time::now_store();
    let result = match action {
        ActionKind::Hide => {
            sqlx::query(
                "UPDATE community_posts SET visibility = 'hidden', moderation_status = 'actioned'
                 WHERE id = ?",
            )
            .bind(post_id)
            .execute(pool)
            .await
        }
        ActionKind::Remove => {
            sqlx::query(
                "UPDATE community_posts
                 SET visibility = 'removed', moderation_status = 'actioned',
                     deleted_at = ?, deleted_by = ?
                 WHERE id = ?",
            )
            .bind(&now)
            .bind(admin.user_id.as_deref())
            .bind(post_id)
            .execute(pool)
            .await
        }
        _ => {
            let restored = audit::previous_visibility(pool, post_id)
                .await?
                .unwrap_or_else(|| DEFAULT_VISIBILITY.to_string());
            sqlx::query(
                "UPDATE community_posts
                 SET visibility = ?, moderation_status = 'clean',
                     deleted_at = NULL, deleted_by = NULL
                 WHERE id = ?",
            )
            .bind(restored)
            .bind(post_id)
            .execute(pool)
            .await
        }
    };

    if result.map_err(Error::from_write)?.rows_affected() == 0 {
        debug!("Post {} not found, visibility unchanged", post_id);
    }

    let previous = match action {
        ActionKind::Hide | ActionKind::Remove => {
            current.filter(|v| v != "hidden" && v != "removed")
        }
        _ => None,
    };
    Ok(previous)
}

async fn delete_target(pool: &SqlitePool, table: &str, id: &str) -> Result<()> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", table))
        .bind(id)
        .execute(pool)
        .await
        .map_err(Error::from_write)?;
    debug!("Deleted {} row(s) from {}", result.rows_affected(), table);
    Ok(())
}

/// Insert or refresh a device block. `ban_device` never expires.
async fn block_device(
    pool: &SqlitePool,
    device_id: &str,
    action: ActionKind,
    reason: Option<&str>,
) -> Result<()> {
    let blocked_until = match action {
        ActionKind::SuspendDevice => Some(icc_common::time::days_from_now(SUSPEND_DAYS)),
        _ => None,
    };

    sqlx::query(
        r#"
        INSERT INTO blocked_devices (device_id, blocked_until, reason, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (device_id) DO UPDATE SET
            blocked_until = excluded.blocked_until,
            reason = excluded.reason
        "#,
    )
    .bind(device_id)
    .bind(blocked_until)
    .bind(reason.unwrap_or(DEFAULT_BLOCK_REASON))
    .bind(icc_common::time::now_store())
    .execute(pool)
    .await
    .map_err(Error::from_write)?;

    Ok(())
}

async fn update_case_after_action(pool: &SqlitePool, case_id: &str, status: CaseStatus) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE moderation_cases
        SET status = ?,
            updated_at = ?,
            reports_count = (
                SELECT COUNT(*) FROM moderation_reports r
                WHERE r.target_type = moderation_cases.target_type
                  AND r.target_id = moderation_cases.target_id
                  AND r.status IN ('open', 'triaged')
            )
        WHERE id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(icc_common::time::now_store())
    .bind(case_id)
    .execute(pool)
    .await
    .map_err(Error::from_write)?;

    Ok(())
}
