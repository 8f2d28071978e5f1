//! User reports
//!
//! Submitting a report writes the report and upserts the target's case in
//! one transaction, so a case always exists for every reported target.

use icc_common::api::AdminIdentity;
use icc_common::db::faults::{is_check_violation, is_missing_table};
use icc_common::db::models::ReportRow;
use icc_common::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::audit::{self, AuditRecord};
use super::types::{ActionKind, TargetType};

/// Cap on reports returned for one target
pub const MAX_REPORTS_PER_TARGET: i64 = 300;

/// Reason recorded when none is given
pub const DEFAULT_REASON: &str = "other";

/// Risk added to a case per report, by reason
pub fn risk_weight(reason: &str) -> f64 {
    match reason {
        "violence" | "self_harm" => 5.0,
        "hate" | "sexual" => 4.0,
        "abuse" | "harassment" => 3.0,
        "misinformation" => 2.0,
        _ => 1.0,
    }
}

/// A report as submitted by a community user
#[derive(Debug, Clone)]
pub struct NewReport {
    pub target_type: TargetType,
    pub target_id: String,
    pub reason: Option<String>,
    pub details: Option<String>,
    pub message: Option<String>,
    pub reporter_user_id: Option<String>,
    pub reporter_device_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportReceipt {
    pub report_id: String,
    pub case_id: String,
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Record a report and fold it into the target's case
pub async fn submit_report(pool: &SqlitePool, report: &NewReport) -> Result<ReportReceipt> {
    let target_id = report.target_id.trim();
    if target_id.is_empty() {
        return Err(Error::InvalidInput("Missing targetId.".to_string()));
    }
    let reporter_user_id = clean(&report.reporter_user_id);
    let reporter_device_id = clean(&report.reporter_device_id);
    if reporter_user_id.is_none() && reporter_device_id.is_none() {
        return Err(Error::InvalidInput(
            "Missing reporterUserId/reporterDeviceId.".to_string(),
        ));
    }
    let reason = clean(&report.reason)
        .map(|r| r.to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_REASON.to_string());

    let report_id = icc_common::uuid_utils::generate();
    let now = icc_common::time::now_store();
    let weight = risk_weight(&reason);

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO moderation_reports (
            id, target_type, target_id, reason, details, message, status,
            reporter_user_id, reporter_device_id, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, 'open', ?, ?, ?)
        "#,
    )
    .bind(&report_id)
    .bind(report.target_type.as_str())
    .bind(target_id)
    .bind(&reason)
    .bind(clean(&report.details))
    .bind(clean(&report.message))
    .bind(&reporter_user_id)
    .bind(&reporter_device_id)
    .bind(&now)
    .execute(&mut *tx)
    .await
    .map_err(Error::from_write)?;

    // A new report reopens a case that was already dealt with
    let case_id: String = sqlx::query_scalar(
        r#"
        INSERT INTO moderation_cases (
            id, target_type, target_id, status, risk_score, reports_count,
            last_reported_at, created_at, updated_at
        )
        VALUES (?1, ?2, ?3, 'open', ?4, 1, ?5, ?5, ?5)
        ON CONFLICT (target_type, target_id) DO UPDATE SET
            risk_score = moderation_cases.risk_score + excluded.risk_score,
            reports_count = moderation_cases.reports_count + 1,
            last_reported_at = excluded.last_reported_at,
            updated_at = excluded.updated_at,
            status = CASE
                WHEN moderation_cases.status IN ('actioned', 'dismissed') THEN 'open'
                ELSE moderation_cases.status
            END
        RETURNING id
        "#,
    )
    .bind(icc_common::uuid_utils::generate())
    .bind(report.target_type.as_str())
    .bind(target_id)
    .bind(weight)
    .bind(&now)
    .fetch_one(&mut *tx)
    .await
    .map_err(Error::from_write)?;

    if report.target_type == TargetType::Post {
        let bumped = sqlx::query(
            "UPDATE community_posts SET reported_count = COALESCE(reported_count, 0) + 1 WHERE id = ?",
        )
        .bind(target_id)
        .execute(&mut *tx)
        .await;
        match bumped {
            Ok(_) => {}
            Err(e) if is_missing_table(&e, "community_posts") => {
                debug!("community_posts not present, reported_count not tracked");
            }
            Err(e) => return Err(Error::from_write(e)),
        }
    }

    tx.commit().await?;

    info!(
        "Report {} on {} {} ({}, +{} risk) -> case {}",
        report_id, report.target_type, target_id, reason, weight, case_id
    );

    Ok(ReportReceipt { report_id, case_id })
}

/// Reports for a target, newest first
pub async fn list_reports_for_target(
    pool: &SqlitePool,
    target_type: TargetType,
    target_id: &str,
) -> Result<Vec<ReportRow>> {
    let result = sqlx::query_as::<_, ReportRow>(
        r#"
        SELECT id, target_type, target_id, reason, details, message, status,
               reporter_user_id, reporter_device_id, created_at
        FROM moderation_reports
        WHERE target_type = ? AND target_id = ?
        ORDER BY created_at DESC, rowid DESC
        LIMIT ?
        "#,
    )
    .bind(target_type.as_str())
    .bind(target_id)
    .bind(MAX_REPORTS_PER_TARGET)
    .fetch_all(pool)
    .await;

    match result {
        Ok(rows) => Ok(rows),
        Err(e) if is_missing_table(&e, "moderation_reports") => {
            warn!("moderation_reports table missing, case shows no reports");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

/// Live count of unresolved (`open` or `triaged`) reports for a target
pub async fn count_unresolved(
    pool: &SqlitePool,
    target_type: TargetType,
    target_id: &str,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM moderation_reports
         WHERE target_type = ? AND target_id = ? AND status IN ('open', 'triaged')",
    )
    .bind(target_type.as_str())
    .bind(target_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Move a target's `open` reports out of `open` after an action.
///
/// `dismiss` marks them `dismissed`, anything else `merged`. A store whose
/// status CHECK predates those values gets `closed` / `triaged` instead.
/// Returns the number of reports moved.
pub async fn transition_open_reports(
    pool: &SqlitePool,
    target_type: TargetType,
    target_id: &str,
    action: ActionKind,
) -> Result<u64> {
    let (desired, fallback) = match action {
        ActionKind::Dismiss => ("dismissed", "closed"),
        _ => ("merged", "triaged"),
    };

    match set_open_reports_status(pool, target_type, target_id, desired).await {
        Ok(moved) => Ok(moved),
        Err(e) if is_check_violation(&e) => {
            warn!(
                "Report status '{}' rejected by store, using '{}'",
                desired, fallback
            );
            set_open_reports_status(pool, target_type, target_id, fallback)
                .await
                .map_err(Error::from_write)
        }
        Err(e) => Err(Error::from_write(e)),
    }
}

async fn set_open_reports_status(
    pool: &SqlitePool,
    target_type: TargetType,
    target_id: &str,
    status: &str,
) -> std::result::Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE moderation_reports SET status = ?
         WHERE target_type = ? AND target_id = ? AND status = 'open'",
    )
    .bind(status)
    .bind(target_type.as_str())
    .bind(target_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Status an admin sets on a single report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportResolution {
    /// Looked at, still counts as unresolved
    Triaged,
    Closed,
}

impl ReportResolution {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportResolution::Triaged => "triaged",
            ReportResolution::Closed => "closed",
        }
    }

    /// Action name written to the audit log
    pub fn audit_action(self) -> &'static str {
        match self {
            ReportResolution::Triaged => "triage_report",
            ReportResolution::Closed => "close_report",
        }
    }
}

impl fmt::Display for ReportResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportResolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "triaged" => Ok(ReportResolution::Triaged),
            "closed" => Ok(ReportResolution::Closed),
            _ => Err(Error::InvalidInput("Invalid status.".to_string())),
        }
    }
}

/// What a report status change touched
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatusOutcome {
    pub audit_id: String,
    pub report_id: String,
    pub status: ReportResolution,
    pub previous_status: String,
    /// Case for the report's target, if one exists
    pub case_id: Option<String>,
    pub reports_count: Option<i64>,
}

/// Triage or close one report.
///
/// Logs one audit row against the report (`target_type = 'report'`) and
/// recounts unresolved reports on the owning case. The case status is left
/// alone.
pub async fn set_report_status(
    pool: &SqlitePool,
    report_id: &str,
    status: ReportResolution,
    reason: Option<&str>,
    note: Option<&str>,
    admin: &AdminIdentity,
) -> Result<ReportStatusOutcome> {
    let report_id = report_id.trim();
    if report_id.is_empty() {
        return Err(Error::InvalidInput("Missing reportId.".to_string()));
    }

    let report: Option<(String, String, String)> = sqlx::query_as(
        "SELECT target_type, target_id, status FROM moderation_reports WHERE id = ?",
    )
    .bind(report_id)
    .fetch_optional(pool)
    .await
    .map_err(Error::from_write)?;
    let Some((target_type, target_id, previous_status)) = report else {
        return Err(Error::NotFound("Report not found.".to_string()));
    };

    sqlx::query("UPDATE moderation_reports SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(report_id)
        .execute(pool)
        .await
        .map_err(Error::from_write)?;

    let case: Option<(String, i64)> = sqlx::query_as(
        r#"
        UPDATE moderation_cases
        SET updated_at = ?,
            reports_count = (
                SELECT COUNT(*) FROM moderation_reports r
                WHERE r.target_type = moderation_cases.target_type
                  AND r.target_id = moderation_cases.target_id
                  AND r.status IN ('open', 'triaged')
            )
        WHERE target_type = ? AND target_id = ?
        RETURNING id, reports_count
        "#,
    )
    .bind(icc_common::time::now_store())
    .bind(&target_type)
    .bind(&target_id)
    .fetch_optional(pool)
    .await
    .map_err(Error::from_write)?;
    let (case_id, reports_count) = case.unzip();

    let mut metadata = Map::new();
    metadata.insert("previousStatus".to_string(), Value::String(previous_status.clone()));
    metadata.insert("reportTargetType".to_string(), Value::String(target_type.clone()));
    metadata.insert("reportTargetId".to_string(), Value::String(target_id.clone()));

    let audit_id = audit::record(
        pool,
        &AuditRecord {
            case_id: case_id.as_deref(),
            action: status.audit_action(),
            target_type: "report",
            target_id: report_id,
            reason,
            note,
            metadata,
        },
        admin,
    )
    .await?;

    info!(
        "{} set report {} on {} {} to {} (was {})",
        admin.actor, report_id, target_type, target_id, status, previous_status
    );

    Ok(ReportStatusOutcome {
        audit_id,
        report_id: report_id.to_string(),
        status,
        previous_status,
        case_id,
        reports_count,
    })
}
