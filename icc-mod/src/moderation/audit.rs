//! Append-only audit log
//!
//! Every admin decision adds exactly one `moderation_actions` row. Nothing in
//! this crate updates or deletes audit rows.

use icc_common::api::AdminIdentity;
use icc_common::db::faults::is_missing_table;
use icc_common::db::models::ActionRow;
use icc_common::{Error, Result};
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::warn;

use super::types::AuditEntry;

pub const DEFAULT_AUDIT_LIMIT: i64 = 100;
pub const MAX_AUDIT_LIMIT: i64 = 400;

/// Audit row about to be written
#[derive(Debug, Clone)]
pub struct AuditRecord<'a> {
    pub case_id: Option<&'a str>,
    pub action: &'a str,
    /// A [`TargetType`](super::types::TargetType) name, or `report` for
    /// report triage
    pub target_type: &'a str,
    pub target_id: &'a str,
    pub reason: Option<&'a str>,
    pub note: Option<&'a str>,
    pub metadata: Map<String, Value>,
}

/// Append one audit row; returns its id
pub async fn record(pool: &SqlitePool, entry: &AuditRecord<'_>, admin: &AdminIdentity) -> Result<String> {
    let id = icc_common::uuid_utils::generate();
    let metadata = Value::Object(entry.metadata.clone()).to_string();

    sqlx::query(
        r#"
        INSERT INTO moderation_actions (
            id, case_id, action, target_type, target_id, reason, note,
            admin_user_id, admin_actor, metadata, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(entry.case_id)
    .bind(entry.action)
    .bind(entry.target_type)
    .bind(entry.target_id)
    .bind(entry.reason)
    .bind(entry.note)
    .bind(admin.user_id.as_deref())
    .bind(&admin.actor)
    .bind(metadata)
    .bind(icc_common::time::now_store())
    .execute(pool)
    .await
    .map_err(Error::from_write)?;

    Ok(id)
}

/// Audit listing filters; `None` means unfiltered
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub case_id: Option<String>,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub action: Option<String>,
    pub limit: Option<i64>,
}

/// Audit entries matching `filter`, newest first
pub async fn list_audit(pool: &SqlitePool, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
    let limit = filter
        .limit
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .clamp(1, MAX_AUDIT_LIMIT);

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT id, case_id, action, target_type, target_id, reason, note, \
         admin_user_id, admin_actor, metadata, created_at FROM moderation_actions WHERE 1 = 1",
    );
    if let Some(case_id) = &filter.case_id {
        builder.push(" AND case_id = ").push_bind(case_id.as_str());
    }
    if let Some(target_type) = &filter.target_type {
        builder.push(" AND target_type = ").push_bind(target_type.as_str());
    }
    if let Some(target_id) = &filter.target_id {
        builder.push(" AND target_id = ").push_bind(target_id.as_str());
    }
    if let Some(action) = &filter.action {
        builder.push(" AND action = ").push_bind(action.as_str());
    }
    builder
        .push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
        .push_bind(limit);

    match builder.build_query_as::<ActionRow>().fetch_all(pool).await {
        Ok(rows) => Ok(rows.into_iter().map(AuditEntry::from).collect()),
        Err(e) if is_missing_table(&e, "moderation_actions") => {
            warn!("moderation_actions table missing, audit log is empty");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

/// Visibility a post had before it was first hidden or removed.
///
/// Read from the latest hide/remove entry that captured one.
pub async fn previous_visibility(pool: &SqlitePool, post_id: &str) -> Result<Option<String>> {
    let result = sqlx::query_scalar::<_, Option<String>>(
        r#"
        SELECT json_extract(metadata, '$.previousVisibility')
        FROM moderation_actions
        WHERE target_type = 'post'
          AND target_id = ?
          AND action IN ('hide', 'remove')
          AND json_valid(metadata)
          AND json_extract(metadata, '$.previousVisibility') IS NOT NULL
        ORDER BY created_at DESC, rowid DESC
        LIMIT 1
        "#,
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await;

    match result {
        Ok(value) => Ok(value.flatten()),
        Err(e) if is_missing_table(&e, "moderation_actions") => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::types::TargetType;
    use icc_common::api::{AdminRole, AuthMode};
    use icc_common::db::init::init_memory_database;
    use serde_json::json;

    fn admin() -> AdminIdentity {
        AdminIdentity {
            user_id: Some("u-admin".to_string()),
            actor: "Esther".to_string(),
            role: AdminRole::Admin,
            mode: AuthMode::Session,
        }
    }

    fn entry<'a>(action: &'a str, target_id: &'a str, metadata: Value) -> AuditRecord<'a> {
        AuditRecord {
            case_id: Some("case-1"),
            action,
            target_type: TargetType::Post.as_str(),
            target_id,
            reason: Some("spam"),
            note: None,
            metadata: metadata.as_object().cloned().unwrap_or_default(),
        }
    }

    #[tokio::test]
    async fn test_record_and_list_newest_first() {
        let pool = init_memory_database().await.unwrap();
        record(&pool, &entry("hide", "p1", json!({})), &admin()).await.unwrap();
        record(&pool, &entry("unhide", "p1", json!({})), &admin()).await.unwrap();
        record(&pool, &entry("remove", "p2", json!({})), &admin()).await.unwrap();

        let all = list_audit(&pool, &AuditFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].action, "remove");
        assert_eq!(all[0].admin_actor.as_deref(), Some("Esther"));
        assert_eq!(all[0].admin_user_id.as_deref(), Some("u-admin"));

        let filter = AuditFilter {
            target_id: Some("p1".to_string()),
            ..AuditFilter::default()
        };
        let p1 = list_audit(&pool, &filter).await.unwrap();
        assert_eq!(p1.len(), 2);
        assert_eq!(p1[0].action, "unhide");

        let filter = AuditFilter {
            action: Some("hide".to_string()),
            limit: Some(0),
            ..AuditFilter::default()
        };
        assert_eq!(list_audit(&pool, &filter).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_metadata_round_trips_as_object() {
        let pool = init_memory_database().await.unwrap();
        record(&pool, &entry("ban_device", "p1", json!({"deviceId": "dev-9"})), &admin())
            .await
            .unwrap();

        let entries = list_audit(&pool, &AuditFilter::default()).await.unwrap();
        assert_eq!(entries[0].metadata["deviceId"], "dev-9");
        assert_eq!(entries[0].case_id.as_deref(), Some("case-1"));
    }

    #[tokio::test]
    async fn test_previous_visibility_uses_latest_capture() {
        let pool = init_memory_database().await.unwrap();
        assert_eq!(previous_visibility(&pool, "p1").await.unwrap(), None);

        record(&pool, &entry("hide", "p1", json!({"previousVisibility": "members"})), &admin())
            .await
            .unwrap();
        // A later remove on an already hidden post captures nothing
        record(&pool, &entry("remove", "p1", json!({})), &admin()).await.unwrap();

        assert_eq!(
            previous_visibility(&pool, "p1").await.unwrap().as_deref(),
            Some("members")
        );
    }
}
