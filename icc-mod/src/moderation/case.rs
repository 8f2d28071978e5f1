//! Case lookup and detail

use icc_common::db::faults::is_missing_table;
use icc_common::db::models::CaseRow;
use icc_common::Result;
use sqlx::SqlitePool;
use tracing::warn;

use super::audit::{list_audit, AuditFilter};
use super::queue::{attach_previews, CASE_SELECT, CASE_SELECT_STORED};
use super::reports::{list_reports_for_target, MAX_REPORTS_PER_TARGET};
use super::types::{CaseDetail, CaseReport};

/// Raw case row by id
pub async fn fetch_case_row(pool: &SqlitePool, case_id: &str) -> Result<Option<CaseRow>> {
    match query_case_row(pool, CASE_SELECT, case_id).await {
        Ok(row) => Ok(row),
        Err(e) if is_missing_table(&e, "moderation_reports") => {
            warn!("moderation_reports table missing, case {} uses stored report count", case_id);
            Ok(query_case_row(pool, CASE_SELECT_STORED, case_id).await?)
        }
        Err(e) => Err(e.into()),
    }
}

async fn query_case_row(
    pool: &SqlitePool,
    select: &str,
    case_id: &str,
) -> std::result::Result<Option<CaseRow>, sqlx::Error> {
    sqlx::query_as::<_, CaseRow>(&format!("{} WHERE c.id = ?", select))
        .bind(case_id)
        .fetch_optional(pool)
        .await
}

/// Case with preview, reports and audit trail; `None` if the id is unknown.
///
/// Audit entries are matched on the case target rather than `case_id`, so
/// entries written before the case row existed still show.
pub async fn fetch_case_detail(pool: &SqlitePool, case_id: &str) -> Result<Option<CaseDetail>> {
    let Some(row) = fetch_case_row(pool, case_id).await? else {
        return Ok(None);
    };

    let Some(item) = attach_previews(pool, vec![row]).await?.into_iter().next() else {
        // Row exists but could not be typed; already logged
        return Ok(None);
    };

    let reports = list_reports_for_target(pool, item.target_type, &item.target_id)
        .await?
        .into_iter()
        .map(CaseReport::from)
        .collect();

    let actions = list_audit(
        pool,
        &AuditFilter {
            target_type: Some(item.target_type.as_str().to_string()),
            target_id: Some(item.target_id.clone()),
            limit: Some(MAX_REPORTS_PER_TARGET),
            ..AuditFilter::default()
        },
    )
    .await?;

    Ok(Some(CaseDetail {
        item,
        reports,
        actions,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use icc_common::db::init::init_memory_database;

    #[tokio::test]
    async fn test_unknown_case_is_none() {
        let pool = init_memory_database().await.unwrap();
        assert!(fetch_case_detail(&pool, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_detail_includes_reports_and_target_actions() {
        let pool = init_memory_database().await.unwrap();
        sqlx::query(
            "INSERT INTO moderation_cases (id, target_type, target_id, reports_count, created_at)
             VALUES ('c1', 'group', 'g1', 1, '2026-01-01T00:00:00.000Z')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO moderation_reports (id, target_type, target_id, reason, created_at) VALUES
                ('r1', 'group', 'g1', 'spam', '2026-01-02T00:00:00.000Z'),
                ('r2', 'group', 'g1', 'hate', '2026-01-03T00:00:00.000Z'),
                ('r3', 'group', 'other', 'hate', '2026-01-03T00:00:00.000Z')",
        )
        .execute(&pool)
        .await
        .unwrap();
        // Logged before case ids were recorded
        sqlx::query(
            "INSERT INTO moderation_actions (id, action, target_type, target_id, created_at)
             VALUES ('a1', 'warn', 'group', 'g1', '2026-01-04T00:00:00.000Z')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let detail = fetch_case_detail(&pool, "c1").await.unwrap().unwrap();
        assert_eq!(detail.item.target_id, "g1");
        assert_eq!(detail.item.reports_count, 2);
        assert_eq!(detail.item.preview.title, "group g1");
        let report_ids: Vec<&str> = detail.reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(report_ids, vec!["r2", "r1"]);
        assert_eq!(detail.actions.len(), 1);
        assert!(detail.actions[0].case_id.is_none());
    }

    #[tokio::test]
    async fn test_detail_loads_without_reports_table() {
        let pool = init_memory_database().await.unwrap();
        sqlx::query(
            "INSERT INTO moderation_cases (id, target_type, target_id, reports_count, created_at)
             VALUES ('c1', 'post', 'p1', 3, '2026-01-01T00:00:00.000Z')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("DROP TABLE moderation_reports")
            .execute(&pool)
            .await
            .unwrap();

        let detail = fetch_case_detail(&pool, "c1").await.unwrap().unwrap();
        assert_eq!(detail.item.reports_count, 3);
        assert!(detail.reports.is_empty());
        assert!(fetch_case_row(&pool, "missing").await.unwrap().is_none());
    }
}
