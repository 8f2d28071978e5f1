//! Database schema migrations
//!
//! Versioned, idempotent migrations tracked in `schema_version`. Column
//! additions are not migrations: they belong in `table_schemas.rs`. Use a
//! migration for data backfills and anything ALTER TABLE ADD COLUMN cannot
//! express.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the field have already run them
//! 2. **Always add new migrations** - one function per change, bump `CURRENT_SCHEMA_VERSION`
//! 3. **Stay idempotent** - a crash between the migration and the version insert reruns it

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Latest applied version, 0 for a fresh database
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("Migration v2 completed");
    }

    Ok(())
}

/// Migration v1: create cases for reports that have none.
///
/// Databases from before case tracking hold reports with no matching
/// `moderation_cases` row. One case per distinct target is created, counting
/// unresolved reports; targets with only resolved reports start dismissed.
/// Risk is the sum of per-reason weights, on the same scale report intake
/// uses.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    let now = crate::time::now_store();

    let result = sqlx::query(
        r#"
        INSERT INTO moderation_cases (
            id, target_type, target_id, status, risk_score, reports_count,
            last_reported_at, created_at, updated_at
        )
        SELECT
            lower(hex(randomblob(16))),
            r.target_type,
            r.target_id,
            CASE WHEN SUM(r.status IN ('open', 'triaged')) > 0 THEN 'open' ELSE 'dismissed' END,
            SUM(CASE lower(r.reason)
                WHEN 'violence' THEN 5.0
                WHEN 'self_harm' THEN 5.0
                WHEN 'hate' THEN 4.0
                WHEN 'sexual' THEN 4.0
                WHEN 'abuse' THEN 3.0
                WHEN 'harassment' THEN 3.0
                WHEN 'misinformation' THEN 2.0
                ELSE 1.0
            END),
            SUM(r.status IN ('open', 'triaged')),
            MAX(r.created_at),
            ?1,
            ?1
        FROM moderation_reports r
        WHERE r.target_type IN ('post', 'comment', 'group', 'user')
          AND NOT EXISTS (
              SELECT 1 FROM moderation_cases c
              WHERE c.target_type = r.target_type AND c.target_id = r.target_id
          )
        GROUP BY r.target_type, r.target_id
        "#,
    )
    .bind(&now)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        info!(
            "Migration v1: created {} case(s) from existing reports",
            result.rows_affected()
        );
    }

    Ok(())
}

/// Migration v2: lookup indexes for the report and audit joins
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    let statements = [
        "CREATE INDEX IF NOT EXISTS idx_moderation_reports_target
            ON moderation_reports (target_type, target_id, status)",
        "CREATE INDEX IF NOT EXISTS idx_moderation_actions_target
            ON moderation_actions (target_type, target_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_moderation_actions_case
            ON moderation_actions (case_id)",
        "CREATE INDEX IF NOT EXISTS idx_moderation_cases_queue
            ON moderation_cases (status, risk_score, last_reported_at)",
    ];

    for sql in statements {
        sqlx::query(sql).execute(pool).await?;
    }

    Ok(())
}
