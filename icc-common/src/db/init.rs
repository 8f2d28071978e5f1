//! Database initialization
//!
//! Startup sequence for the moderation store:
//! 1. CREATE TABLE IF NOT EXISTS for every table the service touches
//! 2. Automatic schema synchronization (missing columns)
//! 3. Versioned migrations
//!
//! Community tables (`community_posts`, `community_comments`,
//! `community_groups`) belong to the community service. They are created
//! here only when absent so the moderation service can run standalone;
//! an existing table is never altered beyond adding missing columns.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the moderation database and bring its schema
/// up to date
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets the queue readers proceed while an action is being written
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    prepare_schema(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema.
///
/// Limited to one connection: every SQLite `:memory:` connection is a
/// separate database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    prepare_schema(&pool).await?;

    Ok(pool)
}

/// Create tables, sync columns and run migrations. Idempotent.
pub async fn prepare_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // Phase 1: CREATE TABLE IF NOT EXISTS
    create_schema_version_table(pool).await?;
    create_moderation_cases_table(pool).await?;
    create_moderation_reports_table(pool).await?;
    create_moderation_actions_table(pool).await?;
    create_blocked_devices_table(pool).await?;

    // Community tables (owned by the community service)
    create_community_posts_table(pool).await?;
    create_community_comments_table(pool).await?;
    create_community_groups_table(pool).await?;

    // Phase 2: add columns missing from tables created by older versions
    crate::db::table_schemas::sync_all_table_schemas(pool).await?;

    // Phase 3: data migrations and indexes
    crate::db::migrations::run_migrations(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_moderation_cases_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS moderation_cases (
            id TEXT PRIMARY KEY,
            target_type TEXT NOT NULL
                CHECK (target_type IN ('post', 'comment', 'group', 'user')),
            target_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'open'
                CHECK (status IN ('open', 'reviewing', 'actioned', 'dismissed')),
            risk_score REAL NOT NULL DEFAULT 0,
            reports_count INTEGER NOT NULL DEFAULT 0,
            last_reported_at TEXT,
            assigned_to TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT,
            UNIQUE (target_type, target_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_moderation_reports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS moderation_reports (
            id TEXT PRIMARY KEY,
            target_type TEXT NOT NULL,
            target_id TEXT NOT NULL,
            reason TEXT NOT NULL DEFAULT 'other',
            details TEXT,
            message TEXT,
            status TEXT NOT NULL DEFAULT 'open'
                CHECK (status IN ('open', 'triaged', 'closed', 'dismissed', 'merged')),
            reporter_user_id TEXT,
            reporter_device_id TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_moderation_actions_table(pool: &SqlitePool) -> Result<()> {
    // Append-only: nothing in this workspace issues UPDATE or DELETE on it
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS moderation_actions (
            id TEXT PRIMARY KEY,
            case_id TEXT,
            action TEXT NOT NULL,
            target_type TEXT NOT NULL,
            target_id TEXT NOT NULL,
            reason TEXT,
            note TEXT,
            admin_user_id TEXT,
            admin_actor TEXT,
            metadata TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_blocked_devices_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blocked_devices (
            device_id TEXT PRIMARY KEY,
            blocked_until TEXT,
            reason TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_community_posts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS community_posts (
            id TEXT PRIMARY KEY,
            author_name TEXT,
            author_device_id TEXT,
            content TEXT NOT NULL DEFAULT '',
            group_id TEXT,
            visibility TEXT NOT NULL DEFAULT 'public',
            moderation_status TEXT NOT NULL DEFAULT 'clean',
            reported_count INTEGER NOT NULL DEFAULT 0,
            deleted_at TEXT,
            deleted_by TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_community_comments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS community_comments (
            id TEXT PRIMARY KEY,
            post_id TEXT,
            author_name TEXT,
            author_device_id TEXT,
            content TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_community_groups_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS community_groups (
            id TEXT PRIMARY KEY,
            name TEXT,
            description TEXT,
            created_by_name TEXT,
            created_by_device_id TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
