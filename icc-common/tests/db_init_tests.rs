//! Database initialization against real files
//!
//! Covers creation of a new database, reopening an existing one, and
//! upgrading a database created by the community app before moderation
//! columns existed.

use icc_common::db::init::init_database;
use icc_common::db::migrations::get_schema_version;
use icc_common::db::schema_sync::SchemaIntrospector;
use sqlx::sqlite::SqlitePoolOptions;

const TABLES: [&str; 8] = [
    "schema_version",
    "moderation_cases",
    "moderation_reports",
    "moderation_actions",
    "blocked_devices",
    "community_posts",
    "community_comments",
    "community_groups",
];

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("moderation.db");

    let pool = init_database(&db_path).await.expect("init should succeed");
    assert!(db_path.exists(), "Database file was not created");

    for table in TABLES {
        assert!(
            SchemaIntrospector::table_exists(&pool, table).await.unwrap(),
            "missing table {}",
            table
        );
    }
    assert_eq!(get_schema_version(&pool).await.unwrap(), 2);
}

#[tokio::test]
async fn test_database_opens_existing_and_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("moderation.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query(
        "INSERT INTO moderation_cases (id, target_type, target_id, created_at)
         VALUES ('c1', 'post', 'p1', '2026-01-01T00:00:00.000Z')",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.expect("reopen should succeed");
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM moderation_cases")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_legacy_audit_table_is_upgraded() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("moderation.db");

    // Audit table as the first community release created it
    {
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new().connect(&url).await.unwrap();
        sqlx::query(
            "CREATE TABLE moderation_actions (
                id TEXT PRIMARY KEY,
                action TEXT NOT NULL,
                target_type TEXT NOT NULL,
                target_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO moderation_actions (id, action, target_type, target_id, created_at)
             VALUES ('a1', 'hide', 'post', 'p1', '2025-12-01T00:00:00.000Z')",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool.close().await;
    }

    let pool = init_database(&db_path).await.unwrap();
    let columns = SchemaIntrospector::introspect_table(&pool, "moderation_actions")
        .await
        .unwrap();
    for name in ["case_id", "reason", "note", "admin_user_id", "admin_actor", "metadata"] {
        assert!(columns.iter().any(|c| c.name == name), "missing {}", name);
    }

    let (case_id, metadata): (Option<String>, String) =
        sqlx::query_as("SELECT case_id, metadata FROM moderation_actions WHERE id = 'a1'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(case_id.is_none());
    assert_eq!(metadata, "{}");
}
