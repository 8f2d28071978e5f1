//! Declared table schemas
//!
//! Columns here are the ones the moderation service reads or writes. The
//! CREATE TABLE statements in `init.rs` are the authoritative shape for new
//! databases; these declarations exist so older databases gain any column
//! the service relies on.

use crate::db::schema_sync::{ColumnDefinition, SchemaSync, TableSchema};
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

pub struct ModerationCasesSchema;

impl TableSchema for ModerationCasesSchema {
    fn table_name() -> &'static str {
        "moderation_cases"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "TEXT").primary_key(),
            ColumnDefinition::new("target_type", "TEXT").not_null(),
            ColumnDefinition::new("target_id", "TEXT").not_null(),
            ColumnDefinition::new("status", "TEXT")
                .not_null()
                .default("'open'"),
            ColumnDefinition::new("risk_score", "REAL")
                .not_null()
                .default("0"),
            ColumnDefinition::new("reports_count", "INTEGER")
                .not_null()
                .default("0"),
            ColumnDefinition::new("last_reported_at", "TEXT"),
            ColumnDefinition::new("assigned_to", "TEXT"),
            ColumnDefinition::new("created_at", "TEXT")
                .not_null()
                .default("''"),
            ColumnDefinition::new("updated_at", "TEXT"),
        ]
    }
}

pub struct ModerationReportsSchema;

impl TableSchema for ModerationReportsSchema {
    fn table_name() -> &'static str {
        "moderation_reports"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "TEXT").primary_key(),
            ColumnDefinition::new("target_type", "TEXT").not_null(),
            ColumnDefinition::new("target_id", "TEXT").not_null(),
            ColumnDefinition::new("reason", "TEXT")
                .not_null()
                .default("'other'"),
            ColumnDefinition::new("details", "TEXT"),
            ColumnDefinition::new("message", "TEXT"),
            ColumnDefinition::new("status", "TEXT")
                .not_null()
                .default("'open'"),
            ColumnDefinition::new("reporter_user_id", "TEXT"),
            ColumnDefinition::new("reporter_device_id", "TEXT"),
            ColumnDefinition::new("created_at", "TEXT").not_null(),
        ]
    }
}

pub struct ModerationActionsSchema;

impl TableSchema for ModerationActionsSchema {
    fn table_name() -> &'static str {
        "moderation_actions"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "TEXT").primary_key(),
            // Absent from the first audit schema
            ColumnDefinition::new("case_id", "TEXT"),
            ColumnDefinition::new("action", "TEXT").not_null(),
            ColumnDefinition::new("target_type", "TEXT").not_null(),
            ColumnDefinition::new("target_id", "TEXT").not_null(),
            ColumnDefinition::new("reason", "TEXT"),
            ColumnDefinition::new("note", "TEXT"),
            ColumnDefinition::new("admin_user_id", "TEXT"),
            ColumnDefinition::new("admin_actor", "TEXT"),
            ColumnDefinition::new("metadata", "TEXT")
                .not_null()
                .default("'{}'"),
            ColumnDefinition::new("created_at", "TEXT").not_null(),
        ]
    }
}

pub struct BlockedDevicesSchema;

impl TableSchema for BlockedDevicesSchema {
    fn table_name() -> &'static str {
        "blocked_devices"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("device_id", "TEXT").primary_key(),
            ColumnDefinition::new("blocked_until", "TEXT"),
            ColumnDefinition::new("reason", "TEXT"),
            ColumnDefinition::new("created_at", "TEXT")
                .not_null()
                .default("''"),
        ]
    }
}

/// Columns moderation reads from or writes to on posts
pub struct CommunityPostsSchema;

impl TableSchema for CommunityPostsSchema {
    fn table_name() -> &'static str {
        "community_posts"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "TEXT").primary_key(),
            ColumnDefinition::new("author_name", "TEXT"),
            ColumnDefinition::new("author_device_id", "TEXT"),
            ColumnDefinition::new("content", "TEXT"),
            ColumnDefinition::new("visibility", "TEXT")
                .not_null()
                .default("'public'"),
            ColumnDefinition::new("moderation_status", "TEXT")
                .not_null()
                .default("'clean'"),
            ColumnDefinition::new("reported_count", "INTEGER")
                .not_null()
                .default("0"),
            ColumnDefinition::new("deleted_at", "TEXT"),
            ColumnDefinition::new("deleted_by", "TEXT"),
            ColumnDefinition::new("created_at", "TEXT"),
        ]
    }
}

pub struct CommunityCommentsSchema;

impl TableSchema for CommunityCommentsSchema {
    fn table_name() -> &'static str {
        "community_comments"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "TEXT").primary_key(),
            ColumnDefinition::new("post_id", "TEXT"),
            ColumnDefinition::new("author_name", "TEXT"),
            ColumnDefinition::new("author_device_id", "TEXT"),
            ColumnDefinition::new("content", "TEXT"),
            ColumnDefinition::new("created_at", "TEXT"),
        ]
    }
}

pub struct CommunityGroupsSchema;

impl TableSchema for CommunityGroupsSchema {
    fn table_name() -> &'static str {
        "community_groups"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "TEXT").primary_key(),
            ColumnDefinition::new("name", "TEXT"),
            ColumnDefinition::new("description", "TEXT"),
            ColumnDefinition::new("created_by_name", "TEXT"),
            ColumnDefinition::new("created_by_device_id", "TEXT"),
            ColumnDefinition::new("created_at", "TEXT"),
        ]
    }
}

/// Synchronize all declared tables. Returns the number of columns added.
pub async fn sync_all_table_schemas(pool: &SqlitePool) -> Result<usize> {
    let mut added = 0;

    added += SchemaSync::sync_table::<ModerationCasesSchema>(pool).await?;
    added += SchemaSync::sync_table::<ModerationReportsSchema>(pool).await?;
    added += SchemaSync::sync_table::<ModerationActionsSchema>(pool).await?;
    added += SchemaSync::sync_table::<BlockedDevicesSchema>(pool).await?;
    added += SchemaSync::sync_table::<CommunityPostsSchema>(pool).await?;
    added += SchemaSync::sync_table::<CommunityCommentsSchema>(pool).await?;
    added += SchemaSync::sync_table::<CommunityGroupsSchema>(pool).await?;

    if added > 0 {
        info!("Schema sync added {} column(s)", added);
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema_sync::SchemaIntrospector;
    use sqlx::sqlite::SqlitePoolOptions;

    #[test]
    fn test_actions_schema_declares_case_link_and_metadata() {
        let columns = ModerationActionsSchema::expected_columns();
        assert!(columns.iter().any(|c| c.name == "case_id" && !c.not_null));
        assert!(columns
            .iter()
            .any(|c| c.name == "metadata" && c.default_value.as_deref() == Some("'{}'")));
    }

    #[tokio::test]
    async fn test_legacy_posts_table_gains_moderation_columns() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        // Posts table from before moderation existed
        sqlx::query(
            "CREATE TABLE community_posts (id TEXT PRIMARY KEY, author_name TEXT, content TEXT, created_at TEXT)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO community_posts (id, content, created_at) VALUES ('p1', 'hi', '2026-01-01T00:00:00.000Z')")
            .execute(&pool)
            .await
            .unwrap();

        let added = SchemaSync::sync_table::<CommunityPostsSchema>(&pool).await.unwrap();
        assert_eq!(added, 6);

        let columns = SchemaIntrospector::introspect_table(&pool, "community_posts")
            .await
            .unwrap();
        for name in ["visibility", "moderation_status", "deleted_at", "deleted_by"] {
            assert!(columns.iter().any(|c| c.name == name), "missing {}", name);
        }

        let visibility: String =
            sqlx::query_scalar("SELECT visibility FROM community_posts WHERE id = 'p1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(visibility, "public");
    }
}
