//! Automatic schema synchronization
//!
//! The moderation store has been deployed against databases created by
//! several earlier versions of the community app, some of which lack
//! columns such as `moderation_actions.case_id` or
//! `community_posts.moderation_status`. Instead of probing for those at
//! request time, every table declares its expected columns in code and
//! missing ones are added on startup.
//!
//! Initialization order:
//! 1. **CREATE TABLE IF NOT EXISTS** - create missing tables
//! 2. **Auto-sync** - add missing columns via ALTER TABLE (this module)
//! 3. **Migrations** - data backfills and indexes (`migrations.rs`)
//!
//! # Usage
//!
//! ```rust,ignore
//! pub struct ModerationActionsSchema;
//!
//! impl TableSchema for ModerationActionsSchema {
//!     fn table_name() -> &'static str { "moderation_actions" }
//!
//!     fn expected_columns() -> Vec<ColumnDefinition> {
//!         vec![
//!             ColumnDefinition::new("id", "TEXT").primary_key(),
//!             ColumnDefinition::new("case_id", "TEXT"),
//!             // ...
//!         ]
//!     }
//! }
//!
//! SchemaSync::sync_table::<ModerationActionsSchema>(&pool).await?;
//! ```

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    /// SQL type (e.g., "TEXT", "INTEGER", "REAL")
    pub sql_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    /// DEFAULT expression, verbatim SQL
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            default_value: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// Column as reported by `PRAGMA table_info`
#[derive(Debug, Clone)]
pub struct ActualColumn {
    pub cid: i32,
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub pk: bool,
}

/// Difference between the declared and the actual schema
#[derive(Debug, Clone)]
pub enum SchemaDrift {
    /// Column missing from database (fixable)
    MissingColumn {
        table: String,
        column: ColumnDefinition,
    },
    /// Column type differs (needs a manual migration)
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
    /// Constraint differs (needs table recreation)
    ConstraintMismatch {
        table: String,
        column: String,
        constraint: String,
    },
}

/// Declared schema of one table
pub trait TableSchema {
    fn table_name() -> &'static str;

    /// Expected columns, in creation order
    fn expected_columns() -> Vec<ColumnDefinition>;
}

/// Reads the actual schema
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Columns of `table_name`, ordered by cid
    pub async fn introspect_table(
        pool: &SqlitePool,
        table_name: &str,
    ) -> Result<Vec<ActualColumn>> {
        let query = format!("PRAGMA table_info({})", table_name);
        let rows = sqlx::query(&query).fetch_all(pool).await?;

        let mut columns: Vec<ActualColumn> = rows
            .iter()
            .map(|row| ActualColumn {
                cid: row.get("cid"),
                name: row.get("name"),
                type_name: row.get("type"),
                not_null: row.get::<i32, _>("notnull") != 0,
                default_value: row.get("dflt_value"),
                pk: row.get::<i32, _>("pk") != 0,
            })
            .collect();

        columns.sort_by_key(|c| c.cid);

        Ok(columns)
    }

    pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM sqlite_master
                WHERE type='table' AND name = ?
            )
            "#,
        )
        .bind(table_name)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}

/// Declared-versus-actual comparison
pub struct SchemaDiff;

impl SchemaDiff {
    pub fn compare(
        table_name: &str,
        expected: &[ColumnDefinition],
        actual: &[ActualColumn],
    ) -> Vec<SchemaDrift> {
        let mut drift = Vec::new();

        for expected_col in expected {
            let Some(actual_col) = actual.iter().find(|c| c.name == expected_col.name) else {
                drift.push(SchemaDrift::MissingColumn {
                    table: table_name.to_string(),
                    column: expected_col.clone(),
                });
                continue;
            };

            if !Self::types_compatible(&expected_col.sql_type, &actual_col.type_name) {
                drift.push(SchemaDrift::TypeMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    expected: expected_col.sql_type.clone(),
                    actual: actual_col.type_name.clone(),
                });
            }

            if expected_col.not_null && !actual_col.not_null {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    constraint: "NOT NULL".to_string(),
                });
            }

            if expected_col.primary_key && !actual_col.pk {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    constraint: "PRIMARY KEY".to_string(),
                });
            }
        }

        drift
    }

    /// SQLite type affinity comparison
    fn types_compatible(expected: &str, actual: &str) -> bool {
        let exp = expected.to_uppercase();
        let act = actual.to_uppercase();

        if exp == act {
            return true;
        }

        let integer = |t: &str| t.contains("INT");
        let text = |t: &str| t.contains("TEXT") || t.contains("CHAR") || t.contains("CLOB");
        let real = |t: &str| t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB");
        // Timestamps were TIMESTAMP in the first community schema and TEXT since
        let timestamp = |t: &str| t.contains("TIMESTAMP") || text(t);

        (integer(&exp) && integer(&act))
            || (text(&exp) && text(&act))
            || (real(&exp) && real(&act))
            || (timestamp(&exp) && timestamp(&act))
    }
}

/// Applies fixable drift
pub struct SchemaSync;

impl SchemaSync {
    /// Detect drift for one table and add any missing columns.
    ///
    /// Type and constraint drift is logged, never fixed. Returns the number
    /// of columns added.
    pub async fn sync_table<T: TableSchema>(pool: &SqlitePool) -> Result<usize> {
        let table_name = T::table_name();
        let expected = T::expected_columns();

        if !SchemaIntrospector::table_exists(pool, table_name).await? {
            warn!(
                "Schema sync: table '{}' does not exist (expected CREATE TABLE first)",
                table_name
            );
            return Ok(0);
        }

        let actual = SchemaIntrospector::introspect_table(pool, table_name).await?;
        let drift = SchemaDiff::compare(table_name, &expected, &actual);

        if drift.is_empty() {
            debug!("Schema sync: '{}' up to date", table_name);
            return Ok(0);
        }

        let mut added = 0;
        for change in drift {
            match change {
                SchemaDrift::MissingColumn { table, column } => {
                    Self::add_column(pool, &table, &column).await?;
                    added += 1;
                }
                SchemaDrift::TypeMismatch {
                    table,
                    column,
                    expected,
                    actual,
                } => {
                    warn!(
                        "Schema sync: type mismatch in {}.{}: expected '{}', found '{}'",
                        table, column, expected, actual
                    );
                }
                SchemaDrift::ConstraintMismatch {
                    table,
                    column,
                    constraint,
                } => {
                    warn!(
                        "Schema sync: {}.{} is missing constraint '{}'",
                        table, column, constraint
                    );
                }
            }
        }

        Ok(added)
    }

    /// ALTER TABLE ADD COLUMN, within SQLite's limits
    async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<()> {
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            table, column.name, column.sql_type
        );

        // SQLite cannot add PRIMARY KEY columns, and NOT NULL only with a
        // DEFAULT
        if column.primary_key {
            warn!(
                "Schema sync: adding {}.{} without PRIMARY KEY (needs table recreation)",
                table, column.name
            );
        }

        match (&column.default_value, column.not_null) {
            (Some(default), true) => sql.push_str(&format!(" NOT NULL DEFAULT {}", default)),
            (Some(default), false) => sql.push_str(&format!(" DEFAULT {}", default)),
            (None, true) => warn!(
                "Schema sync: {}.{} added as nullable (NOT NULL requires a DEFAULT)",
                table, column.name
            ),
            (None, false) => {}
        }

        info!(
            "Schema sync: adding column {}.{} ({})",
            table, column.name, column.sql_type
        );

        match sqlx::query(&sql).execute(pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
                // Another instance got there first
                info!("Schema sync: {}.{} already present", table, column.name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    struct LegacyActionsSchema;

    impl TableSchema for LegacyActionsSchema {
        fn table_name() -> &'static str {
            "legacy_actions"
        }

        fn expected_columns() -> Vec<ColumnDefinition> {
            vec![
                ColumnDefinition::new("id", "TEXT").primary_key(),
                ColumnDefinition::new("action", "TEXT").not_null(),
                ColumnDefinition::new("case_id", "TEXT"),
                ColumnDefinition::new("metadata", "TEXT")
                    .not_null()
                    .default("'{}'"),
            ]
        }
    }

    #[test]
    fn test_column_definition_builder() {
        let col = ColumnDefinition::new("status", "TEXT")
            .not_null()
            .default("'open'");

        assert_eq!(col.name, "status");
        assert_eq!(col.sql_type, "TEXT");
        assert!(col.not_null);
        assert!(!col.primary_key);
        assert_eq!(col.default_value, Some("'open'".to_string()));
    }

    #[test]
    fn test_types_compatible() {
        assert!(SchemaDiff::types_compatible("TEXT", "TEXT"));
        assert!(SchemaDiff::types_compatible("text", "TEXT"));
        assert!(SchemaDiff::types_compatible("INTEGER", "INT"));
        assert!(SchemaDiff::types_compatible("TEXT", "VARCHAR(64)"));
        assert!(SchemaDiff::types_compatible("REAL", "DOUBLE PRECISION"));
        assert!(SchemaDiff::types_compatible("TEXT", "TIMESTAMP"));

        assert!(!SchemaDiff::types_compatible("TEXT", "INTEGER"));
        assert!(!SchemaDiff::types_compatible("REAL", "TEXT"));
    }

    #[tokio::test]
    async fn test_introspect_table() {
        let pool = setup_test_db().await;
        sqlx::query("CREATE TABLE t (id TEXT PRIMARY KEY, score REAL NOT NULL, note TEXT)")
            .execute(&pool)
            .await
            .unwrap();

        let columns = SchemaIntrospector::introspect_table(&pool, "t").await.unwrap();

        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name, "id");
        assert!(columns[0].pk);
        assert_eq!(columns[1].type_name, "REAL");
        assert!(columns[1].not_null);
        assert!(!columns[2].not_null);
    }

    #[tokio::test]
    async fn test_detect_missing_and_mismatched_columns() {
        let pool = setup_test_db().await;
        sqlx::query("CREATE TABLE legacy_actions (id TEXT PRIMARY KEY, action INTEGER NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();

        let actual = SchemaIntrospector::introspect_table(&pool, "legacy_actions")
            .await
            .unwrap();
        let drift = SchemaDiff::compare(
            "legacy_actions",
            &LegacyActionsSchema::expected_columns(),
            &actual,
        );

        let missing: Vec<&str> = drift
            .iter()
            .filter_map(|d| match d {
                SchemaDrift::MissingColumn { column, .. } => Some(column.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(missing, vec!["case_id", "metadata"]);

        assert!(drift.iter().any(|d| matches!(
            d,
            SchemaDrift::TypeMismatch { column, .. } if column == "action"
        )));
    }

    #[tokio::test]
    async fn test_sync_adds_missing_columns_and_is_idempotent() {
        let pool = setup_test_db().await;
        sqlx::query("CREATE TABLE legacy_actions (id TEXT PRIMARY KEY, action TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO legacy_actions (id, action) VALUES ('a1', 'hide')")
            .execute(&pool)
            .await
            .unwrap();

        let added = SchemaSync::sync_table::<LegacyActionsSchema>(&pool).await.unwrap();
        assert_eq!(added, 2);

        // Existing rows pick up the default
        let metadata: String =
            sqlx::query_scalar("SELECT metadata FROM legacy_actions WHERE id = 'a1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(metadata, "{}");

        let added_again = SchemaSync::sync_table::<LegacyActionsSchema>(&pool).await.unwrap();
        assert_eq!(added_again, 0);
    }

    #[tokio::test]
    async fn test_sync_skips_missing_table() {
        let pool = setup_test_db().await;
        let added = SchemaSync::sync_table::<LegacyActionsSchema>(&pool).await.unwrap();
        assert_eq!(added, 0);
        assert!(!SchemaIntrospector::table_exists(&pool, "legacy_actions")
            .await
            .unwrap());
    }
}
