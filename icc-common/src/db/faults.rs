//! Store fault classification
//!
//! SQLite reports schema problems only through error messages, so these
//! helpers inspect `sqlx::Error::Database` messages:
//! - `no such table: community_posts`
//! - `no such column: case_id`
//! - `table moderation_actions has no column named metadata`
//! - `CHECK constraint failed: status IN (...)`

/// Whether `err` says `table` does not exist
pub fn is_missing_table(err: &sqlx::Error, table: &str) -> bool {
    match database_message(err) {
        Some(message) => message.contains(&format!("no such table: {}", table.to_lowercase())),
        None => false,
    }
}

/// Whether `err` is a CHECK constraint rejection
pub fn is_check_violation(err: &sqlx::Error) -> bool {
    database_message(err)
        .map(|m| m.contains("check constraint failed"))
        .unwrap_or(false)
}

/// Describe a missing table or column, if that is what `err` is
pub fn schema_gap_detail(err: &sqlx::Error) -> Option<String> {
    let message = database_message(err)?;
    if message.contains("no such table")
        || message.contains("no such column")
        || message.contains("has no column named")
    {
        Some(message)
    } else {
        None
    }
}

fn database_message(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => Some(db_err.message().to_lowercase()),
        _ => None,
    }
}
