//! Database row models
//!
//! One struct per table projection. Timestamps are store-formatted strings
//! (see [`crate::time`]); JSON columns are kept as raw text and parsed by
//! the caller.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// `moderation_cases` row as read by the queue and case detail
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CaseRow {
    pub id: String,
    pub target_type: String,
    pub target_id: String,
    pub status: String,
    pub risk_score: f64,
    pub reports_count: i64,
    pub last_reported_at: Option<String>,
    pub assigned_to: Option<String>,
    pub updated_at: Option<String>,
}

/// `moderation_reports` row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReportRow {
    pub id: String,
    pub target_type: String,
    pub target_id: String,
    pub reason: String,
    pub details: Option<String>,
    pub message: Option<String>,
    pub status: String,
    pub reporter_user_id: Option<String>,
    pub reporter_device_id: Option<String>,
    pub created_at: String,
}

/// `moderation_actions` row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActionRow {
    pub id: String,
    pub case_id: Option<String>,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    pub reason: Option<String>,
    pub note: Option<String>,
    pub admin_user_id: Option<String>,
    pub admin_actor: Option<String>,
    pub metadata: Option<String>,
    pub created_at: String,
}

/// `community_posts` preview projection
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostRow {
    pub id: String,
    pub author_name: Option<String>,
    pub author_device_id: Option<String>,
    pub content: Option<String>,
    pub created_at: Option<String>,
    pub visibility: Option<String>,
    pub moderation_status: Option<String>,
    pub reported_count: Option<i64>,
}

/// `community_comments` preview projection
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommentRow {
    pub id: String,
    pub post_id: Option<String>,
    pub author_name: Option<String>,
    pub author_device_id: Option<String>,
    pub content: Option<String>,
    pub created_at: Option<String>,
}

/// `community_groups` preview projection
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupRow {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub created_at: Option<String>,
    pub created_by_name: Option<String>,
    pub created_by_device_id: Option<String>,
}

/// `blocked_devices` row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlockedDeviceRow {
    pub device_id: String,
    pub blocked_until: Option<String>,
    pub reason: Option<String>,
    pub created_at: String,
}
