//! Moderation domain types
//!
//! Enums are stored in the database as their snake_case names and cross the
//! HTTP boundary the same way.

use icc_common::db::models::{ActionRow, ReportRow};
use icc_common::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of content a case is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Post,
    Comment,
    Group,
    User,
}

impl TargetType {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetType::Post => "post",
            TargetType::Comment => "comment",
            TargetType::Group => "group",
            TargetType::User => "user",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "post" => Ok(TargetType::Post),
            "comment" => Ok(TargetType::Comment),
            "group" => Ok(TargetType::Group),
            "user" => Ok(TargetType::User),
            _ => Err(Error::InvalidInput("Invalid targetType.".to_string())),
        }
    }
}

/// Case lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    Reviewing,
    Actioned,
    Dismissed,
}

impl CaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CaseStatus::Open => "open",
            CaseStatus::Reviewing => "reviewing",
            CaseStatus::Actioned => "actioned",
            CaseStatus::Dismissed => "dismissed",
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(CaseStatus::Open),
            "reviewing" => Ok(CaseStatus::Reviewing),
            "actioned" => Ok(CaseStatus::Actioned),
            "dismissed" => Ok(CaseStatus::Dismissed),
            other => Err(Error::InvalidInput(format!("Invalid status: {}", other))),
        }
    }
}

/// Admin decision applied through the action endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Hide,
    Unhide,
    Remove,
    Dismiss,
    Warn,
    SuspendDevice,
    BanDevice,
    BanUser,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Hide => "hide",
            ActionKind::Unhide => "unhide",
            ActionKind::Remove => "remove",
            ActionKind::Dismiss => "dismiss",
            ActionKind::Warn => "warn",
            ActionKind::SuspendDevice => "suspend_device",
            ActionKind::BanDevice => "ban_device",
            ActionKind::BanUser => "ban_user",
        }
    }

    /// Whether the action changes a post's visibility
    pub fn is_visibility_change(self) -> bool {
        matches!(self, ActionKind::Hide | ActionKind::Unhide | ActionKind::Remove)
    }

    /// Whether the action writes a `blocked_devices` record
    pub fn is_device_block(self) -> bool {
        matches!(self, ActionKind::SuspendDevice | ActionKind::BanDevice)
    }

    /// Case status after the action has been applied
    pub fn resulting_case_status(self) -> CaseStatus {
        match self {
            ActionKind::Dismiss => CaseStatus::Dismissed,
            ActionKind::Unhide => CaseStatus::Open,
            _ => CaseStatus::Actioned,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "hide" => Ok(ActionKind::Hide),
            "unhide" => Ok(ActionKind::Unhide),
            "remove" => Ok(ActionKind::Remove),
            "dismiss" => Ok(ActionKind::Dismiss),
            "warn" => Ok(ActionKind::Warn),
            "suspend_device" => Ok(ActionKind::SuspendDevice),
            "ban_device" => Ok(ActionKind::BanDevice),
            "ban_user" => Ok(ActionKind::BanUser),
            _ => Err(Error::InvalidInput("Invalid action.".to_string())),
        }
    }
}

/// Content preview shown next to a case
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    pub title: String,
    pub subtitle: String,
    pub content: String,
    pub author_name: Option<String>,
    pub author_device_id: Option<String>,
    pub created_at: Option<String>,
    pub visibility: Option<String>,
    pub moderation_status: Option<String>,
}

impl Preview {
    /// Stand-in when the target row cannot be read
    pub fn placeholder(target_type: TargetType, target_id: &str) -> Self {
        Self {
            title: format!("{} {}", target_type, icc_common::uuid_utils::short(target_id, 8)),
            subtitle: target_type.to_string(),
            content: String::new(),
            author_name: None,
            author_device_id: None,
            created_at: None,
            visibility: None,
            moderation_status: None,
        }
    }
}

/// Case as listed in the queue
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub status: CaseStatus,
    pub risk_score: f64,
    pub reports_count: i64,
    pub last_reported_at: Option<String>,
    pub assigned_to: Option<String>,
    pub updated_at: Option<String>,
    pub preview: Preview,
}

/// Report as shown in case detail
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseReport {
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

impl From<ReportRow> for CaseReport {
    fn from(row: ReportRow) -> Self {
        Self {
            id: row.id,
            target_type: row.target_type,
            target_id: row.target_id,
            reason: row.reason,
            details: row.details,
            message: row.message,
            status: row.status,
            reporter_user_id: row.reporter_user_id,
            reporter_device_id: row.reporter_device_id,
            created_at: row.created_at,
        }
    }
}

/// Audit log entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub case_id: Option<String>,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    pub reason: Option<String>,
    pub note: Option<String>,
    pub admin_user_id: Option<String>,
    pub admin_actor: Option<String>,
    pub created_at: String,
    pub metadata: serde_json::Value,
}

impl From<ActionRow> for AuditEntry {
    fn from(row: ActionRow) -> Self {
        // Rows written by other tools may hold anything here
        let metadata = row
            .metadata
            .as_deref()
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
            .filter(|value| value.is_object())
            .unwrap_or_else(|| serde_json::json!({}));

        Self {
            id: row.id,
            case_id: row.case_id,
            action: row.action,
            target_type: row.target_type,
            target_id: row.target_id,
            reason: row.reason,
            note: row.note,
            admin_user_id: row.admin_user_id,
            admin_actor: row.admin_actor,
            created_at: row.created_at,
            metadata,
        }
    }
}

/// Case with its reports and audit trail, newest first
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDetail {
    pub item: QueueItem,
    pub reports: Vec<CaseReport>,
    pub actions: Vec<AuditEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kind_parses_wire_names() {
        assert_eq!("suspend_device".parse::<ActionKind>().unwrap(), ActionKind::SuspendDevice);
        assert_eq!(" hide ".parse::<ActionKind>().unwrap(), ActionKind::Hide);
        assert!("assign".parse::<ActionKind>().is_err());
        assert!("HIDE".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_resulting_case_status() {
        assert_eq!(ActionKind::Dismiss.resulting_case_status(), CaseStatus::Dismissed);
        assert_eq!(ActionKind::Unhide.resulting_case_status(), CaseStatus::Open);
        assert_eq!(ActionKind::Remove.resulting_case_status(), CaseStatus::Actioned);
        assert_eq!(ActionKind::Warn.resulting_case_status(), CaseStatus::Actioned);
    }

    #[test]
    fn test_target_type_rejects_unknown() {
        let err = "story".parse::<TargetType>().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_placeholder_preview_truncates_id() {
        let preview = Preview::placeholder(TargetType::Comment, "0123456789abcdef");
        assert_eq!(preview.title, "comment 01234567");
        assert_eq!(preview.subtitle, "comment");
        assert!(preview.content.is_empty());
    }

    #[test]
    fn test_audit_entry_metadata_falls_back_to_object() {
        let row = ActionRow {
            id: "a1".to_string(),
            case_id: None,
            action: "hide".to_string(),
            target_type: "post".to_string(),
            target_id: "p1".to_string(),
            reason: None,
            note: None,
            admin_user_id: None,
            admin_actor: None,
            metadata: Some("not json".to_string()),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        let entry = AuditEntry::from(row);
        assert_eq!(entry.metadata, serde_json::json!({}));
    }

    #[test]
    fn test_queue_item_serializes_camel_case() {
        let item = QueueItem {
            id: "c1".to_string(),
            target_type: TargetType::Post,
            target_id: "p1".to_string(),
            status: CaseStatus::Open,
            risk_score: 3.0,
            reports_count: 2,
            last_reported_at: None,
            assigned_to: None,
            updated_at: None,
            preview: Preview::placeholder(TargetType::Post, "p1"),
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["targetType"], "post");
        assert_eq!(value["reportsCount"], 2);
        assert_eq!(value["preview"]["title"], "post p1");
    }
}
