//! Moderation operations
//!
//! Each operation takes the pool and (for writes) the acting admin, and
//! returns `icc_common::Result`. HTTP concerns stay in `crate::api`.

pub mod actions;
pub mod assign;
pub mod audit;
pub mod case;
pub mod preview;
pub mod queue;
pub mod reports;
pub mod stats;
pub mod types;

pub use actions::{apply_action, ActionOutcome, ActionRequest};
pub use assign::assign_case;
pub use audit::{list_audit, AuditFilter};
pub use case::fetch_case_detail;
pub use queue::{fetch_queue, QueueOptions, QueueSort, StatusFilter};
pub use reports::{
    set_report_status, submit_report, NewReport, ReportReceipt, ReportResolution,
    ReportStatusOutcome,
};
pub use stats::{fetch_stats, ModerationStats};
pub use types::{ActionKind, AuditEntry, CaseDetail, CaseStatus, Preview, QueueItem, TargetType};
