//! HTTP API handlers for icc-mod

pub mod action;
pub mod assign;
pub mod audit;
pub mod auth;
pub mod case;
pub mod health;
pub mod queue;
pub mod reports;
pub mod triage;

pub use action::post_action;
pub use assign::post_assign;
pub use audit::{get_audit, get_stats};
pub use auth::auth_middleware;
pub use case::get_case;
pub use health::health_routes;
pub use queue::get_queue;
pub use reports::post_report;
pub use triage::post_report_status;
