//! # ICC Common Library
//!
//! Shared code for the ICC moderation service and any other service that
//! reads or writes the moderation store:
//! - Database initialization, schema sync and migrations
//! - Row models for the moderation and community tables
//! - Admin key and role helpers
//! - Configuration loading
//! - Time and id utilities

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
