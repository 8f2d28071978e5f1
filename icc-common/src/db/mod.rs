//! Moderation store: initialization, schema maintenance and row models

pub mod faults;
pub mod init;
pub mod migrations;
pub mod models;
pub mod schema_sync;
pub mod table_schemas;

pub use init::*;
pub use migrations::*;
pub use models::*;
pub use schema_sync::*;
pub use table_schemas::*;
