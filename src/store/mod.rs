//! Persistence layer: agent message logs and profile documents on libSQL.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use traits::{AgentMessageRecord, AgentStore, DEFAULT_RECENT_LIMIT};
