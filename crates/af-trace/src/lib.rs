//! af-trace: Append-only event log backed by SQLite.

pub mod export;
pub mod store;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("database error: {0}")]
    Database(String),
    #[error("export error: {0}")]
    Export(String),
}
