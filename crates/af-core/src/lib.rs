//! af-core: Shared types for agentflow
//!
//! This crate has zero internal crate dependencies and defines the
//! automation graph model used by the compiler, the event log and the CLI.

pub mod event;
pub mod export;
pub mod graph;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::event::EventRecord;
    pub use crate::graph::{AutomationGraph, Connection, Node, NodeType, ValidationResult};
}
