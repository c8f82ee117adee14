//! Event records — what a logging collaborator stores per pipeline run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event name written after every workflow generation attempt.
pub const WORKFLOW_GENERATED: &str = "workflow_generated";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,

    pub timestamp: DateTime<Utc>,

    /// Event name, e.g. `workflow_generated`.
    pub event_type: String,

    /// Free-form structured payload.
    pub event_data: serde_json::Value,

    /// The user's raw input, when the event has one.
    #[serde(default)]
    pub user_message: Option<String>,
}

impl EventRecord {
    pub fn new(event_type: impl Into<String>, event_data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type: event_type.into(),
            event_data,
            user_message: None,
        }
    }

    pub fn with_user_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = Some(message.into());
        self
    }
}
