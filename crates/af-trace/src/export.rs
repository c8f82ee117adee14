//! Event export — dump stored events as JSON.

use crate::TraceError;
use af_core::event::EventRecord;

/// Export events to a pretty-printed JSON array.
pub fn export_json(events: &[EventRecord]) -> Result<String, TraceError> {
    serde_json::to_string_pretty(events).map_err(|e| TraceError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_array() {
        let events = vec![EventRecord::new("workflow_generated", serde_json::json!({"nodes": 2}))];
        let json = export_json(&events).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["event_type"], "workflow_generated");
        assert_eq!(value[0]["event_data"]["nodes"], 2);
    }
}
