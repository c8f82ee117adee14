//! n8n export — serialize an automation graph as a downloadable document.

use crate::graph::AutomationGraph;

/// Default file name offered when a graph is saved to disk.
pub const N8N_FILE_NAME: &str = "workflow.n8n.json";

/// Render the graph as pretty-printed n8n-compatible JSON.
pub fn to_n8n_json(graph: &AutomationGraph) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(graph)
}

/// Load a previously exported graph.
pub fn from_n8n_json(json: &str) -> Result<AutomationGraph, serde_json::Error> {
    serde_json::from_str(json)
}
