//! Graph validator — structural integrity and parameter completeness.
//!
//! Errors mark a graph unsafe to hand to an executor; warnings mark one that
//! will run but may misbehave. Every rule is checked; only an empty graph
//! short-circuits.

use crate::schedule;
use af_core::graph::{AutomationGraph, NodeType, ValidationResult};
use std::collections::HashSet;

/// Check a graph. Never fails; findings are reported in the result.
pub fn validate(graph: &AutomationGraph) -> ValidationResult {
    let mut report = ValidationResult::default();

    if graph.nodes.is_empty() {
        report.error("No nodes found in workflow");
        return report;
    }

    if graph.connections.is_empty() {
        report.warn("Workflow has no connections; its nodes are isolated");
    }

    if graph.triggers().next().is_none() {
        report.error("Workflow must have at least one trigger node");
    }

    let mut names = HashSet::new();
    let mut duplicates = Vec::new();
    for node in &graph.nodes {
        if !names.insert(node.name.as_str()) && !duplicates.contains(&node.name.as_str()) {
            duplicates.push(node.name.as_str());
        }
    }
    for name in duplicates {
        report.error(format!("Duplicate node name '{name}'"));
    }

    for conn in &graph.connections {
        if !names.contains(conn.source.as_str()) {
            report.error(format!(
                "Connection source '{}' does not match any node",
                conn.source
            ));
        }
        if !names.contains(conn.target.as_str()) {
            report.error(format!(
                "Connection target '{}' does not match any node",
                conn.target
            ));
        }
    }

    for node in &graph.nodes {
        if let Some((key, label)) = required_parameter(node.node_type) {
            if node.is_unset(key) {
                report.warn(format!("{label} node '{}' is missing a {key}", node.name));
            }
        }

        if node.node_type == NodeType::ScheduleTrigger {
            if node.is_unset("cronExpression") {
                report.warn(format!(
                    "Schedule trigger '{}' is missing a cronExpression",
                    node.name
                ));
            } else {
                let valid = node
                    .param_str("cronExpression")
                    .is_some_and(schedule::is_schedule_expression);
                if !valid {
                    report.warn(format!(
                        "Schedule trigger '{}' has an invalid cronExpression '{}'",
                        node.name,
                        node.parameters
                            .get("cronExpression")
                            .map(cron_display)
                            .unwrap_or_default()
                    ));
                }
            }
        }
    }

    tracing::debug!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "validated workflow"
    );
    report
}

/// Strings as written, other JSON values in their JSON form.
fn cron_display(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parameter a node type needs before it can deliver anything.
fn required_parameter(node_type: NodeType) -> Option<(&'static str, &'static str)> {
    match node_type {
        NodeType::WhatsApp => Some(("phoneNumber", "WhatsApp")),
        NodeType::SendEmail => Some(("recipient", "Email")),
        NodeType::Telegram => Some(("chatId", "Telegram")),
        NodeType::Slack => Some(("channel", "Slack")),
        NodeType::JotformTrigger
        | NodeType::ScheduleTrigger
        | NodeType::WebhookTrigger
        | NodeType::CrmTrigger
        | NodeType::EmailTrigger
        | NodeType::GoogleSheets
        | NodeType::HttpRequest
        | NodeType::Crm
        | NodeType::Function
        | NodeType::Wait => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_core::prelude::{Connection, Node};

    fn jotform_to_whatsapp() -> AutomationGraph {
        AutomationGraph {
            nodes: vec![
                Node::new("Jotform Trigger", NodeType::JotformTrigger),
                Node::new("Send WhatsApp", NodeType::WhatsApp).with_param("phoneNumber", "+60123456789"),
            ],
            connections: vec![Connection::new("Jotform Trigger", "Send WhatsApp")],
        }
    }

    #[test]
    fn valid_graph_has_no_findings() {
        let report = validate(&jotform_to_whatsapp());
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
        assert!(report.is_valid());
    }

    #[test]
    fn empty_graph_short_circuits() {
        let report = validate(&AutomationGraph::default());
        assert_eq!(report.errors, vec!["No nodes found in workflow"]);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn dangling_connection_names_the_endpoint() {
        let mut graph = jotform_to_whatsapp();
        graph.connections.push(Connection::new("Send WhatsApp", "Log to Sheet"));

        let report = validate(&graph);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("Log to Sheet"));
    }

    #[test]
    fn missing_trigger_is_an_error() {
        let graph = AutomationGraph {
            nodes: vec![
                Node::new("Mail", NodeType::SendEmail).with_param("recipient", "a@example.com"),
                Node::new("Sheet", NodeType::GoogleSheets),
            ],
            connections: vec![Connection::new("Mail", "Ghost")],
        };

        let report = validate(&graph);
        assert!(report
            .errors
            .contains(&"Workflow must have at least one trigger node".to_string()));
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn no_connections_is_only_a_warning() {
        let mut graph = jotform_to_whatsapp();
        graph.connections.clear();

        let report = validate(&graph);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn missing_contact_parameters_warn() {
        let graph = AutomationGraph {
            nodes: vec![
                Node::new("Hook", NodeType::WebhookTrigger),
                Node::new("WA", NodeType::WhatsApp).with_param("phoneNumber", "[PHONE_NUMBER]"),
                Node::new("Mail", NodeType::SendEmail),
            ],
            connections: vec![Connection::new("Hook", "WA"), Connection::new("Hook", "Mail")],
        };

        let report = validate(&graph);
        assert!(report.is_valid());
        assert_eq!(
            report.warnings,
            vec![
                "WhatsApp node 'WA' is missing a phoneNumber",
                "Email node 'Mail' is missing a recipient",
            ]
        );
    }

    #[test]
    fn duplicate_names_reported_once() {
        let graph = AutomationGraph {
            nodes: vec![
                Node::new("Hook", NodeType::WebhookTrigger),
                Node::new("Step", NodeType::Wait),
                Node::new("Step", NodeType::Wait),
                Node::new("Step", NodeType::Function),
            ],
            connections: vec![Connection::new("Hook", "Step")],
        };

        let report = validate(&graph);
        assert_eq!(report.errors, vec!["Duplicate node name 'Step'"]);
    }

    #[test]
    fn schedule_expression_checked() {
        let graph = AutomationGraph {
            nodes: vec![
                Node::new("Tick", NodeType::ScheduleTrigger).with_param("cronExpression", "every morning"),
                Node::new("Tock", NodeType::ScheduleTrigger),
            ],
            connections: vec![Connection::new("Tick", "Tock")],
        };

        let report = validate(&graph);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings[0].contains("invalid cronExpression"));
        assert!(report.warnings[1].contains("missing a cronExpression"));
    }

    #[test]
    fn non_string_schedule_is_invalid_not_missing() {
        let graph = AutomationGraph {
            nodes: vec![
                Node::new("Tick", NodeType::ScheduleTrigger).with_param("cronExpression", 9),
                Node::new("Mail", NodeType::SendEmail).with_param("recipient", "a@example.com"),
            ],
            connections: vec![Connection::new("Tick", "Mail")],
        };

        let report = validate(&graph);
        assert_eq!(
            report.warnings,
            vec!["Schedule trigger 'Tick' has an invalid cronExpression '9'"]
        );
    }
}
