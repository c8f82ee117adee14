//! Graph enhancer — backfill placeholder parameters from values found in the request.

use crate::extractor::{self, digits};
use crate::schedule::{self, DEFAULT_SCHEDULE};
use af_core::graph::{AutomationGraph, Node, NodeType};
use std::collections::VecDeque;

/// Fill unset contact parameters and default schedules. Never fails.
///
/// A value counts as used once it appears in a matching parameter anywhere in
/// the graph, so running the enhancer again on its own output changes nothing.
pub fn enhance(request: &str, mut graph: AutomationGraph) -> AutomationGraph {
    let entities = extractor::extract(request);

    let mut phones = Pool::new(
        entities.phones.iter().map(|p| format_phone(p)).collect(),
        present_values(&graph, &[(NodeType::WhatsApp, "phoneNumber"), (NodeType::Telegram, "chatId")]),
        |v| digits(v),
    );
    let mut emails = Pool::new(
        entities.emails.clone(),
        present_values(&graph, &[(NodeType::SendEmail, "recipient")]),
        |v| v.trim().to_ascii_lowercase(),
    );
    let mut channels = Pool::new(
        entities.channels.iter().map(|c| format!("#{c}")).collect(),
        present_values(&graph, &[(NodeType::Slack, "channel")]),
        |v| v.trim().trim_start_matches('#').to_string(),
    );

    for node in &mut graph.nodes {
        match node.node_type {
            NodeType::WhatsApp => fill(node, "phoneNumber", &mut phones),
            NodeType::Telegram => fill(node, "chatId", &mut phones),
            NodeType::SendEmail => fill(node, "recipient", &mut emails),
            NodeType::Slack => fill(node, "channel", &mut channels),
            NodeType::ScheduleTrigger => {
                let default = node.param_str("cronExpression") == Some(DEFAULT_SCHEDULE);
                if default || node.is_unset("cronExpression") {
                    let cron = schedule::to_schedule(request);
                    tracing::debug!(node = %node.name, %cron, "normalized schedule");
                    node.parameters.insert("cronExpression".into(), cron.into());
                }
            }
            NodeType::JotformTrigger
            | NodeType::WebhookTrigger
            | NodeType::CrmTrigger
            | NodeType::EmailTrigger
            | NodeType::GoogleSheets
            | NodeType::HttpRequest
            | NodeType::Crm
            | NodeType::Function
            | NodeType::Wait => {}
        }
    }

    graph
}

/// `+` followed by digits only.
pub fn format_phone(raw: &str) -> String {
    format!("+{}", digits(raw))
}

fn fill(node: &mut Node, key: &str, pool: &mut Pool) {
    if !node.is_unset(key) {
        return;
    }
    if let Some(value) = pool.next() {
        tracing::debug!(node = %node.name, key, %value, "filled placeholder");
        node.parameters.insert(key.to_string(), value.into());
    }
}

fn present_values(graph: &AutomationGraph, slots: &[(NodeType, &str)]) -> Vec<String> {
    graph
        .nodes
        .iter()
        .flat_map(|node| {
            slots
                .iter()
                .filter(move |(ty, key)| node.node_type == *ty && !node.is_unset(key))
                .filter_map(move |(_, key)| node.param_str(key).map(str::to_string))
        })
        .collect()
}

/// Cursor over extracted values that are not yet used in the graph.
struct Pool {
    values: VecDeque<String>,
}

impl Pool {
    /// Drops one candidate per value already present, compared by `key`.
    fn new(candidates: Vec<String>, present: Vec<String>, key: impl Fn(&str) -> String) -> Self {
        let mut values: VecDeque<String> = candidates.into();
        for used in present {
            let used = key(used.as_str());
            if let Some(pos) = values.iter().position(|v| key(v.as_str()) == used) {
                values.remove(pos);
            }
        }
        Self { values }
    }

    fn next(&mut self) -> Option<String> {
        self.values.pop_front()
    }
}
