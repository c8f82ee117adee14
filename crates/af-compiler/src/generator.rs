//! Graph generator — ask the LLM for `{summary, workflow}` and parse it strictly.

use crate::llm::CompletionClient;
use crate::retry::{self, RetryPolicy};
use crate::CompilerError;
use af_core::graph::AutomationGraph;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Used when the reply omits `summary`.
pub const FALLBACK_SUMMARY: &str = "Sorry, I couldn't generate a summary.";

// ============================================================
// System Prompt for Workflow Generation
// ============================================================

pub const SYSTEM_PROMPT: &str = r#"You are an expert automation workflow builder. Convert the user's plain-text request into a single JSON object.

The object MUST have exactly two keys: "summary" and "workflow".

## "summary"
A short list of strings confirming your understanding, one line per step, e.g.
["Trigger: When a new Jotform is submitted.", "Action: Send a WhatsApp message."]

## "workflow"
An n8n-compatible object with "nodes" and "connections".
1. Identify the trigger that starts the workflow.
2. Identify every action that follows.
3. Map each to a node type from the list below.
4. Extract each node's parameters from the request.
5. Connect the nodes by name.

## Supported Node Types (strict)
Trigger nodes:
- n8n-nodes-base.jotformTrigger
- n8n-nodes-base.scheduleTrigger   parameters: cronExpression
- n8n-nodes-base.webhookTrigger
- n8n-nodes-base.crmTrigger
- n8n-nodes-base.emailTrigger
Action nodes:
- n8n-nodes-base.whatsApp          parameters: phoneNumber, message
- n8n-nodes-base.sendEmail         parameters: recipient, subject, body
- n8n-nodes-base.googleSheets      parameters: spreadsheet, operation
- n8n-nodes-base.httpRequest       parameters: url, method
- n8n-nodes-base.slack             parameters: channel, message
- n8n-nodes-base.crm               parameters: operation
- n8n-nodes-base.telegram          parameters: chatId, message
- n8n-nodes-base.function          parameters: code
- n8n-nodes-base.wait              parameters: duration

## Example
{
  "summary": ["Trigger: When a new Jotform is submitted.", "Action: Send a WhatsApp message."],
  "workflow": {
    "nodes": [
      {"name": "Jotform Trigger", "type": "n8n-nodes-base.jotformTrigger", "parameters": {}, "position": [0, 100]},
      {"name": "Send WhatsApp", "type": "n8n-nodes-base.whatsApp", "parameters": {"phoneNumber": "[PHONE_NUMBER]", "message": "New form submission!"}, "position": [250, 100]}
    ],
    "connections": [
      {"source": "Jotform Trigger", "target": "Send WhatsApp"}
    ]
  }
}

## Rules
1. Return ONLY the JSON object: no prose, no markdown code fences.
2. Node names must be unique; every connection must use existing node names.
3. Every workflow has at least one trigger node.
4. When a required value is not in the request, use a bracketed placeholder:
   [PHONE_NUMBER], [EMAIL], [CHANNEL], [CHAT_ID], [CRON_EXPRESSION].
5. cronExpression is a 5-field schedule "minute hour day month weekday", e.g. "0 9 * * *".
   If no time is given, use "0 9 * * *".
"#;

// ============================================================
// Response parsing
// ============================================================

#[derive(Debug)]
pub struct Generated {
    pub summary: Vec<String>,
    pub graph: AutomationGraph,
}

#[derive(Deserialize)]
struct RawResponse {
    /// Kept loose: a malformed summary degrades to the fallback line.
    #[serde(default)]
    summary: Option<Value>,
    workflow: AutomationGraph,
}

/// Remove a surrounding markdown fence (and any prose around it) from a reply.
pub fn strip_fences(response: &str) -> &str {
    let trimmed = response.trim();
    if trimmed.starts_with('{') {
        return trimmed.strip_suffix("```").unwrap_or(trimmed).trim_end();
    }
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after = &trimmed[start + 3..];
    let after = after
        .strip_prefix("json")
        .or_else(|| after.strip_prefix("JSON"))
        .unwrap_or(after);
    let body = match after.find("```") {
        Some(end) => &after[..end],
        None => after,
    };
    body.trim()
}

/// Parse an LLM reply into a typed summary and graph.
pub fn parse_response(response: &str) -> Result<Generated, CompilerError> {
    let json = strip_fences(response);

    let raw: RawResponse = serde_json::from_str(json).map_err(|e| {
        tracing::warn!("LLM did not return the expected JSON structure: {e}");
        tracing::debug!("raw response: {}", preview(response, 500));
        CompilerError::Generation(format!("LLM did not return the expected JSON structure: {e}"))
    })?;

    if raw.workflow.nodes.is_empty() {
        return Err(CompilerError::Generation(
            "LLM failed to generate valid workflow nodes".into(),
        ));
    }

    let summary = summary_lines(raw.summary).unwrap_or_else(|| {
        tracing::debug!("summary missing or malformed, using fallback");
        vec![FALLBACK_SUMMARY.to_string()]
    });

    Ok(Generated {
        summary,
        graph: raw.workflow,
    })
}

/// A non-empty string or a non-empty list of strings; anything else is `None`.
fn summary_lines(summary: Option<Value>) -> Option<Vec<String>> {
    match summary? {
        Value::String(line) if !line.trim().is_empty() => Some(vec![line]),
        Value::Array(items) if !items.is_empty() => items
            .into_iter()
            .map(|item| match item {
                Value::String(line) => Some(line),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

/// Longest prefix of `s` within `max` bytes that ends on a char boundary.
pub(crate) fn preview(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let end = (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0);
    &s[..end]
}

// ============================================================
// Generator
// ============================================================

pub struct Generator {
    client: Arc<dyn CompletionClient>,
    retry: RetryPolicy,
}

impl Generator {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// One bounded LLM call (plus at most the policy's retries), then strict parsing.
    pub async fn generate(&self, request: &str) -> Result<Generated, CompilerError> {
        tracing::info!("Sending request to LLM for summary and workflow generation");
        let response = retry::call_with_retry(&self.retry, || {
            self.client.complete(SYSTEM_PROMPT, request)
        })
        .await?;

        tracing::debug!("LLM response: {}", preview(&response, 500));

        let generated = parse_response(&response)?;
        tracing::info!(
            nodes = generated.graph.nodes.len(),
            connections = generated.graph.connections.len(),
            "parsed summary and workflow"
        );
        Ok(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_core::graph::NodeType;

    const REPLY: &str = r#"{
        "summary": ["Trigger: Jotform submitted.", "Action: WhatsApp."],
        "workflow": {
            "nodes": [
                {"name": "Jotform Trigger", "type": "n8n-nodes-base.jotformTrigger", "parameters": {}, "position": [0, 100]},
                {"name": "Send WhatsApp", "type": "n8n-nodes-base.whatsApp", "parameters": {"phoneNumber": "[PHONE_NUMBER]"}, "position": [250, 100]}
            ],
            "connections": [{"source": "Jotform Trigger", "target": "Send WhatsApp"}]
        }
    }"#;

    #[test]
    fn test_parse_simple_workflow() {
        let generated = parse_response(REPLY).expect("Should parse");
        assert_eq!(generated.summary.len(), 2);
        assert_eq!(generated.graph.nodes.len(), 2);
        assert_eq!(generated.graph.nodes[1].node_type, NodeType::WhatsApp);
        assert_eq!(generated.graph.connections.len(), 1);
    }

    #[test]
    fn test_parse_with_markdown() {
        let fenced = format!("```json\n{REPLY}\n```");
        assert_eq!(parse_response(&fenced).unwrap().graph.nodes.len(), 2);

        let wrapped = format!("Here is the workflow:\n\n```\n{REPLY}\n```\nThis workflow does...");
        assert_eq!(parse_response(&wrapped).unwrap().graph.nodes.len(), 2);
    }

    #[test]
    fn trailing_fence_only() {
        let reply = format!("{REPLY}\n```");
        assert_eq!(parse_response(&reply).unwrap().graph.nodes.len(), 2);
        assert_eq!(strip_fences("{\"a\": 1}```"), "{\"a\": 1}");
    }

    #[test]
    fn single_line_fence() {
        assert_eq!(strip_fences("```json{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn missing_summary_falls_back() {
        let reply = r#"{"workflow": {"nodes": [{"name": "Hook", "type": "webhookTrigger"}]}}"#;
        let generated = parse_response(reply).unwrap();
        assert_eq!(generated.summary, vec![FALLBACK_SUMMARY.to_string()]);
    }

    #[test]
    fn string_summary_is_accepted() {
        let reply = r#"{"summary": "Posts to Slack hourly.", "workflow": {"nodes": [{"name": "Hourly", "type": "scheduleTrigger"}]}}"#;
        assert_eq!(parse_response(reply).unwrap().summary, vec!["Posts to Slack hourly."]);
    }

    #[test]
    fn malformed_summary_falls_back_but_keeps_graph() {
        for summary in [r#"[{"step": "Trigger"}]"#, "42", r#"["ok", 3]"#, "[]", r#""""#] {
            let reply = format!(
                r#"{{"summary": {summary}, "workflow": {{"nodes": [{{"name": "Hook", "type": "webhookTrigger"}}]}}}}"#
            );
            let generated = parse_response(&reply).unwrap();
            assert_eq!(generated.summary, vec![FALLBACK_SUMMARY.to_string()], "summary {summary}");
            assert_eq!(generated.graph.nodes.len(), 1);
        }
    }

    #[test]
    fn missing_workflow_is_a_generation_error() {
        let err = parse_response(r#"{"summary": ["ok"]}"#).unwrap_err();
        assert!(matches!(err, CompilerError::Generation(_)));
    }

    #[test]
    fn empty_nodes_is_a_generation_error() {
        let err = parse_response(r#"{"summary": [], "workflow": {"nodes": [], "connections": []}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("valid workflow nodes"));
    }

    #[test]
    fn unknown_node_type_is_a_generation_error() {
        let reply = r#"{"workflow": {"nodes": [{"name": "X", "type": "n8n-nodes-base.discord"}]}}"#;
        assert!(matches!(parse_response(reply), Err(CompilerError::Generation(_))));
    }

    #[test]
    fn prose_is_a_generation_error() {
        assert!(parse_response("I cannot help with that.").is_err());
    }

    #[test]
    fn preview_respects_char_boundaries() {
        assert_eq!(preview("héllo", 2), "h");
        assert_eq!(preview("short", 500), "short");
    }
}
