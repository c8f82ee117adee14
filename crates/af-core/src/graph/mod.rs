//! Automation graph — n8n-style nodes and the connections between them.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Namespace prefix used by n8n for its built-in node types.
pub const N8N_PREFIX: &str = "n8n-nodes-base.";

// ---------------------------------------------------------------------------
// AutomationGraph — top-level graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutomationGraph {
    /// Nodes in generation order. Names are unique within a graph.
    pub nodes: Vec<Node>,

    /// Directed edges between nodes, referenced by name.
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl AutomationGraph {
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Nodes that start the automation.
    pub fn triggers(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.node_type.is_trigger())
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    /// Free-form parameters interpreted by the node type.
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,

    /// UI-only position hint.
    #[serde(default)]
    pub position: Position,
}

impl Node {
    pub fn new(name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            name: name.into(),
            node_type,
            parameters: Default::default(),
            position: Position::default(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|v| v.as_str())
    }

    /// True when `key` is absent, null, blank, or still a bracketed placeholder.
    pub fn is_unset(&self, key: &str) -> bool {
        match self.parameters.get(key) {
            None | Some(serde_json::Value::Null) => true,
            Some(serde_json::Value::String(s)) => s.trim().is_empty() || is_placeholder(s),
            Some(_) => false,
        }
    }
}

/// A placeholder is a bracketed sentinel such as `[PHONE_NUMBER]`.
pub fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.len() >= 2 && trimmed.starts_with('[') && trimmed.ends_with(']')
}

// ---------------------------------------------------------------------------
// NodeType — closed set of trigger and action types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    JotformTrigger,
    ScheduleTrigger,
    WebhookTrigger,
    CrmTrigger,
    EmailTrigger,
    WhatsApp,
    SendEmail,
    GoogleSheets,
    HttpRequest,
    Slack,
    Crm,
    Telegram,
    Function,
    Wait,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown node type '{0}'")]
pub struct UnknownNodeType(pub String);

impl NodeType {
    pub const ALL: [NodeType; 14] = [
        NodeType::JotformTrigger,
        NodeType::ScheduleTrigger,
        NodeType::WebhookTrigger,
        NodeType::CrmTrigger,
        NodeType::EmailTrigger,
        NodeType::WhatsApp,
        NodeType::SendEmail,
        NodeType::GoogleSheets,
        NodeType::HttpRequest,
        NodeType::Slack,
        NodeType::Crm,
        NodeType::Telegram,
        NodeType::Function,
        NodeType::Wait,
    ];

    /// Bare type name, e.g. `whatsApp`.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::JotformTrigger => "jotformTrigger",
            NodeType::ScheduleTrigger => "scheduleTrigger",
            NodeType::WebhookTrigger => "webhookTrigger",
            NodeType::CrmTrigger => "crmTrigger",
            NodeType::EmailTrigger => "emailTrigger",
            NodeType::WhatsApp => "whatsApp",
            NodeType::SendEmail => "sendEmail",
            NodeType::GoogleSheets => "googleSheets",
            NodeType::HttpRequest => "httpRequest",
            NodeType::Slack => "slack",
            NodeType::Crm => "crm",
            NodeType::Telegram => "telegram",
            NodeType::Function => "function",
            NodeType::Wait => "wait",
        }
    }

    /// Fully qualified n8n identifier, e.g. `n8n-nodes-base.whatsApp`.
    pub fn n8n_type(self) -> String {
        format!("{N8N_PREFIX}{}", self.as_str())
    }

    pub fn is_trigger(self) -> bool {
        match self {
            NodeType::JotformTrigger
            | NodeType::ScheduleTrigger
            | NodeType::WebhookTrigger
            | NodeType::CrmTrigger
            | NodeType::EmailTrigger => true,
            NodeType::WhatsApp
            | NodeType::SendEmail
            | NodeType::GoogleSheets
            | NodeType::HttpRequest
            | NodeType::Slack
            | NodeType::Crm
            | NodeType::Telegram
            | NodeType::Function
            | NodeType::Wait => false,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = UnknownNodeType;

    /// Accepts both the bare name and the `n8n-nodes-base.` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s.trim();
        let bare = bare.strip_prefix(N8N_PREFIX).unwrap_or(bare);
        NodeType::ALL
            .into_iter()
            .find(|t| t.as_str() == bare)
            .ok_or_else(|| UnknownNodeType(s.to_string()))
    }
}

impl Serialize for NodeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.n8n_type())
    }
}

impl<'de> Deserialize<'de> for NodeType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub source: String,
    pub target: String,
}

impl Connection {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Position (UI hint)
// ---------------------------------------------------------------------------

/// Serialized as `[x, y]`; `{"x": .., "y": ..}` is accepted on input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PositionRepr {
    Pair(f64, f64),
    Point { x: f64, y: f64 },
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.x, self.y).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match PositionRepr::deserialize(deserializer)? {
            PositionRepr::Pair(x, y) | PositionRepr::Point { x, y } => Position { x, y },
        })
    }
}

// ---------------------------------------------------------------------------
// ValidationResult
// ---------------------------------------------------------------------------

/// Structural errors block downstream use; warnings are informational.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
