//! af-compiler: Prompt → AutomationGraph compiler
//!
//! Pipeline: Generator (LLM) → Enhancer (Extractor + Time Normalizer) → Validator.
//! Only generation failures abort; validator findings travel with the graph.

pub mod enhancer;
pub mod extractor;
pub mod generator;
pub mod llm;
pub mod retry;
pub mod schedule;
pub mod validator;

use af_core::prelude::{AutomationGraph, ValidationResult};
use generator::Generator;
use llm::{CompletionClient, HttpCompletionClient, LlmError};
use retry::RetryPolicy;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Summary shown to the user when generation fails.
pub const RETRY_SUMMARY: &str =
    "I had trouble generating the workflow. Please try rephrasing your request.";

#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("empty automation request")]
    EmptyRequest,
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),
}

/// A successfully generated, enhanced and validated workflow.
#[derive(Debug, Clone)]
pub struct CompiledWorkflow {
    pub summary: Vec<String>,
    pub graph: AutomationGraph,
    pub report: ValidationResult,
}

/// What the caller receives: summary, best-effort graph and findings.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutcome {
    pub request: String,
    pub summary: Vec<String>,
    /// `None` when generation failed.
    pub graph: Option<AutomationGraph>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl WorkflowOutcome {
    pub fn generation_failed(&self) -> bool {
        self.graph.is_none()
    }

    /// Structured data for an event log: request text, node names/types, finding counts.
    pub fn event_payload(&self) -> serde_json::Value {
        let nodes: Vec<_> = self
            .graph
            .iter()
            .flat_map(|g| g.nodes.iter())
            .map(|n| serde_json::json!({"name": n.name, "type": n.node_type.as_str()}))
            .collect();
        serde_json::json!({
            "request": self.request,
            "generated": !self.generation_failed(),
            "nodes": nodes,
            "errors": self.errors.len(),
            "warnings": self.warnings.len(),
        })
    }
}

pub struct Compiler {
    generator: Generator,
}

impl Compiler {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            generator: Generator::new(client),
        }
    }

    /// HTTP client and retry policy configured from the environment.
    pub fn from_env() -> Self {
        let client = HttpCompletionClient::from_env();
        tracing::info!(
            provider = client.config().provider.name(),
            model = %client.config().model_id,
            "configured LLM client"
        );
        Self::new(Arc::new(client)).with_retry(RetryPolicy::from_env())
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.generator = self.generator.with_retry(retry);
        self
    }

    /// Compile a natural-language request into a validated automation graph.
    pub async fn try_compile(&self, request: &str) -> Result<CompiledWorkflow, CompilerError> {
        let request = request.trim();
        if request.is_empty() {
            return Err(CompilerError::EmptyRequest);
        }

        let generated = self.generator.generate(request).await?;
        let graph = enhancer::enhance(request, generated.graph);
        let report = validator::validate(&graph);

        if !report.is_valid() {
            tracing::warn!(errors = report.errors.len(), "generated workflow failed validation");
        }

        Ok(CompiledWorkflow {
            summary: generated.summary,
            graph,
            report,
        })
    }

    /// Caller-facing entry point: never fails, failures are reported in the outcome.
    pub async fn generate_workflow(&self, request: &str) -> WorkflowOutcome {
        match self.try_compile(request).await {
            Ok(compiled) => WorkflowOutcome {
                request: request.to_string(),
                summary: compiled.summary,
                graph: Some(compiled.graph),
                errors: compiled.report.errors,
                warnings: compiled.report.warnings,
            },
            Err(e) => {
                tracing::error!("workflow generation failed: {e}");
                let summary = match e {
                    CompilerError::EmptyRequest => {
                        "Please enter a description of the workflow you want to build."
                    }
                    CompilerError::Generation(_) | CompilerError::Llm(_) => RETRY_SUMMARY,
                };
                WorkflowOutcome {
                    request: request.to_string(),
                    summary: vec![summary.to_string()],
                    graph: None,
                    errors: vec![e.to_string()],
                    warnings: vec![],
                }
            }
        }
    }
}
