//! LLM client — the text-generation capability behind the graph generator.
//!
//! `CompletionClient` is the seam the compiler depends on. `HttpCompletionClient`
//! talks to OpenAI-compatible chat completions (OpenAI, OpenRouter), Bedrock
//! bearer-token invoke, or a local Ollama server over one shared `reqwest::Client`.

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LOCAL_ENDPOINT: &str = "http://localhost:11434";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("request timed out after {0} ms")]
    Timeout(u64),
    #[error("{provider} API error (HTTP {status}): {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("response parse failed: {0}")]
    Decode(String),
}

impl LlmError {
    /// Failures worth a second attempt: the request may never have reached the model.
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Transport(_) | LlmError::Timeout(_))
    }
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one system instruction plus one user message and return the raw reply text.
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

// ============================================================
// Configuration
// ============================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAiCompatible { base_url: String, api_key: String },
    BedrockApiKey { api_key: String, region: String },
    Local { endpoint: String },
}

impl LlmProvider {
    /// Pick a provider from environment variables, first match wins.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(api_key) = var("OPENROUTER_API_KEY") {
            return Self::OpenAiCompatible {
                base_url: OPENROUTER_BASE_URL.into(),
                api_key,
            };
        }

        if let Some(api_key) = var("OPENAI_API_KEY") {
            let base_url = var("OPENAI_BASE_URL").unwrap_or_else(|| OPENAI_BASE_URL.into());
            return Self::OpenAiCompatible { base_url, api_key };
        }

        if let Some(api_key) = var("AWS_BEARER_TOKEN_BEDROCK") {
            let region = var("AWS_REGION").unwrap_or_else(|| "us-east-1".into());
            return Self::BedrockApiKey { api_key, region };
        }

        let endpoint = var("LOCAL_LLM_ENDPOINT").unwrap_or_else(|| DEFAULT_LOCAL_ENDPOINT.into());
        Self::Local { endpoint }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::OpenAiCompatible { base_url, .. } if base_url.contains("openrouter") => {
                "openrouter"
            }
            LlmProvider::OpenAiCompatible { .. } => "openai",
            LlmProvider::BedrockApiKey { .. } => "bedrock",
            LlmProvider::Local { .. } => "local",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self.name() {
            "openrouter" => "deepseek/deepseek-chat",
            "openai" => "gpt-4o",
            "bedrock" => "anthropic.claude-3-5-sonnet-20240620-v1:0",
            _ => "llama3.2",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model_id: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Local {
                endpoint: DEFAULT_LOCAL_ENDPOINT.into(),
            },
            model_id: "llama3.2".into(),
            temperature: 0.2,
            max_tokens: 2048,
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Provider by env priority; `AGENTFLOW_MODEL` overrides the provider's default model.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let provider = LlmProvider::from_lookup(&lookup);
        let model_id = lookup("AGENTFLOW_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| provider.default_model().to_string());
        Self {
            provider,
            model_id,
            ..Self::default()
        }
    }
}

// ============================================================
// HTTP client
// ============================================================

pub struct HttpCompletionClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl HttpCompletionClient {
    pub fn new(http: reqwest::Client, config: LlmConfig) -> Self {
        Self { http, config }
    }

    pub fn from_env() -> Self {
        Self::new(reqwest::Client::new(), LlmConfig::from_env())
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        match &self.config.provider {
            LlmProvider::OpenAiCompatible { base_url, .. } => {
                format!("{}/chat/completions", base_url.trim_end_matches('/'))
            }
            LlmProvider::BedrockApiKey { region, .. } => format!(
                "https://bedrock-runtime.{}.amazonaws.com/model/{}/invoke",
                region,
                urlencoding::encode(&self.config.model_id)
            ),
            LlmProvider::Local { endpoint } => {
                format!("{}/api/generate", endpoint.trim_end_matches('/'))
            }
        }
    }

    fn request_body(&self, system: &str, user: &str) -> Value {
        let cfg = &self.config;
        match &cfg.provider {
            LlmProvider::OpenAiCompatible { .. } => json!({
                "model": cfg.model_id,
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": user}
                ],
                "max_tokens": cfg.max_tokens,
                "temperature": cfg.temperature,
                "response_format": {"type": "json_object"}
            }),
            LlmProvider::BedrockApiKey { .. } => json!({
                "anthropic_version": "bedrock-2023-05-31",
                "max_tokens": cfg.max_tokens,
                "temperature": cfg.temperature,
                "system": system,
                "messages": [{"role": "user", "content": user}]
            }),
            LlmProvider::Local { .. } => json!({
                "model": cfg.model_id,
                "prompt": user,
                "system": system,
                "stream": false,
                "format": "json",
                "options": {
                    "num_predict": cfg.max_tokens,
                    "temperature": cfg.temperature
                }
            }),
        }
    }
}

/// Pull the completion text out of a provider response body.
fn completion_text(provider: &LlmProvider, body: &Value) -> Option<String> {
    let text = match provider {
        LlmProvider::OpenAiCompatible { .. } => body["choices"][0]["message"]["content"].as_str(),
        LlmProvider::BedrockApiKey { .. } => body["content"][0]["text"].as_str(),
        LlmProvider::Local { .. } => body["response"].as_str(),
    };
    text.map(str::to_string)
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let provider = &self.config.provider;
        let mut request = self
            .http
            .post(self.endpoint())
            .header("Accept", "application/json")
            .json(&self.request_body(system, user));

        match provider {
            LlmProvider::OpenAiCompatible { api_key, .. }
            | LlmProvider::BedrockApiKey { api_key, .. } => {
                request = request.bearer_auth(api_key);
            }
            LlmProvider::Local { .. } => {}
        }

        tracing::debug!(provider = provider.name(), model = %self.config.model_id, "sending completion request");

        let response = request
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                provider: provider.name(),
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        completion_text(provider, &body)
            .ok_or_else(|| LlmError::Decode("response carried no completion text".into()))
    }
}
