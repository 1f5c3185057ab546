//! OpenAI-compatible chat completions adapter.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    ChatMessage, Completion, CompletionClient, CompletionConfig, LlmError, LlmResult,
    ResponseMode,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const AUTH_ENV_VAR: &str = "OPENAI_API_KEY";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const ERROR_BODY_CHARS: usize = 320;

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Honor `HTTP(S)_PROXY` from the environment.
    #[serde(default)]
    pub use_system_proxy: bool,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("use_system_proxy", &self.use_system_proxy)
            .finish()
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            use_system_proxy: false,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ProviderSettings {
    /// Configured key, or `OPENAI_API_KEY`.
    pub fn resolve_api_key(&self) -> LlmResult<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(AUTH_ENV_VAR).ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                LlmError::InvalidConfig(format!(
                    "missing api key (set provider.api_key or {})",
                    AUTH_ENV_VAR
                ))
            })
    }
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Value,
    #[serde(default)]
    reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

/// Chat completions over HTTP with bearer auth.
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for OpenAiCompatibleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleClient")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl OpenAiCompatibleClient {
    pub fn new(settings: &ProviderSettings) -> LlmResult<Self> {
        let api_key = settings.resolve_api_key()?;

        let mut builder = Client::builder().timeout(Duration::from_secs(settings.timeout_secs));
        if !settings.use_system_proxy {
            builder = builder.no_proxy();
        }
        let http = builder
            .build()
            .map_err(|e| LlmError::InvalidConfig(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: resolve_chat_endpoint(&settings.base_url),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatibleClient {
    fn provider(&self) -> &str {
        "openai_compatible"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &CompletionConfig,
    ) -> LlmResult<Completion> {
        if config.model.trim().is_empty() {
            return Err(LlmError::InvalidConfig("model id is empty".to_string()));
        }

        let started = Instant::now();
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&build_payload(messages, config))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Provider {
                status: status.as_u16(),
                message: truncate(&body, ERROR_BODY_CHARS),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        let completion = parse_chat_response(body, config.mode)?;

        tracing::debug!(
            model = %config.model,
            input_tokens = completion.input_tokens,
            output_tokens = completion.output_tokens,
            latency_ms = started.elapsed().as_millis() as u64,
            "Completion received"
        );

        Ok(completion)
    }
}

fn build_payload(messages: &[ChatMessage], config: &CompletionConfig) -> Value {
    json!({
        "model": config.model,
        "messages": messages,
        "temperature": config.temperature,
        "top_p": config.top_p,
    })
}

fn parse_chat_response(body: Value, mode: ResponseMode) -> LlmResult<Completion> {
    let parsed: ChatResponse =
        serde_json::from_value(body).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("response did not include choices".to_string()))?;
    let content = extract_text(&choice.message.content);

    let text = match (mode, choice.message.reasoning_content) {
        (ResponseMode::ReasoningModel, Some(reasoning)) => {
            format!("Thought:\n{}\n Answer:\n{}", reasoning, content)
        }
        (ResponseMode::ReasoningModel, None) => {
            tracing::warn!("reasoning_content missing from reasoning-mode response");
            content
        }
        (ResponseMode::BaseModel, _) => content,
    };

    let (input_tokens, output_tokens) = parsed
        .usage
        .map(|u| (u.prompt_tokens.unwrap_or(0), u.completion_tokens.unwrap_or(0)))
        .unwrap_or((0, 0));

    Ok(Completion {
        text,
        input_tokens,
        output_tokens,
    })
}

fn resolve_chat_endpoint(base_url: &str) -> String {
    if base_url.contains("/chat/completions") {
        base_url.to_string()
    } else {
        format!("{}/chat/completions", base_url.trim_end_matches('/'))
    }
}

fn extract_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}
