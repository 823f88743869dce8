//! OpenAI-compatible `chat/completions` client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use normdraft_shared::{ApiKey, CompletionConfig, DraftError, Result};

use crate::{Completion, CompletionRequest, CompletionService};

/// User-Agent string for completion requests.
const USER_AGENT: &str = concat!("normdraft/", env!("CARGO_PKG_VERSION"));

/// How much of an error body we keep in the error message.
const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// HTTP client for a hosted chat model.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    endpoint: String,
    api_key: ApiKey,
    model: String,
    max_tokens: Option<u32>,
}

impl ChatClient {
    /// Build a client from `[completion]` config and a resolved credential.
    pub fn new(config: &CompletionConfig, api_key: ApiKey) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DraftError::Service(format!("failed to build HTTP client: {e}")))?;

        let endpoint = format!(
            "{}/chat/completions",
            config.base_url.as_str().trim_end_matches('/')
        );

        Ok(Self {
            http,
            endpoint,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionService for ChatClient {
    #[instrument(skip_all, fields(model = %self.model, temperature = request.temperature))]
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            system_chars = request.system.chars().count(),
            user_chars = request.user.chars().count(),
            "sending completion request"
        );

        let start = Instant::now();
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DraftError::Service(format!("request timed out: {e}"))
                } else {
                    DraftError::Service(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let preview: String = text.chars().take(ERROR_BODY_PREVIEW_CHARS).collect();
            warn!(%status, "completion service returned an error");
            return Err(DraftError::Service(format!("HTTP {status}: {preview}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DraftError::Service(format!("invalid response body: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DraftError::Service("response contained no choices".into()))?
            .message
            .content
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(DraftError::Service("model returned an empty response".into()));
        }

        let usage = parsed.usage.unwrap_or_default();
        let completion = Completion {
            text: content,
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
            tokens_in: usage.prompt_tokens,
            tokens_out: usage.completion_tokens,
            latency_ms: start.elapsed().as_millis() as u64,
        };

        debug!(
            tokens_in = completion.tokens_in,
            tokens_out = completion.tokens_out,
            latency_ms = completion.latency_ms,
            "completion received"
        );

        Ok(completion)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}
