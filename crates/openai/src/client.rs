//! The OpenAI API client.
//!
//! One endpoint for chat-style text completion, one for image
//! generation, both JSON over HTTPS with bearer-token auth. Request
//! bodies are shaped per model family through the capability matrix in
//! `draftpress-core`, and every transient failure is retried with
//! capped exponential backoff before surfacing.

use std::time::Duration;

use draftpress_core::capability::{capabilities_for, ModelCapabilities};
use draftpress_core::constants::PROVIDER_MAX_ATTEMPTS;
use draftpress_core::pricing::{image_cost, text_cost, ImageQuality};

use crate::backoff::retry_delay;
use crate::error::ProviderError;
use crate::messages::{ApiErrorBody, ChatResponse, ImageResponse};

/// Default API root.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default per-request timeout. Generation calls legitimately run for
/// minutes on long completions.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection configuration for the provider client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    /// Attempt cap per call, first try included.
    pub max_attempts: u32,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Build a config with defaults around the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_attempts: PROVIDER_MAX_ATTEMPTS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Read `OPENAI_API_KEY` (and optionally `OPENAI_BASE_URL`) from
    /// the environment.
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key =
            std::env::var("OPENAI_API_KEY").map_err(|_| ProviderError::MissingCredentials)?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// A text-generation request.
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A successful text generation with its accounting.
#[derive(Debug, Clone)]
pub struct TextGeneration {
    pub content: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub cost_usd: f64,
    pub finish_reason: Option<String>,
}

/// An image-generation request.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub model: String,
    /// e.g. `1024x1024`.
    pub size: String,
    pub quality: ImageQuality,
    /// Rendering style hint (`vivid` / `natural`), where supported.
    pub style: Option<String>,
}

/// A successful image generation.
#[derive(Debug, Clone)]
pub struct ImageGeneration {
    pub url: String,
    pub cost_usd: f64,
}

// ---------------------------------------------------------------------------
// Request shaping
// ---------------------------------------------------------------------------

/// Assemble the chat-completions body for a request, honoring the
/// model's capabilities: token-limit field name, temperature support,
/// and system-role support (folded into the user prompt when absent).
fn build_chat_body(request: &TextRequest, caps: ModelCapabilities) -> serde_json::Value {
    let mut messages = Vec::new();

    match (&request.system_prompt, caps.supports_system_role) {
        (Some(system), true) => {
            messages.push(serde_json::json!({"role": "system", "content": system}));
            messages.push(serde_json::json!({"role": "user", "content": request.prompt}));
        }
        (Some(system), false) => {
            let folded = format!("{system}\n\n{}", request.prompt);
            messages.push(serde_json::json!({"role": "user", "content": folded}));
        }
        (None, _) => {
            messages.push(serde_json::json!({"role": "user", "content": request.prompt}));
        }
    }

    let mut body = serde_json::json!({
        "model": request.model,
        "messages": messages,
    });
    body[caps.token_limit_field.field_name()] = serde_json::json!(request.max_tokens);
    if caps.supports_temperature {
        body["temperature"] = serde_json::json!(request.temperature);
    }
    body
}

/// Assemble the image-generation body. The quality field is only sent
/// to models with an HD tier.
fn build_image_body(request: &ImageRequest, caps: ModelCapabilities) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": request.model,
        "prompt": request.prompt,
        "size": request.size,
        "n": 1,
    });
    if caps.supports_hd_quality {
        body["quality"] = serde_json::json!(request.quality.as_str());
    }
    if let Some(style) = &request.style {
        body["style"] = serde_json::json!(style);
    }
    body
}

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

/// Map a non-success HTTP response to a classified error.
fn classify_http(
    status: u16,
    retry_after: Option<u64>,
    body: &str,
    model: &str,
) -> ProviderError {
    let parsed = ApiErrorBody::parse(body);

    match status {
        401 => ProviderError::AuthFailed,
        403 => ProviderError::AccessDenied,
        404 => ProviderError::ModelNotFound(model.to_string()),
        429 => {
            if parsed.as_ref().is_some_and(ApiErrorBody::is_quota_exhausted) {
                ProviderError::QuotaExhausted
            } else {
                ProviderError::RateLimited { retry_after }
            }
        }
        500..=599 => ProviderError::ServerError { status },
        _ => {
            if parsed.as_ref().is_some_and(ApiErrorBody::is_model_not_found) {
                return ProviderError::ModelNotFound(model.to_string());
            }
            let message = parsed
                .map(|b| b.error.message)
                .unwrap_or_else(|| truncate(body, 200));
            ProviderError::BadRequest { status, message }
        }
    }
}

/// Map a transport-level failure to a distinct, actionable kind.
fn classify_transport(error: &reqwest::Error, timeout_secs: u64) -> ProviderError {
    if error.is_timeout() {
        return ProviderError::Timeout(timeout_secs);
    }

    // Walk the source chain for the underlying IO failure.
    let mut source: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(error);
    while let Some(inner) = source {
        if let Some(io) = inner.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return ProviderError::ConnectionRefused;
            }
        }
        let text = inner.to_string();
        if text.contains("dns") || text.contains("failed to lookup") {
            return ProviderError::Dns;
        }
        if text.contains("certificate") || text.contains("tls") || text.contains("handshake") {
            return ProviderError::Tls;
        }
        source = std::error::Error::source(inner);
    }

    if error.is_connect() {
        return ProviderError::ConnectionRefused;
    }
    ProviderError::Transport(error.to_string())
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the provider.
#[derive(Debug)]
pub struct OpenAiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl OpenAiClient {
    /// Build a client. Fails fast on a missing key so the
    /// misconfiguration surfaces at startup, not mid-pipeline.
    pub fn new(config: ClientConfig) -> Result<Self, ProviderError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::MissingCredentials);
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Generate text via the chat-completions endpoint.
    pub async fn generate_text(
        &self,
        request: &TextRequest,
    ) -> Result<TextGeneration, ProviderError> {
        let caps = capabilities_for(&request.model);
        let body = build_chat_body(request, caps);
        let response = self
            .post_with_retry("chat/completions", &body, &request.model)
            .await?;

        let parsed: ChatResponse = serde_json::from_value(response)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".into()))?;
        let content = choice.message.content.unwrap_or_default();
        let usage = parsed.usage.unwrap_or_default();

        Ok(TextGeneration {
            cost_usd: text_cost(&request.model, usage.prompt_tokens, usage.completion_tokens),
            content,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            finish_reason: choice.finish_reason,
        })
    }

    /// Generate one image via the image endpoint.
    pub async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> Result<ImageGeneration, ProviderError> {
        let caps = capabilities_for(&request.model);
        let body = build_image_body(request, caps);
        let response = self
            .post_with_retry("images/generations", &body, &request.model)
            .await?;

        let parsed: ImageResponse = serde_json::from_value(response)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        let url = parsed
            .data
            .into_iter()
            .next()
            .and_then(|d| d.url)
            .ok_or_else(|| ProviderError::InvalidResponse("no image url in response".into()))?;

        Ok(ImageGeneration {
            cost_usd: image_cost(
                &request.model,
                &request.size,
                request.quality,
                caps.supports_hd_quality,
            ),
            url,
        })
    }

    /// Verify the configured credentials with a cheap authenticated
    /// request (consumed by the scheduler's credential gate).
    pub async fn verify_credentials(&self) -> Result<(), ProviderError> {
        let response = self
            .http
            .get(format!("{}/models", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| classify_transport(&e, self.config.timeout.as_secs()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let retry_after = parse_retry_after(&response);
        let body = response.text().await.unwrap_or_default();
        Err(classify_http(status.as_u16(), retry_after, &body, ""))
    }

    // ---- private helpers ----

    /// POST a JSON body, retrying transient failures with capped
    /// exponential backoff. Permanent failures return immediately.
    async fn post_with_retry(
        &self,
        path: &str,
        body: &serde_json::Value,
        model: &str,
    ) -> Result<serde_json::Value, ProviderError> {
        let mut attempt: u32 = 1;
        loop {
            match self.execute(path, body, model).await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt < self.config.max_attempts => {
                    let delay = retry_delay(attempt, error.retry_after_hint());
                    tracing::warn!(
                        path,
                        model,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Provider call failed, retrying",
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) if error.is_retryable() => {
                    return Err(ProviderError::RetryExhausted {
                        attempts: self.config.max_attempts,
                        last: Box::new(error),
                    });
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// One request/response cycle, classified.
    async fn execute(
        &self,
        path: &str,
        body: &serde_json::Value,
        model: &str,
    ) -> Result<serde_json::Value, ProviderError> {
        let response = self
            .http
            .post(format!("{}/{path}", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| classify_transport(&e, self.config.timeout.as_secs()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(&response);
            let text = response.text().await.unwrap_or_default();
            return Err(classify_http(status.as_u16(), retry_after, &text, model));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

/// Extract a `Retry-After` seconds hint, when present and numeric.
fn parse_retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}
