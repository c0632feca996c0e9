//! Wire types for the provider's JSON responses.
//!
//! Requests are assembled dynamically (the capability matrix changes
//! field names per model family), so only responses get typed structs.

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Chat completions
// ---------------------------------------------------------------------------

/// Token accounting attached to a chat completion.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// The assistant message inside a choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// One completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Response body of the chat-completions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

// ---------------------------------------------------------------------------
// Image generation
// ---------------------------------------------------------------------------

/// One generated image.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageDatum {
    #[serde(default)]
    pub url: Option<String>,
}

/// Response body of the image-generation endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageResponse {
    pub data: Vec<ImageDatum>,
}

// ---------------------------------------------------------------------------
// Error body
// ---------------------------------------------------------------------------

/// The `error` object the provider attaches to non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Envelope for [`ApiErrorDetail`].
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

impl ApiErrorBody {
    /// Best-effort parse of an error body. Returns `None` for bodies
    /// that are not the documented envelope (HTML gateway pages, empty
    /// bodies).
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    /// Whether this error signals exhausted account quota (as opposed
    /// to plain rate limiting).
    pub fn is_quota_exhausted(&self) -> bool {
        self.error.code.as_deref() == Some("insufficient_quota")
            || self.error.error_type.as_deref() == Some("insufficient_quota")
    }

    /// Whether this error signals an unknown model.
    pub fn is_model_not_found(&self) -> bool {
        self.error.code.as_deref() == Some("model_not_found")
    }
}
