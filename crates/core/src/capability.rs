//! Model capability matrix.
//!
//! Provider model families disagree about request shape: reasoning
//! models reject a `temperature` override and want the token limit
//! under `max_completion_tokens`, and some do not accept a system-role
//! message at all (the system prompt must be folded into the user
//! prompt). The differences live in one table here, keyed by model-name
//! prefix, so no call site hardcodes a family check.

// ---------------------------------------------------------------------------
// Capability types
// ---------------------------------------------------------------------------

/// Which request field carries the completion token limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenLimitField {
    /// Classic `max_tokens`.
    MaxTokens,
    /// `max_completion_tokens`, required by reasoning-family models.
    MaxCompletionTokens,
}

impl TokenLimitField {
    /// JSON field name to emit in the request body.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::MaxTokens => "max_tokens",
            Self::MaxCompletionTokens => "max_completion_tokens",
        }
    }
}

/// Request-shaping capabilities of one model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelCapabilities {
    /// Whether the model accepts a `temperature` override. When false
    /// the field must be omitted entirely (sending the default value is
    /// still rejected).
    pub supports_temperature: bool,
    /// Field name for the completion token limit.
    pub token_limit_field: TokenLimitField,
    /// Whether the model accepts a system-role message.
    pub supports_system_role: bool,
    /// Whether the image endpoint accepts an HD quality tier for this
    /// family (text families carry `false`).
    pub supports_hd_quality: bool,
}

const STANDARD: ModelCapabilities = ModelCapabilities {
    supports_temperature: true,
    token_limit_field: TokenLimitField::MaxTokens,
    supports_system_role: true,
    supports_hd_quality: false,
};

const REASONING: ModelCapabilities = ModelCapabilities {
    supports_temperature: false,
    token_limit_field: TokenLimitField::MaxCompletionTokens,
    supports_system_role: false,
    supports_hd_quality: false,
};

// ---------------------------------------------------------------------------
// The matrix
// ---------------------------------------------------------------------------

/// Capability table keyed by model-name prefix. First match wins, so
/// longer prefixes must precede shorter ones within a family.
const CAPABILITY_MATRIX: &[(&str, ModelCapabilities)] = &[
    ("o1-mini", REASONING),
    ("o1", REASONING),
    ("o3-mini", REASONING),
    ("o3", REASONING),
    ("o4-mini", REASONING),
    (
        "gpt-5",
        ModelCapabilities {
            supports_temperature: false,
            token_limit_field: TokenLimitField::MaxCompletionTokens,
            supports_system_role: true,
            supports_hd_quality: false,
        },
    ),
    ("gpt-4o", STANDARD),
    ("gpt-4", STANDARD),
    ("gpt-3.5", STANDARD),
    (
        "dall-e-3",
        ModelCapabilities {
            supports_temperature: false,
            token_limit_field: TokenLimitField::MaxTokens,
            supports_system_role: false,
            supports_hd_quality: true,
        },
    ),
    (
        "dall-e-2",
        ModelCapabilities {
            supports_temperature: false,
            token_limit_field: TokenLimitField::MaxTokens,
            supports_system_role: false,
            supports_hd_quality: false,
        },
    ),
];

/// Resolve capabilities for a model id. Unknown models get the
/// standard chat shape.
pub fn capabilities_for(model: &str) -> ModelCapabilities {
    for (prefix, caps) in CAPABILITY_MATRIX {
        if model.starts_with(prefix) {
            return *caps;
        }
    }
    STANDARD
}
