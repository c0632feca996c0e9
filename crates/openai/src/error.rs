//! Classified provider errors.
//!
//! Every failure mode a caller might act on differently gets its own
//! kind with actionable text. Transient kinds are retried inside the
//! client up to the attempt cap; permanent kinds surface immediately.

/// Errors from the provider client.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No API key configured. Fatal; checked before any request.
    #[error("No API key configured (set OPENAI_API_KEY)")]
    MissingCredentials,

    /// HTTP 401: the key is invalid or revoked.
    #[error("Authentication failed: the API key was rejected; check OPENAI_API_KEY")]
    AuthFailed,

    /// HTTP 403: the key is valid but lacks access.
    #[error("Access denied: this API key cannot use the requested resource")]
    AccessDenied,

    /// The requested model does not exist or is not available to this
    /// account.
    #[error("Model '{0}' not found; check the configured model id")]
    ModelNotFound(String),

    /// HTTP 429 carrying an `insufficient_quota` code: the account is
    /// out of credit. Retrying cannot help.
    #[error("Provider quota exhausted; add credit or raise the account limit")]
    QuotaExhausted,

    /// HTTP 429 that is plain rate limiting. Retryable with backoff.
    #[error("Rate limited by the provider")]
    RateLimited {
        /// Provider-supplied wait hint, seconds.
        retry_after: Option<u64>,
    },

    /// HTTP 5xx. Retryable.
    #[error("Provider server error (HTTP {status})")]
    ServerError { status: u16 },

    /// Some other non-success status the taxonomy does not name.
    #[error("Provider rejected the request (HTTP {status}): {message}")]
    BadRequest { status: u16, message: String },

    /// The request timed out. Retryable.
    #[error("Request timed out after {0}s; the provider may be overloaded")]
    Timeout(u64),

    /// DNS resolution failed.
    #[error("DNS lookup failed; check the endpoint host and network")]
    Dns,

    /// TLS negotiation failed.
    #[error("TLS handshake failed; check system certificates and the endpoint URL")]
    Tls,

    /// TCP connection refused.
    #[error("Connection refused; the endpoint is unreachable")]
    ConnectionRefused,

    /// Transport failure that is none of the named kinds.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A 2xx response whose body did not parse as expected.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),

    /// A transient error survived every allowed attempt.
    #[error("Gave up after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        last: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Whether the retry loop may try again after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::ServerError { .. }
                | Self::Timeout(_)
                | Self::Dns
                | Self::Tls
                | Self::ConnectionRefused
                | Self::Transport(_)
        )
    }

    /// Provider-supplied wait hint, if this error carries one.
    pub fn retry_after_hint(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}
