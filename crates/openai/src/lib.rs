//! HTTP client for the OpenAI text- and image-generation endpoints.
//!
//! Owns everything provider-specific: request shaping per model family,
//! the retry/backoff policy for transient failures, the classified
//! error taxonomy, and USD cost accounting for every successful call.

pub mod backoff;
pub mod client;
pub mod error;
pub mod messages;

pub use client::{
    ClientConfig, ImageGeneration, ImageRequest, OpenAiClient, TextGeneration, TextRequest,
};
pub use error::ProviderError;
