//! Provider-trait implementations for the real OpenAI client.

use async_trait::async_trait;

use draftpress_openai::{
    ImageGeneration, ImageRequest, OpenAiClient, ProviderError, TextGeneration, TextRequest,
};

use crate::traits::{ImageGenerator, TextGenerator};

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate_text(&self, request: &TextRequest) -> Result<TextGeneration, ProviderError> {
        OpenAiClient::generate_text(self, request).await
    }

    async fn verify_credentials(&self) -> Result<(), ProviderError> {
        OpenAiClient::verify_credentials(self).await
    }
}

#[async_trait]
impl ImageGenerator for OpenAiClient {
    async fn generate_image(
        &self,
        request: &ImageRequest,
    ) -> Result<ImageGeneration, ProviderError> {
        OpenAiClient::generate_image(self, request).await
    }
}
