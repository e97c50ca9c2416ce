//! Trait definitions for external interactions
//!
//! These traits define the boundary between the repair pipeline and the
//! generative model. Implementations live in `mend-llm`.

use async_trait::async_trait;
use std::fmt::Display;
use std::sync::Arc;

/// Trait for LLM provider operations
///
/// Implementations must not keep conversation state between calls: one
/// provider is shared by every pipeline invocation.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Error type for LLM operations
    type Error: Display + Send;

    /// Generate text completion
    async fn generate(&self, prompt: &str) -> Result<String, Self::Error>;

    /// Generate with structured output (if supported)
    ///
    /// `schema` is a JSON schema the response should follow. Providers
    /// without a structured mode fall back to plain generation.
    async fn generate_structured(&self, prompt: &str, schema: &str) -> Result<String, Self::Error> {
        let _ = schema;
        self.generate(prompt).await
    }
}

#[async_trait]
impl<P> LlmProvider for Arc<P>
where
    P: LlmProvider + ?Sized,
{
    type Error = P::Error;

    async fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        (**self).generate(prompt).await
    }

    async fn generate_structured(&self, prompt: &str, schema: &str) -> Result<String, Self::Error> {
        (**self).generate_structured(prompt, schema).await
    }
}
