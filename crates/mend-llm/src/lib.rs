//! Mend LLM Provider Layer
//!
//! Pluggable LLM provider implementations for the repair pipeline.
//!
//! # Architecture
//!
//! This crate provides implementations of the `LlmProvider` trait from `mend-domain`.
//! It supports multiple LLM backends with a common interface.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `OllamaProvider`: Local Ollama API integration
//! - `GeminiProvider`: Google Generative Language API integration
//!
//! # Examples
//!
//! ```
//! use mend_llm::MockProvider;
//! use mend_domain::traits::LlmProvider;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate("test prompt").await.unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! # }
//! ```

#![warn(missing_docs)]

pub mod gemini;
pub mod ollama;

#[cfg(test)]
mod test_server;

use async_trait::async_trait;
use mend_domain::traits::LlmProvider as LlmProviderTrait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Error(String),
    Hang,
}

/// Mock LLM provider for deterministic testing
///
/// This provider returns pre-configured responses without making any network calls.
/// Replies are chosen in this order: the next scripted reply, an exact-prompt
/// reply, then the default reply.
///
/// # Examples
///
/// ```
/// use mend_llm::MockProvider;
/// use mend_domain::traits::LlmProvider;
///
/// # #[tokio::main]
/// # async fn main() {
/// // Simple fixed response
/// let provider = MockProvider::new("Fixed response");
/// assert_eq!(provider.generate("any prompt").await.unwrap(), "Fixed response");
///
/// // Scripted responses, consumed in order
/// let provider = MockProvider::default();
/// provider.push_response("first");
/// provider.push_error("second call fails");
/// assert_eq!(provider.generate("a").await.unwrap(), "first");
/// assert!(provider.generate("b").await.is_err());
/// assert_eq!(provider.generate("c").await.unwrap(), "Default mock response");
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_reply: MockReply,
    responses: Arc<Mutex<HashMap<String, MockReply>>>,
    script: Arc<Mutex<VecDeque<MockReply>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    call_count: Arc<Mutex<usize>>,
    delay: Option<Duration>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self::with_default(MockReply::Text(response.into()))
    }

    /// Create a provider whose every call fails
    pub fn always_failing() -> Self {
        Self::with_default(MockReply::Error("Mock error".to_string()))
    }

    /// Create a provider whose calls never complete
    pub fn hanging() -> Self {
        Self::with_default(MockReply::Hang)
    }

    fn with_default(default_reply: MockReply) -> Self {
        Self {
            default_reply,
            responses: Arc::new(Mutex::new(HashMap::new())),
            script: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            delay: None,
        }
    }

    /// Delay every reply by `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Add a specific response for a given prompt
    pub fn add_response(&self, prompt: impl Into<String>, response: impl Into<String>) {
        lock(&self.responses).insert(prompt.into(), MockReply::Text(response.into()));
    }

    /// Configure to return an error for a specific prompt
    pub fn add_error(&self, prompt: impl Into<String>) {
        lock(&self.responses).insert(prompt.into(), MockReply::Error("Mock error".to_string()));
    }

    /// Queue a reply for the next unanswered call
    pub fn push_response(&self, response: impl Into<String>) {
        lock(&self.script).push_back(MockReply::Text(response.into()));
    }

    /// Queue a failure for the next unanswered call
    pub fn push_error(&self, message: impl Into<String>) {
        lock(&self.script).push_back(MockReply::Error(message.into()));
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        *lock(&self.call_count)
    }

    /// Reset the call count and prompt log
    pub fn reset_call_count(&self) {
        *lock(&self.call_count) = 0;
        lock(&self.prompts).clear();
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    fn next_reply(&self, prompt: &str) -> MockReply {
        *lock(&self.call_count) += 1;
        lock(&self.prompts).push(prompt.to_string());

        if let Some(reply) = lock(&self.script).pop_front() {
            return reply;
        }
        if let Some(reply) = lock(&self.responses).get(prompt) {
            return reply.clone();
        }
        self.default_reply.clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl LlmProviderTrait for MockProvider {
    type Error = LlmError;

    async fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        let reply = self.next_reply(prompt);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            MockReply::Text(text) => Ok(text),
            MockReply::Error(message) => Err(LlmError::Other(message)),
            MockReply::Hang => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        let result = provider.generate("any prompt").await;
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "Test response");
    }

    #[tokio::test]
    async fn test_mock_provider_specific_responses() {
        let provider = MockProvider::default();
        provider.add_response("hello", "world");
        provider.add_response("foo", "bar");

        assert_eq!(provider.generate("hello").await.unwrap(), "world");
        assert_eq!(provider.generate("foo").await.unwrap(), "bar");
        assert_eq!(provider.generate("unknown").await.unwrap(), "Default mock response");
    }

    #[tokio::test]
    async fn test_mock_provider_script_takes_priority() {
        let provider = MockProvider::new("default");
        provider.add_response("hello", "world");
        provider.push_response("scripted");

        assert_eq!(provider.generate("hello").await.unwrap(), "scripted");
        assert_eq!(provider.generate("hello").await.unwrap(), "world");
    }

    #[tokio::test]
    async fn test_mock_provider_call_count() {
        let provider = MockProvider::new("test");

        assert_eq!(provider.call_count(), 0);

        provider.generate("prompt1").await.unwrap();
        assert_eq!(provider.call_count(), 1);

        provider.generate("prompt2").await.unwrap();
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.prompts(), vec!["prompt1", "prompt2"]);

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_mock_provider_error() {
        let provider = MockProvider::default();
        provider.add_error("bad prompt");

        let result = provider.generate("bad prompt").await;
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), LlmError::Other(_)));
    }

    #[tokio::test]
    async fn test_mock_provider_always_failing() {
        let provider = MockProvider::always_failing();
        assert!(provider.generate("a").await.is_err());
        assert!(provider.generate_structured("b", "{}").await.is_err());
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_provider_hanging_never_completes() {
        let provider = MockProvider::hanging();
        let result = tokio::time::timeout(
            Duration::from_millis(20),
            provider.generate("anything"),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mock_provider_structured() {
        let provider = MockProvider::new("structured response");
        let result = provider.generate_structured("prompt", "schema").await;
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "structured response");
    }

    #[tokio::test]
    async fn test_mock_provider_clone() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.generate("test").await.unwrap();

        // Both should share the same call count due to Arc
        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
    }
}
