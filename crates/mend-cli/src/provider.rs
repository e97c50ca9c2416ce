//! Provider selection for the CLI.

use crate::config::{ProviderKind, ProviderSettings};
use crate::error::{CliError, Result};
use async_trait::async_trait;
use mend_domain::traits::LlmProvider;
use mend_llm::{GeminiProvider, LlmError, OllamaProvider};

/// Model used with Ollama when none is configured
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// Any of the backends the CLI can drive
pub enum AnyProvider {
    /// No model available; every call fails
    Offline,
    /// Local Ollama server
    Ollama(OllamaProvider),
    /// Google Gemini API
    Gemini(GeminiProvider),
}

impl AnyProvider {
    /// Build the provider described by `settings`
    ///
    /// Gemini needs an API key; everything else has usable defaults.
    pub fn from_settings(settings: &ProviderSettings, api_key: Option<&str>) -> Result<Self> {
        match settings.kind {
            ProviderKind::Offline => Ok(AnyProvider::Offline),
            ProviderKind::Ollama => {
                let model = settings.model.as_deref().unwrap_or(DEFAULT_OLLAMA_MODEL);
                let endpoint = settings
                    .endpoint
                    .as_deref()
                    .unwrap_or(mend_llm::ollama::DEFAULT_ENDPOINT);
                Ok(AnyProvider::Ollama(OllamaProvider::new(endpoint, model)))
            }
            ProviderKind::Gemini => {
                let key = api_key
                    .filter(|k| !k.trim().is_empty())
                    .ok_or_else(|| CliError::Provider("GEMINI_API_KEY is not set".to_string()))?;
                let model = settings
                    .model
                    .as_deref()
                    .unwrap_or(mend_llm::gemini::DEFAULT_MODEL);
                let mut provider = GeminiProvider::new(key, model);
                if let Some(endpoint) = &settings.endpoint {
                    provider = provider.with_endpoint(endpoint.as_str());
                }
                Ok(AnyProvider::Gemini(provider))
            }
        }
    }

    /// True when no model calls can be made
    pub fn is_offline(&self) -> bool {
        matches!(self, AnyProvider::Offline)
    }

    /// Short description for logs
    pub fn describe(&self) -> String {
        match self {
            AnyProvider::Offline => "offline".to_string(),
            AnyProvider::Ollama(p) => format!("ollama ({})", p.model()),
            AnyProvider::Gemini(p) => format!("gemini ({})", p.model()),
        }
    }
}

#[async_trait]
impl LlmProvider for AnyProvider {
    type Error = LlmError;

    async fn generate(&self, prompt: &str) -> std::result::Result<String, Self::Error> {
        match self {
            AnyProvider::Offline => Err(LlmError::ModelNotAvailable("offline mode".to_string())),
            AnyProvider::Ollama(p) => p.generate(prompt).await,
            AnyProvider::Gemini(p) => p.generate(prompt).await,
        }
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &str,
    ) -> std::result::Result<String, Self::Error> {
        match self {
            AnyProvider::Offline => Err(LlmError::ModelNotAvailable("offline mode".to_string())),
            AnyProvider::Ollama(p) => p.generate_structured(prompt, schema).await,
            AnyProvider::Gemini(p) => p.generate_structured(prompt, schema).await,
        }
    }
}
