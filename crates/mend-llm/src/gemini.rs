//! Gemini Provider Implementation
//!
//! Minimal client for the Generative Language API `generateContent` call.
//! Structured calls request `application/json` output. The API key travels
//! in the `x-goog-api-key` header so it never appears in a URL or in a
//! transport error.

use crate::LlmError;
use async_trait::async_trait;
use mend_domain::traits::LlmProvider as LlmProviderTrait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Default Generative Language API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default timeout for requests (20 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Gemini API provider
pub struct GeminiProvider {
    endpoint: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        Some(text)
    }
}

impl GeminiProvider {
    /// Create a new Gemini provider for `model`
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: model.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Override the API endpoint (useful for proxies)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Model name this provider targets
    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    async fn request(&self, prompt: &str, mime_type: Option<&str>) -> Result<String, LlmError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: mime_type.map(|m| GenerationConfig {
                response_mime_type: m,
            }),
        };

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e.without_url())))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimitExceeded);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LlmError::ModelNotAvailable(self.model.clone()));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Communication(format!("HTTP {}: {}", status, error_text)));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        parsed
            .text()
            .ok_or_else(|| LlmError::InvalidResponse("Response has no candidates".to_string()))
    }
}

#[async_trait]
impl LlmProviderTrait for GeminiProvider {
    type Error = LlmError;

    async fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        self.request(prompt, None).await
    }

    async fn generate_structured(&self, prompt: &str, _schema: &str) -> Result<String, Self::Error> {
        self.request(prompt, Some("application/json")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::CannedServer;

    #[test]
    fn test_gemini_url() {
        let provider = GeminiProvider::new("k3y", "gemini-pro").with_endpoint("http://proxy/v1/");
        assert_eq!(provider.url(), "http://proxy/v1/models/gemini-pro:generateContent");
    }

    #[tokio::test]
    async fn test_api_key_sent_as_header() {
        let server =
            CannedServer::start(200, r#"{"candidates":[{"content":{"parts":[{"text":"ok"}]}}]}"#)
                .await;
        let provider = GeminiProvider::new("SECRET_KEY_123", "m").with_endpoint(&server.endpoint);

        assert_eq!(provider.generate("x").await.unwrap(), "ok");

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let request_line = requests[0].lines().next().unwrap();
        assert_eq!(request_line, "POST /models/m:generateContent HTTP/1.1");
        assert!(requests[0]
            .to_ascii_lowercase()
            .contains("x-goog-api-key: secret_key_123"));
    }

    #[tokio::test]
    async fn test_transport_error_hides_api_key() {
        let provider =
            GeminiProvider::new("SECRET_KEY_123", "m").with_endpoint("http://127.0.0.1:1");

        let err = provider.generate("x").await.unwrap_err();
        assert!(matches!(err, LlmError::Communication(_)));
        assert!(!err.to_string().contains("SECRET_KEY_123"), "leaked: {}", err);
    }

    #[tokio::test]
    async fn test_status_errors() {
        let server = CannedServer::start(429, "{}").await;
        let provider = GeminiProvider::new("k", "m").with_endpoint(&server.endpoint);
        assert!(matches!(provider.generate("x").await, Err(LlmError::RateLimitExceeded)));

        let server = CannedServer::start(404, "{}").await;
        let provider = GeminiProvider::new("k", "m").with_endpoint(&server.endpoint);
        assert!(matches!(
            provider.generate("x").await,
            Err(LlmError::ModelNotAvailable(model)) if model == "m"
        ));
    }

    #[test]
    fn test_request_serialization() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: "hi" }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_response_text_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]}}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_response_without_candidates() {
        let parsed: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.text().is_none());
    }
}
