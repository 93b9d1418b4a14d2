//! Model gateway: the boundary to the external generation API.
//!
//! `Provider` is the seam for the HTTP client (Gemini in production, mocks in
//! tests). `ModelGateway` pins the model identifier, bounds each call with a
//! timeout, and trims the reply.

mod gemini;

pub use gemini::GeminiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Provider Trait
// ============================================================================

/// Interface to a text-generation backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Generate a completion for a single prompt.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;
}

/// Error from a provider.
///
/// `Display` is the bare message; provider and model are kept as fields for
/// structured logging.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub provider: String,
    pub model: String,
    pub message: String,
    pub status_code: Option<u16>,
}

impl ProviderError {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            message: message.into(),
            status_code: None,
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderError {}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model to use
    pub model: String,
    /// Full prompt text
    pub prompt: String,
}

/// Generation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Provider name
    pub provider: String,
    /// Model used
    pub model: String,
    /// Response content
    pub content: String,
    /// Token usage
    pub usage: TokenUsage,
    /// Finish reason
    pub finish_reason: Option<String>,
    /// Response latency in milliseconds
    pub latency_ms: u64,
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_tokens: i64,
}

// ============================================================================
// Model Gateway
// ============================================================================

/// Failure of a generation call.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The provider reported an error; displays the provider's raw message.
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// The provider did not answer within the configured bound.
    #[error("model did not respond within {}s", .0.as_secs())]
    Timeout(Duration),
}

impl GenerationError {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Provider(_) => "provider",
            Self::Timeout(_) => "timeout",
        }
    }

    /// HTTP status reported by the upstream API, if it answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Provider(err) => err.status_code,
            Self::Timeout(_) => None,
        }
    }
}

/// Calls one provider with a fixed model and a per-call timeout.
#[derive(Clone)]
pub struct ModelGateway {
    provider: Arc<dyn Provider>,
    model: String,
    timeout: Duration,
}

impl ModelGateway {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            provider,
            model: model.into(),
            timeout,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send the prompt and return the trimmed reply text.
    pub async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
        };

        let response = tokio::time::timeout(self.timeout, self.provider.chat(request))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))??;

        tracing::debug!(
            provider = %response.provider,
            model = %response.model,
            latency_ms = response.latency_ms,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            finish_reason = ?response.finish_reason,
            "Generation completed"
        );

        Ok(response.content.trim().to_string())
    }
}
