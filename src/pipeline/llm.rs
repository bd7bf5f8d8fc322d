//! Model interaction: the [`DocumentModel`] seam and error classification.
//!
//! The pipeline talks to the external model through one operation,
//! [`DocumentModel::generate`]. Two implementations ship with the crate:
//!
//! * [`crate::pipeline::gemini::GeminiModel`]: the default, Gemini REST API
//!   with the API key taken from configuration.
//! * [`ProviderModel`]: any vision-capable edgequake-llm provider, for
//!   deployments that set `IDEXTRACT_PROVIDER`.
//!
//! Tests substitute their own implementation.
//!
//! There is no retry loop here. A failed call is classified by
//! [`classify_model_error`] and surfaced immediately.

use crate::config::ExtractionConfig;
use crate::error::{ModelError, TransportError};
use crate::pipeline::encode::EncodedDocument;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, LlmError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// The external model as the pipeline sees it.
#[async_trait]
pub trait DocumentModel: Send + Sync {
    /// Short name for logs, e.g. `gemini/gemini-1.5-flash`.
    fn name(&self) -> &str;

    /// Send the prompt plus the encoded document; return the reply text.
    async fn generate(&self, prompt: &str, document: &EncodedDocument)
        -> Result<String, ModelError>;
}

/// [`DocumentModel`] backed by an edgequake-llm provider.
///
/// The request is a single user message: the prompt as text and the
/// document as an attachment. Providers differ in which attachment MIME
/// types they accept; PDFs in particular are not supported everywhere.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    name: String,
    temperature: f32,
    max_tokens: usize,
    timeout: Duration,
}

impl ProviderModel {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        name: impl Into<String>,
        config: &ExtractionConfig,
    ) -> Self {
        Self {
            provider,
            name: name.into(),
            temperature: config.temperature,
            max_tokens: config.max_output_tokens,
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }
}

#[async_trait]
impl DocumentModel for ProviderModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        prompt: &str,
        document: &EncodedDocument,
    ) -> Result<String, ModelError> {
        let start = Instant::now();
        let attachment =
            ImageData::new(document.data.clone(), document.mime_type).with_detail("high");
        let messages = vec![ChatMessage::user_with_images(prompt, vec![attachment])];
        let options = build_options(self.temperature, self.max_tokens);

        let call = self.provider.chat(&messages, Some(&options));
        let response = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                ModelError::new(format!(
                    "request timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(model_error_from_llm)?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            self.name,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(response.content)
    }
}

/// Carry the provider's error kind over as the HTTP status it stands for.
fn model_error_from_llm(err: LlmError) -> ModelError {
    let status = match &err {
        LlmError::AuthError(_) => Some(401),
        LlmError::RateLimited(_) => Some(429),
        LlmError::InvalidRequest(_) | LlmError::TokenLimitExceeded { .. } => Some(400),
        _ => None,
    };
    ModelError {
        status,
        message: err.to_string(),
    }
}

/// Build `CompletionOptions` for a provider call.
fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

/// Map a raw model failure onto the four user-facing categories.
///
/// Message text is checked before the status code: Gemini, for one,
/// reports a bad API key as HTTP 400 `API key not valid`.
pub fn classify_model_error(err: &ModelError) -> TransportError {
    let msg = err.message.to_lowercase();
    let detail = err.to_string();
    let mentions = |needles: &[&str]| needles.iter().any(|n| msg.contains(n));

    if mentions(&["api key", "api_key", "unauthorized", "unauthenticated", "authentication", "permission denied"])
        || matches!(err.status, Some(401 | 403))
    {
        TransportError::Unauthorized { detail }
    } else if mentions(&["quota", "rate limit", "resource_exhausted", "resource has been exhausted", "too many requests"])
        || err.status == Some(429)
    {
        TransportError::QuotaExceeded { detail }
    } else if mentions(&["invalid", "corrupt", "malformed", "unsupported", "unable to process input"])
        || matches!(err.status, Some(400 | 413 | 415 | 422))
    {
        TransportError::InvalidInput { detail }
    } else {
        TransportError::Failed { detail }
    }
}
