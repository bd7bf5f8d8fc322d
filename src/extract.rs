//! The extraction entry point.
//!
//! [`Extractor`] owns the resolved model and the configuration; one call to
//! [`Extractor::extract_file`] (or [`Extractor::extract_bytes`]) runs the
//! whole pipeline for one document and makes exactly one model call, or
//! none when validation fails.

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, ValidationError};
use crate::output::{ExtractionResult, ResultMetadata};
use crate::pipeline::encode::{self, mime_type_for_extension};
use crate::pipeline::gemini::GeminiModel;
use crate::pipeline::llm::{classify_model_error, DocumentModel, ProviderModel};
use crate::pipeline::{postprocess, validate};
use crate::prompts;
use edgequake_llm::ProviderFactory;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Runs validation, encoding, the model call and normalization.
///
/// Cheap to share: the server keeps one in an `Arc` and calls it from
/// every request. Holds no mutable state.
pub struct Extractor {
    model: Arc<dyn DocumentModel>,
    config: ExtractionConfig,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("model", &self.model.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Extractor {
    /// Resolve the model from `config` and build an extractor.
    ///
    /// * `provider_name` set: that edgequake-llm provider, which reads its
    ///   own credentials from the environment.
    /// * otherwise: the built-in Gemini client, which needs `api_key`.
    pub fn new(config: ExtractionConfig) -> Result<Self, ExtractError> {
        let model = resolve_model(&config)?;
        info!("Using model {}", model.name());
        Ok(Self { model, config })
    }

    /// Build an extractor around a caller-supplied model.
    pub fn with_model(config: ExtractionConfig, model: Arc<dyn DocumentModel>) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Extract from a file on disk.
    ///
    /// `original_name` is the name the client uploaded the file under; it
    /// decides the document type and is echoed in the result metadata. The
    /// on-disk name is irrelevant.
    ///
    /// # Errors
    /// * [`ExtractError::Validation`]: bad extension, empty or oversized
    ///   file. The model is not called.
    /// * [`ExtractError::Io`]: the file could not be read.
    /// * [`ExtractError::Transport`]: the model call failed.
    ///
    /// A reply that is not JSON is `Ok(ExtractionResult::ParseFailure)`.
    pub async fn extract_file(
        &self,
        path: impl AsRef<Path>,
        original_name: &str,
    ) -> Result<ExtractionResult, ExtractError> {
        let path = path.as_ref();

        let rejected = |e: &ValidationError| {
            info!(file_name = original_name, stage = "validation", "Rejected: {e}")
        };

        // Extension first: an unsupported file is never read.
        validate::file_extension(original_name)
            .and_then(|ext| validate::validate_extension(&ext))
            .inspect_err(rejected)?;

        let io_err = |source: std::io::Error| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        };
        let size = tokio::fs::metadata(path).await.map_err(io_err)?.len();
        validate::validate_size(original_name, size, self.config.max_file_bytes)
            .inspect_err(rejected)?;

        let bytes = tokio::fs::read(path).await.map_err(io_err)?;
        self.extract_bytes(&bytes, original_name).await
    }

    /// Extract from an in-memory document.
    pub async fn extract_bytes(
        &self,
        bytes: &[u8],
        original_name: &str,
    ) -> Result<ExtractionResult, ExtractError> {
        let start = Instant::now();

        // ── Step 1: Validate ─────────────────────────────────────────────────
        let ext = validate::validate_document(
            original_name,
            bytes.len() as u64,
            self.config.max_file_bytes,
        )
        .inspect_err(|e| info!(file_name = original_name, stage = "validation", "Rejected: {e}"))?;

        // ── Step 2: Encode ───────────────────────────────────────────────────
        let document = encode::encode_document(bytes, &ext).ok_or_else(|| {
            ValidationError::UnsupportedExtension {
                extension: ext.clone(),
                allowed: validate::ALLOWED_EXTENSIONS.join(", "),
            }
        })?;

        info!(
            "Extracting {} ({} bytes, {}) with {}",
            original_name,
            bytes.len(),
            mime_type_for_extension(&ext).unwrap_or("unknown"),
            self.model.name()
        );

        // ── Step 3: Prompt ───────────────────────────────────────────────────
        let prompt = self
            .config
            .prompt_override
            .as_deref()
            .unwrap_or_else(|| prompts::build_prompt(document.kind));

        // ── Step 4: Model call ───────────────────────────────────────────────
        let raw = match self.model.generate(prompt, &document).await {
            Ok(raw) => raw,
            Err(e) => {
                let classified = classify_model_error(&e);
                error!(
                    file_name = original_name,
                    stage = "model",
                    kind = classified.kind(),
                    status = ?e.status,
                    "Model call failed: {}",
                    classified.detail()
                );
                return Err(classified.into());
            }
        };
        debug!("Model replied with {} chars in {:?}", raw.len(), start.elapsed());

        // ── Step 5: Normalize ────────────────────────────────────────────────
        let metadata = ResultMetadata::new(original_name, &ext);
        Ok(postprocess::normalize_response(&raw, metadata))
    }
}

/// Pick the model backend for `config`.
fn resolve_model(config: &ExtractionConfig) -> Result<Arc<dyn DocumentModel>, ExtractError> {
    if let Some(ref name) = config.provider_name {
        let provider = ProviderFactory::create_llm_provider(name, &config.model).map_err(|e| {
            ExtractError::ProviderNotConfigured {
                provider: name.clone(),
                hint: format!("{e}"),
            }
        })?;
        let label = format!("{}/{}", name, config.model);
        return Ok(Arc::new(ProviderModel::new(provider, label, config)));
    }

    Ok(Arc::new(GeminiModel::from_config(config)?))
}
