//! Configuration types for document extraction and the HTTP service.
//!
//! Everything the pipeline needs is carried by an explicit
//! [`ExtractionConfig`] handed to [`crate::extract::Extractor::new`]; the
//! HTTP layer adds a [`ServerConfig`]. Nothing is read from the process
//! environment after start-up, so tests can build configs by hand and swap
//! in a fake model.
//!
//! [`AppConfig::from_env`] is the single place environment variables are
//! consulted.

use crate::error::ExtractError;
use std::fmt;
use std::path::PathBuf;

/// 20 MiB: ceiling enforced by the extraction stage.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 20 * 1024 * 1024;

/// 5 MiB: stricter ceiling enforced at the upload boundary.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Form field that must carry the uploaded document.
pub const UPLOAD_FIELD: &str = "document";

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// MIME types accepted at the upload boundary.
pub const DEFAULT_UPLOAD_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

/// Configuration for a single extraction.
///
/// Built via [`ExtractionConfig::builder()`] or [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use idextract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .api_key("AIza-test")
///     .model("gemini-1.5-pro")
///     .temperature(0.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gemini-1.5-pro");
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// API key for the default Gemini backend.
    pub api_key: Option<String>,

    /// Model identifier. Default: `gemini-1.5-flash`.
    pub model: String,

    /// edgequake-llm provider name (e.g. "openai", "anthropic", "ollama").
    ///
    /// When set, the document is sent through that provider instead of the
    /// built-in Gemini client, and the provider reads its own credentials.
    pub provider_name: Option<String>,

    /// Base URL of the Gemini REST API. Overridden in tests.
    pub api_base: String,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Field extraction wants the model to copy what is printed, not to
    /// improvise, so this stays close to 0.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 2048.
    pub max_output_tokens: usize,

    /// Largest document the pipeline will encode and send. Default: 20 MiB.
    pub max_file_bytes: u64,

    /// Per-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Replaces the built-in image/PDF prompts when set.
    pub prompt_override: Option<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            api_base: DEFAULT_API_BASE.to_string(),
            temperature: 0.1,
            max_output_tokens: 2048,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            api_timeout_secs: 60,
            prompt_override: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("api_base", &self.api_base)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("max_file_bytes", &self.max_file_bytes)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("prompt_override", &self.prompt_override.is_some())
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn max_file_bytes(mut self, n: u64) -> Self {
        self.config.max_file_bytes = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn prompt_override(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt_override = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.max_file_bytes == 0 {
            return Err(ExtractError::InvalidConfig(
                "max_file_bytes must be greater than zero".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "api_timeout_secs must be greater than zero".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(ExtractError::InvalidConfig("model must not be empty".into()));
        }
        Ok(self.config)
    }
}

/// HTTP-layer settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding in-flight uploads. Created at start-up.
    pub upload_dir: PathBuf,
    /// Transport-level size ceiling. Default: 5 MiB.
    pub max_upload_bytes: u64,
    /// Declared MIME types accepted at the boundary.
    pub allowed_mime_types: Vec<String>,
    /// CORS origins; empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            upload_dir: std::env::temp_dir().join("idextract-uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_mime_types: DEFAULT_UPLOAD_MIME_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            allowed_origins: Vec::new(),
        }
    }
}

/// Process-level configuration: what the binary reads at start-up.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub extraction: ExtractionConfig,
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// Fails when `GEMINI_API_KEY` is missing or empty.
    pub fn from_env() -> Result<Self, ExtractError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ExtractError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = var("GEMINI_API_KEY").ok_or_else(|| {
            ExtractError::InvalidConfig(
                "GEMINI_API_KEY must be set to start the extraction service".into(),
            )
        })?;

        let mut server = ServerConfig::default();
        if let Some(port) = var("PORT") {
            server.port = parse_var("PORT", &port)?;
        }
        if let Some(host) = var("HOST") {
            server.host = host;
        }
        if let Some(dir) = var("IDEXTRACT_UPLOAD_DIR") {
            server.upload_dir = PathBuf::from(dir);
        }
        if let Some(origins) = var("ALLOWED_ORIGINS") {
            server.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && s != "*")
                .collect();
        }

        let mut builder = ExtractionConfig::builder().api_key(api_key);
        if let Some(model) = var("IDEXTRACT_MODEL") {
            builder = builder.model(model);
        }
        if let Some(provider) = var("IDEXTRACT_PROVIDER") {
            builder = builder.provider_name(provider);
        }
        if let Some(base) = var("IDEXTRACT_API_BASE") {
            builder = builder.api_base(base);
        }
        if let Some(timeout) = var("IDEXTRACT_API_TIMEOUT") {
            builder = builder.api_timeout_secs(parse_var("IDEXTRACT_API_TIMEOUT", &timeout)?);
        }

        Ok(Self {
            server,
            extraction: builder.build()?,
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ExtractError> {
    value
        .trim()
        .parse()
        .map_err(|_| ExtractError::InvalidConfig(format!("{key} has an invalid value: '{value}'")))
}
