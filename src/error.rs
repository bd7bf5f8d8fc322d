//! Error types for the idextract library.
//!
//! Three layers of failure exist, and they travel differently:
//!
//! * [`ValidationError`]: the uploaded file is unacceptable (extension,
//!   MIME type, size). Raised before the model is ever contacted.
//!
//! * [`TransportError`]: the external model call failed. The raw vendor
//!   message is classified into one of four user-facing categories and
//!   logged; it is never handed back to a client verbatim.
//!
//! * [`ExtractError`]: **Fatal** wrapper returned by
//!   [`crate::extract::Extractor`]. Either of the above, or an I/O or
//!   configuration problem.
//!
//! A reply that does not parse as JSON is *not* an error at this level: it
//! becomes [`crate::output::ExtractionResult::ParseFailure`] so the caller
//! can still show the raw text.

use std::path::PathBuf;
use thiserror::Error;

/// The uploaded file failed one of the pre-flight checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Extension is not on the allow-list.
    #[error("Unsupported file type '.{extension}'. Allowed: {allowed}")]
    UnsupportedExtension { extension: String, allowed: String },

    /// File name has no extension to classify it by.
    #[error("File '{file_name}' has no extension; cannot determine its type")]
    MissingExtension { file_name: String },

    /// Declared MIME type at the upload boundary is not accepted.
    #[error("Unsupported MIME type '{mime_type}'. Only JPEG, PNG and PDF files are allowed")]
    UnsupportedMimeType { mime_type: String },

    /// Zero-byte file.
    #[error("File '{file_name}' is empty")]
    EmptyFile { file_name: String },

    /// File exceeds the configured ceiling.
    #[error("File is too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    /// The multipart request carried no file under the expected field.
    #[error("No file uploaded. Send the document in the '{field}' form field")]
    MissingFile { field: String },

    /// More than one file under the expected field.
    #[error("Only one file may be uploaded per request (field '{field}')")]
    MultipleFiles { field: String },
}

/// A failed call to the external model, classified for display.
///
/// The `Display` text of each variant is what clients see; the vendor's
/// own wording is kept in `detail` for logs only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The model rejected the payload as malformed or corrupt.
    #[error("Invalid or corrupted document. Please upload a clear image or a valid PDF")]
    InvalidInput { detail: String },

    /// Vendor quota or rate limit hit.
    #[error("AI service quota exceeded. Please try again later")]
    QuotaExceeded { detail: String },

    /// API key missing, wrong or lacking permission.
    #[error("AI service authentication failed. Check the API key configuration")]
    Unauthorized { detail: String },

    /// Anything else: network failure, 5xx, unexpected body.
    #[error("Failed to process document with the AI service")]
    Failed { detail: String },
}

impl TransportError {
    /// Vendor-side detail, for logging.
    pub fn detail(&self) -> &str {
        match self {
            TransportError::InvalidInput { detail }
            | TransportError::QuotaExceeded { detail }
            | TransportError::Unauthorized { detail }
            | TransportError::Failed { detail } => detail,
        }
    }

    /// Short machine-readable category, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::InvalidInput { .. } => "invalid_input",
            TransportError::QuotaExceeded { .. } => "quota_exceeded",
            TransportError::Unauthorized { .. } => "unauthorized",
            TransportError::Failed { .. } => "failed",
        }
    }
}

/// Raw failure reported by a [`crate::pipeline::llm::DocumentModel`].
///
/// Carries whatever the vendor said plus the HTTP status when one exists.
/// Turned into a [`TransportError`] by
/// [`crate::pipeline::llm::classify_model_error`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ModelError {
    pub status: Option<u16>,
    pub message: String,
}

impl ModelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

/// All fatal errors returned by the extraction pipeline.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The document could not be read from transient storage.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Model errors ──────────────────────────────────────────────────────
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The configured provider could not be initialised.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or environment validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// Pipeline stage the error belongs to, used as a log field.
    pub fn stage(&self) -> &'static str {
        match self {
            ExtractError::Validation(_) => "validation",
            ExtractError::Io { .. } => "read",
            ExtractError::Transport(_) | ExtractError::ProviderNotConfigured { .. } => "model",
            ExtractError::InvalidConfig(_) => "config",
            ExtractError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_large_display() {
        let e = ValidationError::FileTooLarge {
            size: 5_242_881,
            max: 5_242_880,
        };
        let msg = e.to_string();
        assert!(msg.contains("5242881"), "got: {msg}");
        assert!(msg.contains("5242880"), "got: {msg}");
    }

    #[test]
    fn unsupported_extension_names_the_value() {
        let e = ValidationError::UnsupportedExtension {
            extension: "docx".into(),
            allowed: "jpg, png".into(),
        };
        assert!(e.to_string().contains(".docx"));
    }

    #[test]
    fn transport_display_hides_vendor_detail() {
        let e = TransportError::Unauthorized {
            detail: "API key not valid. Please pass a valid API key. [sk-123]".into(),
        };
        assert!(!e.to_string().contains("sk-123"));
        assert_eq!(e.detail(), "API key not valid. Please pass a valid API key. [sk-123]");
        assert_eq!(e.kind(), "unauthorized");
    }

    #[test]
    fn validation_wraps_transparently() {
        let e: ExtractError = ValidationError::EmptyFile {
            file_name: "scan.png".into(),
        }
        .into();
        assert_eq!(e.to_string(), "File 'scan.png' is empty");
        assert_eq!(e.stage(), "validation");
    }

    #[test]
    fn model_error_carries_status() {
        let e = ModelError::with_status(429, "Resource has been exhausted");
        assert_eq!(e.status, Some(429));
        assert_eq!(e.to_string(), "Resource has been exhausted");
    }
}
