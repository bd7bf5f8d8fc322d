//! # idextract
//!
//! Extract structured data from identity documents (passports, driving
//! licences, ID cards) with a multimodal LLM.
//!
//! No OCR happens locally. The document is validated, base64-encoded and
//! sent to the model together with an instruction prompt describing the
//! JSON object wanted back; the reply is cleaned up and parsed. A reply
//! that is not JSON is still returned, as a soft failure carrying the raw
//! text.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload / file
//!  │
//!  ├─ 1. Validate   extension, size, declared MIME type
//!  ├─ 2. Encode     bytes → base64 + MIME type
//!  ├─ 3. Prompt     image or PDF wording, same JSON shape
//!  ├─ 4. Model      one generateContent call (Gemini, or any edgequake-llm provider)
//!  └─ 5. Normalize  strip fences, parse JSON, or fall back to the raw text
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use idextract::{ExtractionConfig, Extractor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .build()?;
//!     let extractor = Extractor::new(config)?;
//!     let result = extractor.extract_file("passport.jpg", "passport.jpg").await?;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `idextract` binary (clap + anyhow + tracing-subscriber) |
//!
//! The HTTP service ([`server`]) is part of the library so it can be
//! embedded or driven in-process by tests.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AppConfig, ExtractionConfig, ExtractionConfigBuilder, ServerConfig};
pub use error::{ExtractError, ModelError, TransportError, ValidationError};
pub use extract::Extractor;
pub use output::{DocumentRecord, DocumentType, ExtractionResult, PersonalInfo, ResultMetadata};
pub use pipeline::encode::{ContentKind, EncodedDocument};
pub use pipeline::llm::DocumentModel;
