//! Pipeline stages for identity-document extraction.
//!
//! Each submodule implements exactly one step and is tested on its own.
//! [`crate::extract::Extractor`] strings them together.
//!
//! ## Data Flow
//!
//! ```text
//! validate ──▶ encode ──▶ llm / gemini ──▶ postprocess
//! (name,size)  (base64)   (multimodal)     (JSON or raw)
//! ```
//!
//! 1. [`validate`]: extension allow-list, size ceiling, declared MIME type
//! 2. [`encode`]: base64-wrap the bytes and pick the MIME type and prompt kind
//! 3. [`llm`]: the [`llm::DocumentModel`] seam, the edgequake-llm adapter and
//!    error classification; [`gemini`] is the default REST backend. The only
//!    stages with network I/O.
//! 4. [`postprocess`]: strip fences and invisible characters, then parse
//!    strictly; a non-JSON reply becomes a soft failure

pub mod encode;
pub mod gemini;
pub mod llm;
pub mod postprocess;
pub mod validate;
