//! Document encoding: raw bytes → base64 + MIME type.
//!
//! Multimodal APIs take documents inline as base64 strings next to the
//! prompt. The MIME type is derived from the file extension alone; the
//! validator has already restricted extensions to a known set, so no
//! content sniffing happens here.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Which prompt variant a document gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Image,
    Pdf,
}

impl ContentKind {
    /// Classify by lower-case extension. `None` for unknown extensions.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match mime_type_for_extension(ext)? {
            "application/pdf" => Some(ContentKind::Pdf),
            _ => Some(ContentKind::Image),
        }
    }
}

/// MIME type for an allow-listed extension (case-insensitive).
pub fn mime_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "webp" => Some("image/webp"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

/// A document ready to attach to a model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedDocument {
    /// Standard base64, no line breaks.
    pub data: String,
    pub mime_type: &'static str,
    pub kind: ContentKind,
}

/// Base64-encode `bytes` and tag them with the MIME type for `ext`.
///
/// Returns `None` when `ext` is not allow-listed.
pub fn encode_document(bytes: &[u8], ext: &str) -> Option<EncodedDocument> {
    let mime_type = mime_type_for_extension(ext)?;
    let kind = ContentKind::from_extension(ext)?;

    let data = STANDARD.encode(bytes);
    debug!("Encoded {} bytes → {} bytes base64 ({})", bytes.len(), data.len(), mime_type);

    Some(EncodedDocument {
        data,
        mime_type,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_lookup() {
        assert_eq!(mime_type_for_extension("jpg"), Some("image/jpeg"));
        assert_eq!(mime_type_for_extension("JPEG"), Some("image/jpeg"));
        assert_eq!(mime_type_for_extension("webp"), Some("image/webp"));
        assert_eq!(mime_type_for_extension("pdf"), Some("application/pdf"));
        assert_eq!(mime_type_for_extension("tiff"), None);
    }

    #[test]
    fn kind_from_extension() {
        assert_eq!(ContentKind::from_extension("pdf"), Some(ContentKind::Pdf));
        assert_eq!(ContentKind::from_extension("png"), Some(ContentKind::Image));
        assert_eq!(ContentKind::from_extension("docx"), None);
    }

    #[test]
    fn encode_small_document() {
        let doc = encode_document(b"%PDF-1.7 fake", "pdf").expect("pdf is allowed");
        assert_eq!(doc.mime_type, "application/pdf");
        assert_eq!(doc.kind, ContentKind::Pdf);
        let decoded = STANDARD.decode(&doc.data).expect("valid base64");
        assert_eq!(decoded, b"%PDF-1.7 fake");
    }

    #[test]
    fn encode_rejects_unknown_extension() {
        assert!(encode_document(b"abc", "exe").is_none());
    }
}
