//! Post-processing: turn the model's free-form reply into an
//! [`ExtractionResult`].
//!
//! The prompt asks for bare JSON, but models regularly wrap it in
//! ` ```json ... ``` ` fences, prepend a byte-order mark, or answer in
//! prose when the image is unreadable. The rules below undo the first two;
//! the third is reported as a soft failure carrying the untouched reply.
//!
//! ## Rule Order
//!
//! Invisible characters go first: a leading BOM would otherwise keep the
//! opening fence from matching at the start of the reply. Only the fence
//! markers that enclose the whole reply are removed; backticks inside a
//! value are data.

use crate::output::{ExtractionResult, ResultMetadata};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

/// Apply every cleanup rule and attempt a strict JSON parse.
///
/// Never fails: a reply that is not JSON becomes
/// [`ExtractionResult::ParseFailure`] with `raw` preserved exactly.
pub fn normalize_response(raw: &str, metadata: ResultMetadata) -> ExtractionResult {
    let cleaned = clean_response(raw);

    match serde_json::from_str::<Value>(&cleaned) {
        Ok(extracted_data) => {
            debug!(
                file_name = %metadata.file_name,
                "Parsed model reply ({} chars)",
                cleaned.len()
            );
            ExtractionResult::Success {
                extracted_data,
                metadata,
            }
        }
        Err(e) => {
            warn!(
                file_name = %metadata.file_name,
                stage = "parse",
                error = %e,
                "Model reply is not valid JSON; returning raw text"
            );
            ExtractionResult::ParseFailure {
                raw_response: raw.to_string(),
                metadata,
            }
        }
    }
}

/// Cleanup rules (applied in order):
/// 1. Strip invisible Unicode (BOM, zero-width spaces)
/// 2. Strip the surrounding Markdown code-fence markers
/// 3. Trim surrounding whitespace
pub fn clean_response(raw: &str) -> String {
    let s = remove_invisible_chars(raw);
    let s = strip_code_fences(&s);
    s.trim().to_string()
}

// ── Rule 1: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(['\u{200B}', '\u{FEFF}', '\u{200C}', '\u{200D}', '\u{2060}'], "")
}

// ── Rule 2: Strip code fences ────────────────────────────────────────────────

// Opening "```json" / "```" at the very start, with an optional newline.
static RE_FENCE_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\A\s*```(?:json5?|javascript|js)?[ \t]*\r?\n?").unwrap()
});

// Closing "```" at the very end, with the newline before it.
static RE_FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n?```\s*\z").unwrap());

fn strip_code_fences(input: &str) -> String {
    let s = RE_FENCE_OPEN.replace(input, "");
    RE_FENCE_CLOSE.replace(&s, "").into_owned()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::PARSE_FAILURE_MESSAGE;
    use serde_json::json;

    fn meta() -> ResultMetadata {
        ResultMetadata::new("id.png", "png")
    }

    #[test]
    fn test_strip_json_fence() {
        let input = "```json\n{\"documentType\":\"passport\"}\n```";
        assert_eq!(clean_response(input), "{\"documentType\":\"passport\"}");
    }

    #[test]
    fn test_strip_bare_fence() {
        let input = "```\n{\"a\":1}\n```\n";
        assert_eq!(clean_response(input), "{\"a\":1}");
    }

    #[test]
    fn test_strip_uppercase_fence_crlf() {
        let input = "```JSON\r\n{\"a\":1}\r\n```";
        assert_eq!(clean_response(input), "{\"a\":1}");
    }

    #[test]
    fn test_no_fence_passthrough() {
        assert_eq!(clean_response("  {\"a\":1}\n"), "{\"a\":1}");
    }

    #[test]
    fn test_bom_before_fence() {
        let input = "\u{FEFF}```json\n{\"a\":1}\n```";
        assert_eq!(clean_response(input), "{\"a\":1}");
    }

    #[test]
    fn test_backticks_inside_a_value_are_kept() {
        let input = "```json\n{\"additionalInfo\":{\"note\":\"a ``` b\"}}\n```";
        assert_eq!(clean_response(input), "{\"additionalInfo\":{\"note\":\"a ``` b\"}}");

        let r = normalize_response(input, meta());
        assert_eq!(r.extracted_data().unwrap()["additionalInfo"]["note"], "a ``` b");
    }

    #[test]
    fn test_single_line_fence() {
        assert_eq!(clean_response("```json{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn test_remove_bom() {
        assert_eq!(clean_response("\u{FEFF}{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn fenced_passport_parses() {
        let r = normalize_response("```json\n{\"documentType\":\"passport\"}\n```", meta());
        assert!(r.is_success());
        assert_eq!(r.extracted_data().unwrap()["documentType"], "passport");
    }

    #[test]
    fn prose_is_soft_failure() {
        let raw = "I cannot process this image";
        let r = normalize_response(raw, meta());
        assert!(!r.is_success());
        assert_eq!(r.raw_response(), Some(raw));

        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["success"], false);
        assert_eq!(v["error"], PARSE_FAILURE_MESSAGE);
        assert_eq!(v["rawResponse"], raw);
    }

    #[test]
    fn raw_response_is_untouched_on_failure() {
        let raw = "```json\n{\"documentType\": \"passport\",\n```";
        let r = normalize_response(raw, meta());
        assert_eq!(r.raw_response(), Some(raw));
    }

    #[test]
    fn normalization_is_idempotent_on_clean_json() {
        let clean = r#"{"documentType":"id_card","personalInfo":{"name":"Jane Roe"}}"#;
        assert_eq!(clean_response(clean), clean);
        assert_eq!(clean_response(&clean_response(clean)), clean_response(clean));

        let first = normalize_response(clean, meta());
        let reserialised = serde_json::to_string(first.extracted_data().unwrap()).unwrap();
        let second = normalize_response(&reserialised, meta());
        assert_eq!(first.extracted_data(), second.extracted_data());
    }

    #[test]
    fn non_object_json_passes_through() {
        let r = normalize_response("[1, 2, 3]", meta());
        assert_eq!(r.extracted_data(), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn metadata_is_kept_on_both_paths() {
        let ok = normalize_response("{}", meta());
        let bad = normalize_response("nope", meta());
        assert_eq!(ok.metadata().file_name, "id.png");
        assert_eq!(bad.metadata().file_type, "png");
    }
}
