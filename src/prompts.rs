//! Instruction prompts for identity-document extraction.
//!
//! Both prompts request the exact same JSON shape so the normaliser and the
//! typed [`crate::output::DocumentRecord`] view work identically for images
//! and PDFs. Only the opening sentence differs.
//!
//! Callers can replace both via
//! [`crate::config::ExtractionConfig::prompt_override`].

use crate::pipeline::encode::ContentKind;

// concat! only takes literals, so the shared pieces are literal-producing macros.
macro_rules! response_shape {
    () => {
        r#"{
  "documentType": "passport" | "driving_license" | "id_card" | "other",
  "personalInfo": {
    "name": "full name as printed",
    "dateOfBirth": "YYYY-MM-DD",
    "address": "address as printed",
    "nationality": "nationality",
    "gender": "gender"
  },
  "documentNumber": "document number",
  "issueDate": "YYYY-MM-DD",
  "expiryDate": "YYYY-MM-DD",
  "issuingAuthority": "issuing authority",
  "country": "issuing country",
  "additionalInfo": {
    "any other relevant field": "value"
  }
}"#
    };
}

macro_rules! instructions {
    () => {
        concat!(
            "1. Classify the document type.\n",
            "2. Extract every field listed below exactly as printed.\n\n",
            "Return ONLY a JSON object with this structure:\n",
            response_shape!(),
            "\n\nRules:\n",
            "- Use null for any field that is missing, unreadable or not applicable.\n",
            "- Put extra fields (place of birth, MRZ, license categories, ...) in additionalInfo.\n",
            "- Do NOT add commentary or explanations.\n",
            "- Do NOT wrap the JSON in Markdown code fences."
        )
    };
}

/// The JSON object the model is asked to return.
pub const RESPONSE_SHAPE: &str = response_shape!();

const IMAGE_PROMPT: &str = concat!(
    "You are an identity-document analyst. Analyze the attached image of an identity document ",
    "(passport, driving license, national ID card or similar).\n\n",
    instructions!()
);

const PDF_PROMPT: &str = concat!(
    "You are an identity-document analyst. Analyze the attached PDF, which contains a scan of an ",
    "identity document (passport, driving license, national ID card or similar). If it has several ",
    "pages, combine the information from all of them.\n\n",
    instructions!()
);

/// Prompt for the given content kind. Same input, same text.
pub fn build_prompt(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Image => IMAGE_PROMPT,
        ContentKind::Pdf => PDF_PROMPT,
    }
}
