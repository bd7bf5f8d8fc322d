//! Result types returned by the extraction pipeline.
//!
//! [`ExtractionResult`] is what the pipeline hands back for every document
//! that reached the model: either the parsed JSON or, when the model's
//! reply was not JSON, the raw text. Both carry [`ResultMetadata`].
//!
//! [`DocumentRecord`] is a typed, lenient *view* of the parsed JSON. The
//! pipeline never forces replies through it; callers that want typed
//! access (the CLI summary, for one) ask for it explicitly.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Error tag attached to soft failures.
pub const PARSE_FAILURE_MESSAGE: &str = "Failed to parse document information";

/// Outcome of one extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    /// The model replied with valid JSON.
    Success {
        extracted_data: Value,
        metadata: ResultMetadata,
    },
    /// The model replied, but not with JSON. `raw_response` is the reply
    /// exactly as received.
    ParseFailure {
        raw_response: String,
        metadata: ResultMetadata,
    },
}

impl ExtractionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionResult::Success { .. })
    }

    pub fn metadata(&self) -> &ResultMetadata {
        match self {
            ExtractionResult::Success { metadata, .. }
            | ExtractionResult::ParseFailure { metadata, .. } => metadata,
        }
    }

    pub fn extracted_data(&self) -> Option<&Value> {
        match self {
            ExtractionResult::Success { extracted_data, .. } => Some(extracted_data),
            ExtractionResult::ParseFailure { .. } => None,
        }
    }

    pub fn raw_response(&self) -> Option<&str> {
        match self {
            ExtractionResult::ParseFailure { raw_response, .. } => Some(raw_response),
            ExtractionResult::Success { .. } => None,
        }
    }

    /// Typed view of the extracted data.
    ///
    /// `None` for soft failures, or when the model returned JSON that is not
    /// an object.
    pub fn document_record(&self) -> Option<DocumentRecord> {
        self.extracted_data()
            .filter(|v| v.is_object())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Flat wire shape: `{success, extractedData?, error?, rawResponse?, metadata}`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractionResultWire<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    extracted_data: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw_response: Option<&'a str>,
    metadata: &'a ResultMetadata,
}

impl Serialize for ExtractionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            ExtractionResult::Success {
                extracted_data,
                metadata,
            } => ExtractionResultWire {
                success: true,
                extracted_data: Some(extracted_data),
                error: None,
                raw_response: None,
                metadata,
            },
            ExtractionResult::ParseFailure {
                raw_response,
                metadata,
            } => ExtractionResultWire {
                success: false,
                extracted_data: None,
                error: Some(PARSE_FAILURE_MESSAGE),
                raw_response: Some(raw_response),
                metadata,
            },
        };
        wire.serialize(serializer)
    }
}

/// Provenance attached to every result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    /// Original name of the uploaded file.
    pub file_name: String,
    /// Lower-case extension, without the dot.
    pub file_type: String,
    /// RFC 3339 UTC, millisecond precision, `Z` suffix.
    pub processed_at: String,
}

impl ResultMetadata {
    /// Metadata stamped with the current time.
    pub fn new(file_name: impl Into<String>, file_type: impl Into<String>) -> Self {
        Self::at(file_name, file_type, Utc::now())
    }

    pub fn at(
        file_name: impl Into<String>,
        file_type: impl Into<String>,
        processed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            file_type: file_type.into(),
            processed_at: processed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

// ── Typed view ───────────────────────────────────────────────────────────

/// Document classes the prompt asks the model to choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "Value")]
pub enum DocumentType {
    Passport,
    DrivingLicense,
    IdCard,
    #[default]
    Other,
}

impl From<Value> for DocumentType {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => DocumentType::from(s.as_str()),
            _ => DocumentType::Other,
        }
    }
}

impl From<&str> for DocumentType {
    fn from(s: &str) -> Self {
        let normalised: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();
        match normalised.as_str() {
            "passport" => DocumentType::Passport,
            "driving_license" => DocumentType::DrivingLicense,
            "id_card" => DocumentType::IdCard,
            _ => DocumentType::Other,
        }
    }
}

impl DocumentType {
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::Passport => "Passport",
            DocumentType::DrivingLicense => "Driving licence",
            DocumentType::IdCard => "ID card",
            DocumentType::Other => "Other",
        }
    }
}

/// Personal details printed on the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date_of_birth: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub nationality: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub gender: Option<String>,
}

/// Typed view of the JSON shape requested by the prompt. Every field is
/// optional: the model may omit, null out, or mistype any of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    #[serde(default)]
    pub document_type: Option<DocumentType>,
    #[serde(default, deserialize_with = "lenient_nested")]
    pub personal_info: Option<PersonalInfo>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub document_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub issue_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub expiry_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub issuing_authority: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_nested")]
    pub additional_info: Option<Map<String, Value>>,
}

impl DocumentRecord {
    /// `additionalInfo` with snake_case keys rewritten to camelCase.
    ///
    /// When the model emitted both spellings of a key, the camelCase entry
    /// is kept. Display-layer only; results keep the model's own keys.
    pub fn canonical_additional_info(&self) -> BTreeMap<String, Value> {
        let mut out = BTreeMap::new();
        let Some(info) = &self.additional_info else {
            return out;
        };
        for (key, value) in info.iter().filter(|(k, _)| k.contains('_')) {
            out.insert(snake_to_camel(key), value.clone());
        }
        for (key, value) in info.iter().filter(|(k, _)| !k.contains('_')) {
            out.insert(key.clone(), value.clone());
        }
        out
    }
}

fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for c in key.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Accept strings, numbers and booleans as text; anything else is `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// A nested object of the wrong shape reads as absent.
fn lenient_nested<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn meta() -> ResultMetadata {
        let t = Utc.with_ymd_and_hms(2026, 10, 19, 8, 15, 30).unwrap();
        ResultMetadata::at("passport.jpg", "jpg", t)
    }

    #[test]
    fn processed_at_is_sortable_iso() {
        assert_eq!(meta().processed_at, "2026-10-19T08:15:30.000Z");
    }

    #[test]
    fn success_wire_shape() {
        let r = ExtractionResult::Success {
            extracted_data: json!({"documentType": "passport"}),
            metadata: meta(),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["extractedData"]["documentType"], "passport");
        assert_eq!(v["metadata"]["fileName"], "passport.jpg");
        assert_eq!(v["metadata"]["fileType"], "jpg");
        assert!(v.get("rawResponse").is_none());
        assert!(v.get("error").is_none());
    }

    #[test]
    fn parse_failure_wire_shape() {
        let r = ExtractionResult::ParseFailure {
            raw_response: "I cannot process this image".into(),
            metadata: meta(),
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["success"], false);
        assert_eq!(v["error"], PARSE_FAILURE_MESSAGE);
        assert_eq!(v["rawResponse"], "I cannot process this image");
        assert!(v.get("extractedData").is_none());
    }

    #[test]
    fn document_type_variants() {
        assert_eq!(DocumentType::from("passport"), DocumentType::Passport);
        assert_eq!(DocumentType::from("Driving License"), DocumentType::DrivingLicense);
        assert_eq!(DocumentType::from("id-card"), DocumentType::IdCard);
        assert_eq!(DocumentType::from("residence_permit"), DocumentType::Other);
        assert_eq!(
            serde_json::to_value(DocumentType::DrivingLicense).unwrap(),
            "driving_license"
        );
    }

    #[test]
    fn record_is_lenient() {
        let r = ExtractionResult::Success {
            extracted_data: json!({
                "documentType": "id_card",
                "personalInfo": {"name": "Jane Roe", "dateOfBirth": null, "gender": ""},
                "documentNumber": 123456789,
                "country": ["not", "a", "string"],
                "unexpected": true
            }),
            metadata: meta(),
        };
        let rec = r.document_record().expect("object parses");
        assert_eq!(rec.document_type, Some(DocumentType::IdCard));
        let info = rec.personal_info.unwrap();
        assert_eq!(info.name.as_deref(), Some("Jane Roe"));
        assert_eq!(info.date_of_birth, None);
        assert_eq!(info.gender, None);
        assert_eq!(rec.document_number.as_deref(), Some("123456789"));
        assert_eq!(rec.country, None);
    }

    #[test]
    fn mistyped_fields_do_not_sink_the_record() {
        let r = ExtractionResult::Success {
            extracted_data: json!({
                "documentType": 3,
                "documentNumber": "X1",
                "personalInfo": "Jane Roe",
                "additionalInfo": ["B"]
            }),
            metadata: meta(),
        };
        let rec = r.document_record().expect("object parses");
        assert_eq!(rec.document_type, Some(DocumentType::Other));
        assert_eq!(rec.document_number.as_deref(), Some("X1"));
        assert_eq!(rec.personal_info, None);
        assert_eq!(rec.additional_info, None);
    }

    #[test]
    fn record_absent_for_non_object() {
        let r = ExtractionResult::Success {
            extracted_data: json!(["passport"]),
            metadata: meta(),
        };
        assert!(r.document_record().is_none());
    }

    #[test]
    fn canonical_additional_info_prefers_camel() {
        let rec: DocumentRecord = serde_json::from_value(json!({
            "additionalInfo": {
                "place_of_birth": "Lyon",
                "placeOfBirth": "Lyon, France",
                "blood_type": "O+",
                "height": "180cm"
            }
        }))
        .unwrap();
        let info = rec.canonical_additional_info();
        assert_eq!(info["placeOfBirth"], "Lyon, France");
        assert_eq!(info["bloodType"], "O+");
        assert_eq!(info["height"], "180cm");
        assert!(!info.contains_key("place_of_birth"));
        assert_eq!(info.len(), 3);
    }

    #[test]
    fn snake_to_camel_edges() {
        assert_eq!(snake_to_camel("place_of_birth"), "placeOfBirth");
        assert_eq!(snake_to_camel("_leading"), "leading");
        assert_eq!(snake_to_camel("mrz"), "mrz");
    }
}
