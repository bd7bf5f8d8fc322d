//! Default [`DocumentModel`]: the Gemini `generateContent` REST endpoint.
//!
//! One request per document. The prompt and the base64 document travel as
//! two parts of a single user turn; the reply text is the concatenation of
//! the first candidate's text parts.

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, ModelError};
use crate::pipeline::encode::EncodedDocument;
use crate::pipeline::llm::DocumentModel;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

pub struct GeminiModel {
    http_client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    name: String,
    temperature: f32,
    max_output_tokens: usize,
}

impl fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiModel")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiModel {
    /// Build a client from the extraction config.
    ///
    /// Fails with [`ExtractError::ProviderNotConfigured`] when no API key is set.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ExtractError::ProviderNotConfigured {
                provider: "gemini".into(),
                hint: "Set GEMINI_API_KEY to use the default Gemini backend.".into(),
            })?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| ExtractError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            name: format!("gemini/{}", config.model),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl DocumentModel for GeminiModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        prompt: &str,
        document: &EncodedDocument,
    ) -> Result<String, ModelError> {
        let start = Instant::now();
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text { text: prompt },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: document.mime_type,
                            data: &document.data,
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::new(format!("request to Gemini failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|env| env.error.message)
                .unwrap_or_else(|_| {
                    if text.trim().is_empty() {
                        status.to_string()
                    } else {
                        text
                    }
                });
            return Err(ModelError::with_status(status.as_u16(), message));
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ModelError::new(format!("unexpected Gemini response body: {e}")))?;

        if let Some(usage) = &reply.usage_metadata {
            debug!(
                "{}: {} input tokens, {} output tokens, {:?}",
                self.name,
                usage.prompt_token_count,
                usage.candidates_token_count,
                start.elapsed()
            );
        }

        reply.into_text()
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String, ModelError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map(|r| format!(" (blocked: {r})"))
                .unwrap_or_default();
            return Err(ModelError::new(format!("Gemini returned no candidates{reason}")));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".into());
            return Err(ModelError::new(format!(
                "Gemini returned an empty reply (finish reason: {reason})"
            )));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::encode_document;
    use mockito::Matcher;
    use serde_json::json;

    const PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

    fn model_for(base: &str) -> GeminiModel {
        let config = ExtractionConfig::builder()
            .api_key("test-key")
            .api_base(base)
            .build()
            .unwrap();
        GeminiModel::from_config(&config).unwrap()
    }

    fn doc() -> EncodedDocument {
        encode_document(b"\xFF\xD8\xFF fake jpeg", "jpg").unwrap()
    }

    #[test]
    fn missing_key_is_not_configured() {
        let err = GeminiModel::from_config(&ExtractionConfig::default()).unwrap_err();
        assert!(matches!(err, ExtractError::ProviderNotConfigured { .. }));
    }

    #[tokio::test]
    async fn sends_prompt_and_inline_document() {
        let mut server = mockito::Server::new_async().await;
        let document = doc();
        let mock = server
            .mock("POST", PATH)
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::PartialJson(json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "describe"},
                        {"inlineData": {"mimeType": "image/jpeg", "data": document.data}}
                    ]
                }],
                "generationConfig": {"maxOutputTokens": 2048}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "candidates": [{
                        "content": {"parts": [{"text": "{\"documentType\":"}, {"text": "\"passport\"}"}]},
                        "finishReason": "STOP"
                    }],
                    "usageMetadata": {"promptTokenCount": 300, "candidatesTokenCount": 12}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let model = model_for(&server.url());
        let reply = model.generate("describe", &document).await.unwrap();
        assert_eq!(reply, "{\"documentType\":\"passport\"}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn vendor_error_message_and_status_are_kept() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(429)
            .with_body(
                json!({"error": {"code": 429, "message": "Resource has been exhausted (e.g. check quota).", "status": "RESOURCE_EXHAUSTED"}})
                    .to_string(),
            )
            .create_async()
            .await;

        let err = model_for(&server.url()).generate("p", &doc()).await.unwrap_err();
        assert_eq!(err.status, Some(429));
        assert_eq!(err.message, "Resource has been exhausted (e.g. check quota).");
    }

    #[tokio::test]
    async fn non_json_error_body_is_used_verbatim() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(502)
            .with_body("upstream connect error")
            .create_async()
            .await;

        let err = model_for(&server.url()).generate("p", &doc()).await.unwrap_err();
        assert_eq!(err.status, Some(502));
        assert_eq!(err.message, "upstream connect error");
    }

    #[tokio::test]
    async fn empty_candidates_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(json!({"candidates": [], "promptFeedback": {"blockReason": "SAFETY"}}).to_string())
            .create_async()
            .await;

        let err = model_for(&server.url()).generate("p", &doc()).await.unwrap_err();
        assert!(err.message.contains("no candidates"), "{}", err.message);
        assert!(err.message.contains("SAFETY"));
        assert_eq!(err.status, None);
    }

    #[tokio::test]
    async fn prose_reply_is_returned_as_is() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(
                json!({"candidates": [{"content": {"parts": [{"text": "I cannot process this image"}]}}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let reply = model_for(&server.url()).generate("p", &doc()).await.unwrap();
        assert_eq!(reply, "I cannot process this image");
    }
}
