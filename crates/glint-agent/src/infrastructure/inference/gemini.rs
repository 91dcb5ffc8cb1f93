//! Gemini `generateContent` client.
//!
//! One request carries, in order: the system prompt text, the reference
//! block of earlier answers (only when there are any), and the screenshot as
//! base64 PNG inline data.  The API key travels in the `x-goog-api-key`
//! header so it never shows up in a logged URL.
//!
//! Any transport error, non-2xx status or unparseable body is reported as an
//! [`InferenceError`]; the rotation layer decides whether to try another key.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use glint_core::domain::history::prompt_context;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::application::rotate_credentials::{Credential, InferenceError, InferenceProvider};
use crate::application::run_request::EncodedImage;

/// Connection settings for [`GeminiProvider`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Base URL up to and including `/models`.
    pub endpoint: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl GeminiConfig {
    /// Full `generateContent` URL for the configured model.
    pub fn url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
    system_prompt: String,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig, system_prompt: String) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| InferenceError::Http(e.to_string()))?;
        tracing::info!(
            model = %config.model,
            timeout_secs = config.request_timeout.as_secs(),
            "Gemini provider initialized"
        );
        Ok(Self {
            client,
            config,
            system_prompt,
        })
    }
}

#[async_trait]
impl InferenceProvider for GeminiProvider {
    async fn infer(
        &self,
        credential: &Credential,
        image: &EncodedImage,
        prior: &[String],
    ) -> Result<String, InferenceError> {
        let body = build_request(&self.system_prompt, prior, &image.png);
        tracing::debug!(
            png_bytes = image.png.len(),
            prior = prior.len(),
            "sending generateContent request"
        );

        let response = self
            .client
            .post(self.config.url())
            .header("x-goog-api-key", credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;
        extract_text(payload)
    }
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

/// One content part.  Exactly one of the payload fields is set.
#[derive(Debug, Serialize, Deserialize, Default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    /// Set by thinking models on reasoning parts, which are not the answer.
    #[serde(default, skip_serializing)]
    thought: bool,
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            ..Self::default()
        }
    }

    fn png(data: &[u8]) -> Self {
        Self {
            inline_data: Some(InlineData {
                mime_type: "image/png".to_string(),
                data: STANDARD.encode(data),
            }),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

fn build_request(system_prompt: &str, prior: &[String], png: &[u8]) -> GenerateContentRequest {
    let mut parts = vec![Part::text(system_prompt.to_string())];
    if let Some(context) = prompt_context(prior) {
        parts.push(Part::text(context));
    }
    parts.push(Part::png(png));
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts,
        }],
    }
}

/// Joins the text parts of the first candidate.  An empty string is a valid
/// result here; the rotation layer reports it as an empty answer.
fn extract_text(response: GenerateContentResponse) -> Result<String, InferenceError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| InferenceError::MalformedResponse("no candidates".to_string()))?;
    Ok(candidate
        .content
        .parts
        .into_iter()
        .filter(|part| !part.thought)
        .filter_map(|part| part.text)
        .collect::<Vec<_>>()
        .join(""))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    fn parse(body: Value) -> Result<String, InferenceError> {
        let response: GenerateContentResponse = serde_json::from_value(body).unwrap();
        extract_text(response)
    }

    #[test]
    fn test_url_joins_endpoint_and_model() {
        let config = GeminiConfig {
            endpoint: "https://example.test/v1beta/models/".to_string(),
            model: "gemini-flash-latest".to_string(),
            request_timeout: Duration::from_secs(5),
        };

        assert_eq!(
            config.url(),
            "https://example.test/v1beta/models/gemini-flash-latest:generateContent"
        );
    }

    #[test]
    fn test_request_without_history_has_prompt_and_image() {
        // Act
        let body = serde_json::to_value(build_request("Answer briefly.", &[], b"png")).unwrap();

        // Assert
        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "Answer briefly." },
                        { "inline_data": { "mime_type": "image/png", "data": "cG5n" } }
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_request_with_history_inserts_reference_block() {
        let prior = vec!["B".to_string(), "D".to_string()];

        let body = serde_json::to_value(build_request("sys", &prior, b"x")).unwrap();

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        let context = parts[1]["text"].as_str().unwrap();
        assert!(context.contains("1. B\n2. D"));
        assert!(parts[2].get("inline_data").is_some());
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let text = parse(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Hello, " }, { "text": "world" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        assert_eq!(text, "Hello, world");
    }

    #[test]
    fn test_extract_text_skips_thought_parts() {
        let text = parse(json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "thinking...", "thought": true },
                    { "text": "42", "thoughtSignature": "abc" }
                ] }
            }]
        }))
        .unwrap();

        assert_eq!(text, "42");
    }

    #[test]
    fn test_extract_text_without_candidates_is_malformed() {
        let result = parse(json!({ "promptFeedback": { "blockReason": "SAFETY" } }));

        assert!(matches!(result, Err(InferenceError::MalformedResponse(_))));
    }

    #[test]
    fn test_extract_text_with_no_parts_is_empty() {
        let text = parse(json!({ "candidates": [{ "finishReason": "MAX_TOKENS" }] })).unwrap();

        assert_eq!(text, "");
    }
}
