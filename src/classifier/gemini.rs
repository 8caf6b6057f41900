//! Google Gemini `generateContent` REST client.

use super::provider::{ClassifierError, GenerationOptions, ImageInput, VisionModel};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Gemini model client authenticated with an API key.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the API (e.g., "https://generativelanguage.googleapis.com/v1beta").
    /// * `model` - Model to use (e.g., "gemini-1.5-flash").
    /// * `api_key` - API key sent in the `x-goog-api-key` header.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    fn build_request(
        prompt: &str,
        image: Option<&ImageInput>,
        options: &GenerationOptions,
    ) -> GeminiRequest {
        let mut parts = vec![GeminiPart::Text {
            text: prompt.to_string(),
        }];
        if let Some(image) = image {
            parts.push(GeminiPart::InlineData {
                inline_data: GeminiBlob {
                    mime_type: image.mime_type.clone(),
                    data: BASE64.encode(&image.bytes),
                },
            });
        }
        GeminiRequest {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiGenerationConfig {
                temperature: Some(options.temperature),
                max_output_tokens: options.max_output_tokens,
            },
        }
    }

    fn extract_text(response: GeminiResponse) -> Result<String, ClassifierError> {
        let candidate = match response.candidates.into_iter().next() {
            Some(candidate) => candidate,
            None => {
                let reason = response
                    .prompt_feedback
                    .and_then(|f| f.block_reason)
                    .unwrap_or_else(|| "no candidates returned".to_string());
                return Err(ClassifierError::Blocked(reason));
            }
        };

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ClassifierError::InvalidResponse(format!(
                "Candidate has no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(text)
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        image: Option<&ImageInput>,
        options: &GenerationOptions,
    ) -> Result<String, ClassifierError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = Self::build_request(prompt, image, options);

        debug!(
            model = %self.model,
            has_image = image.is_some(),
            image_bytes = image.map(|i| i.bytes.len()).unwrap_or(0),
            "Sending generateContent request to Gemini"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifierError::Timeout
                } else {
                    ClassifierError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ClassifierError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            ClassifierError::InvalidResponse(format!("Failed to parse Gemini response: {}", e))
        })?;

        let text = Self::extract_text(gemini_response)?;
        debug!(model = %self.model, response_len = text.len(), "Received Gemini response");
        Ok(text)
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    InlineData { inline_data: GeminiBlob },
}

#[derive(Debug, Serialize)]
struct GeminiBlob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}
