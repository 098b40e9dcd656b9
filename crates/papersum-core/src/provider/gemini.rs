use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use super::{ProviderError, Summarizer, SummaryRequest};
use crate::credentials::ApiKey;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Longest slice of an error body kept in [`ProviderError::Status`].
const MAX_ERROR_BODY: usize = 500;

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    api_key: ApiKey,
    base_url: String,
    http: reqwest::Client,
}

impl GeminiClient {
    /// `base_url` defaults to [`DEFAULT_BASE_URL`]. `timeout` applies per request; `None` leaves requests unbounded.
    pub fn with_options(
        api_key: ApiKey,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        let mut builder = reqwest::Client::builder().user_agent("papersum");
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            http: builder.build()?,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

impl Summarizer for GeminiClient {
    fn name(&self) -> &str {
        "Gemini"
    }

    fn summarize<'a>(
        &'a self,
        request: SummaryRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            let body = build_request_body(&request);
            tracing::debug!(
                file = request.file_name,
                model = request.model,
                bytes = request.bytes.len(),
                "sending generateContent request"
            );

            let resp = self
                .http
                .post(self.endpoint(request.model))
                .header("x-goog-api-key", self.api_key.expose())
                .json(&body)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(ProviderError::Status {
                    status: status.as_u16(),
                    body: truncate(&text, MAX_ERROR_BODY),
                });
            }

            let parsed: GenerateContentResponse = resp
                .json()
                .await
                .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
            extract_text(parsed)
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Inline { inline_data: InlineData },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
}

fn build_request_body(request: &SummaryRequest<'_>) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![
                Part::Inline {
                    inline_data: InlineData {
                        mime_type: request.mime_type.to_string(),
                        data: STANDARD.encode(request.bytes),
                    },
                },
                Part::Text {
                    text: request.prompt.to_string(),
                },
            ],
        }],
        generation_config: GenerationConfig {
            temperature: request.temperature,
        },
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> Result<String, ProviderError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ProviderError::Blocked(reason));
    }
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        Err(ProviderError::EmptyResponse)
    } else {
        Ok(text)
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
