//! Summarization provider trait and implementations.

pub mod gemini;
pub mod mock;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub use gemini::GeminiClient;
pub use mock::{MockResponse, MockSummarizer, RecordedCall};

/// MIME type sent alongside every document.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Everything a provider needs for one call.
#[derive(Debug, Clone, Copy)]
pub struct SummaryRequest<'a> {
    pub file_name: &'a str,
    pub bytes: &'a [u8],
    pub mime_type: &'a str,
    pub prompt: &'a str,
    pub model: &'a str,
    pub temperature: f64,
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request blocked by provider: {0}")]
    Blocked(String),
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
    #[error("provider returned no text")]
    EmptyResponse,
    #[error("{0}")]
    Other(String),
}

/// A generative model that turns a document plus a prompt into text.
///
/// One call is one attempt: implementations do not retry, stream, or return
/// partial text.
pub trait Summarizer: Send + Sync {
    /// Human-readable provider name (e.g. "Gemini").
    fn name(&self) -> &str;

    fn summarize<'a>(
        &'a self,
        request: SummaryRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, ProviderError>> + Send + 'a>>;
}
