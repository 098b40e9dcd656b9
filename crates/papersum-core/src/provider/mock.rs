//! Mock summarizer for testing.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use super::{ProviderError, Summarizer, SummaryRequest};

/// A configurable mock response for [`MockSummarizer`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Return this text.
    Text(String),
    /// Simulate a provider failure with this message.
    Error(String),
    /// Simulate a provider answer without any text.
    Empty,
}

/// One observed call, captured for assertions.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub file_name: String,
    pub byte_len: usize,
    pub mime_type: String,
    pub prompt: String,
    pub model: String,
    pub temperature: f64,
}

/// A hand-rolled mock implementing [`Summarizer`] for tests.
///
/// Supports:
/// - A fallback response used for every file, **or**
/// - Per-file overrides keyed by file name, so tests do not depend on
///   directory listing order.
/// - Optional per-call latency.
/// - A call log via [`calls()`](MockSummarizer::calls).
pub struct MockSummarizer {
    fallback: MockResponse,
    per_file: HashMap<String, MockResponse>,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockSummarizer {
    /// Create a mock that always returns `response`.
    pub fn new(response: MockResponse) -> Self {
        Self {
            fallback: response,
            per_file: HashMap::new(),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that answers every file with `text`.
    pub fn returning(text: impl Into<String>) -> Self {
        Self::new(MockResponse::Text(text.into()))
    }

    /// Use `response` for the file named `file_name`.
    pub fn with_response_for(
        mut self,
        file_name: impl Into<String>,
        response: MockResponse,
    ) -> Self {
        self.per_file.insert(file_name.into(), response);
        self
    }

    /// Set simulated latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Calls seen so far, in call order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl Summarizer for MockSummarizer {
    fn name(&self) -> &str {
        "Mock"
    }

    fn summarize<'a>(
        &'a self,
        request: SummaryRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, ProviderError>> + Send + 'a>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                file_name: request.file_name.to_string(),
                byte_len: request.bytes.len(),
                mime_type: request.mime_type.to_string(),
                prompt: request.prompt.to_string(),
                model: request.model.to_string(),
                temperature: request.temperature,
            });
        }
        let response = self
            .per_file
            .get(request.file_name)
            .unwrap_or(&self.fallback)
            .clone();
        let delay = self.delay;

        Box::pin(async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            match response {
                MockResponse::Text(text) => Ok(text),
                MockResponse::Error(msg) => Err(ProviderError::Other(msg)),
                MockResponse::Empty => Err(ProviderError::EmptyResponse),
            }
        })
    }
}
