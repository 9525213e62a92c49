//! Chat-completion summarizer
//!
//! Renders records into a single user prompt and sends one request to
//! `{base_url}/chat/completions`. The response text is returned exactly as the
//! provider produced it.

pub mod types;

use thiserror::Error;
use tracing::{debug, info};

pub use types::{ChatMessage, ChatRequest, ChatResponse, Role};

use crate::config::SummarizerSettings;
use crate::error::{ScrapeError, ScrapeResult};
use crate::record::Record;
use crate::retry::{RetryPolicy, with_retry};
use crate::utils::SUMMARY_TEMPERATURE;

/// Errors from the summarization call
#[derive(Debug, Clone, Error)]
pub enum SummarizeError {
    /// Endpoint answered with a non-success status
    #[error("Summarizer returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Request never completed (DNS, connect, TLS, body read)
    #[error("Summarizer request failed: {0}")]
    Transport(String),

    /// Success status but the body is not a chat-completion response
    #[error("Malformed summarizer response: {0}")]
    MalformedResponse(String),
}

impl From<SummarizeError> for ScrapeError {
    fn from(err: SummarizeError) -> Self {
        match err {
            SummarizeError::Upstream { status, message } => Self::Upstream { status, message },
            other => Self::Other(other.to_string()),
        }
    }
}

/// Records plus the credentials and overrides for one summary
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub records: Vec<Record>,
    pub settings: SummarizerSettings,
}

/// Prompt sent to the model: one `username: text (source: permalink)` line
/// per record separated by blank lines, then the instruction block.
///
/// With no records the prompt is the instruction block alone.
#[must_use]
pub fn build_prompt(records: &[Record], template: &str) -> String {
    if records.is_empty() {
        return template.to_string();
    }
    let body = records
        .iter()
        .map(Record::prompt_line)
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{body}\n\n{template}")
}

/// Request body for a prompt under `settings`
#[must_use]
pub fn build_request(records: &[Record], settings: &SummarizerSettings) -> ChatRequest {
    ChatRequest {
        model: settings.model().to_string(),
        messages: vec![ChatMessage::user(build_prompt(records, settings.prompt_template()))],
        temperature: SUMMARY_TEMPERATURE,
    }
}

#[derive(Debug, Clone)]
pub struct Summarizer {
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl Default for Summarizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Summarizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            retry: RetryPolicy::none(),
        }
    }

    /// Retry policy for 429/5xx answers
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Single request, no retry.
    pub async fn summarize(
        &self,
        records: &[Record],
        settings: &SummarizerSettings,
    ) -> Result<String, SummarizeError> {
        let url = format!("{}/chat/completions", settings.base_url());
        let request = build_request(records, settings);

        debug!(model = %request.model, records = records.len(), "Chat completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SummarizeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SummarizeError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| SummarizeError::MalformedResponse(e.to_string()))?;

        let text = body.into_text();
        info!(chars = text.chars().count(), "Summary received");
        Ok(text)
    }

    /// [`Self::summarize`] under the configured retry policy
    pub async fn summarize_with_retry(
        &self,
        records: &[Record],
        settings: &SummarizerSettings,
    ) -> ScrapeResult<String> {
        with_retry(self.retry, "Summarize", move || async move {
            self.summarize(records, settings)
                .await
                .map_err(ScrapeError::from)
        })
        .await
    }

    pub async fn summarize_request(&self, request: &SummaryRequest) -> ScrapeResult<String> {
        self.summarize_with_retry(&request.records, &request.settings)
            .await
    }
}
