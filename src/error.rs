//! Error taxonomy for the scrape pipeline
//!
//! Every stage converts its internal failures (CDP, sqlx, reqwest, anyhow
//! chains) into one of these variants at the component boundary so that the
//! orchestrator and the HTTP facade can decide on retry, teardown and status
//! codes without inspecting messages.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type ScrapeResult<T> = Result<T, ScrapeError>;

/// Error types for scrape operations
#[derive(Debug, Clone, Error)]
pub enum ScrapeError {
    /// Browser session could not start (bad executable path, invalid proxy).
    /// Fatal for the request.
    #[error("Failed to launch browser session: {0}")]
    Launch(String),

    /// Page failed to load
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// An operation exceeded its time budget
    #[error("{operation} timed out after {secs} seconds")]
    Timeout { operation: String, secs: u64 },

    /// Expected page structure missing or unreadable
    #[error("Record extraction failed: {0}")]
    Extraction(String),

    /// Summarization endpoint returned a non-success status
    #[error("Upstream summarizer error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// Persistence failure
    #[error("Record store error: {0}")]
    Store(String),

    /// Invalid request or configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for ScrapeError {
    fn from(err: anyhow::Error) -> Self {
        // {:#} keeps the full context chain
        Self::Other(format!("{err:#}"))
    }
}

impl ScrapeError {
    /// Whether a caller may reasonably retry the failed operation
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Navigation { .. } | Self::Timeout { .. } => true,
            Self::Upstream { status, .. } => *status == 429 || *status >= 500,
            Self::Launch(_)
            | Self::Extraction(_)
            | Self::Store(_)
            | Self::Config(_)
            | Self::Other(_) => false,
        }
    }

    /// Short machine-readable name for logs and error payloads
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Launch(_) => "launch",
            Self::Navigation { .. } => "navigation",
            Self::Timeout { .. } => "timeout",
            Self::Extraction(_) => "extraction",
            Self::Upstream { .. } => "upstream",
            Self::Store(_) => "store",
            Self::Config(_) => "config",
            Self::Other(_) => "other",
        }
    }
}
