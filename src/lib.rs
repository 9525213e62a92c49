pub mod browser_setup;
pub mod config;
pub mod error;
pub mod extractor;
pub mod pipeline;
pub mod record;
pub mod retry;
pub mod server;
pub mod session;
pub mod store;
pub mod summarizer;
pub mod utils;

pub use browser_setup::{download_managed_browser, find_browser_executable, launch_session_browser};
pub use config::{
    ScrapeMode, ServiceConfig, SessionConfig, SettleConfig, SummarizerSettings, SummaryScope,
    ViewportConfig,
};
pub use error::{ScrapeError, ScrapeResult};
pub use extractor::{RecordExtractor, extract_records};
pub use pipeline::{
    PipelineOrchestrator, PipelineReport, PipelineStage, ScrapeRequest,
    StageReporter, Submission, TracingProgress,
};
pub use record::Record;
pub use retry::RetryPolicy;
pub use server::{ApiError, AppState, ScrapeForm, router};
pub use session::{BrowserSession, ChromiumDriver, SessionDriver};
pub use store::{InsertOutcome, PersistSummary, RecordStore};
pub use summarizer::{SummarizeError, Summarizer, SummaryRequest, build_prompt};

/// Scrape a feed and summarize it with the default Chromium driver.
///
/// Convenience for library callers that do not need the HTTP facade; records
/// are persisted to `store` like any synchronous run.
pub async fn scrape_and_summarize(
    session: SessionConfig,
    settings: SummarizerSettings,
    store: RecordStore,
) -> ScrapeResult<String> {
    let orchestrator = PipelineOrchestrator::new(ChromiumDriver, store, &ServiceConfig::default());
    let report = orchestrator
        .run(ScrapeRequest::synchronous(session, settings))
        .await?;
    Ok(report.summary.unwrap_or_default())
}
