//! One orchestrator for both request modes.
//!
//! A run acquires a session slot, opens the browser session, drives it through
//! navigation, settle and extraction, persists the records and (in synchronous
//! mode) summarizes them. Teardown happens on every path once the session is
//! open, and the whole run is bounded by the pipeline timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::stages::{PipelineStage, StageReporter, TracingProgress};
use crate::config::{ScrapeMode, ServiceConfig, SessionConfig, SummarizerSettings, SummaryScope};
use crate::error::{ScrapeError, ScrapeResult};
use crate::extractor::RecordExtractor;
use crate::record::Record;
use crate::session::SessionDriver;
use crate::store::RecordStore;
use crate::summarizer::Summarizer;

/// Everything one scrape needs
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub session: SessionConfig,
    /// Required in synchronous mode, ignored in detached mode
    pub summarizer: Option<SummarizerSettings>,
    pub mode: ScrapeMode,
}

impl ScrapeRequest {
    #[must_use]
    pub fn synchronous(session: SessionConfig, summarizer: SummarizerSettings) -> Self {
        Self {
            session,
            summarizer: Some(summarizer),
            mode: ScrapeMode::Synchronous,
        }
    }

    #[must_use]
    pub fn detached(session: SessionConfig) -> Self {
        Self {
            session,
            summarizer: None,
            mode: ScrapeMode::Detached,
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// Every extracted record, in document order
    pub records: Vec<Record>,
    pub inserted: usize,
    pub skipped: usize,
    /// Set when persistence failed in synchronous mode
    pub store_error: Option<String>,
    /// Provider text, synchronous mode only
    pub summary: Option<String>,
}

/// What `submit` hands back to the caller
#[derive(Debug)]
pub enum Submission {
    /// Synchronous run finished
    Completed(PipelineReport),
    /// Detached run started; the handle resolves when it finishes
    Acknowledged(JoinHandle<()>),
}

pub struct PipelineOrchestrator<D: SessionDriver> {
    driver: D,
    store: RecordStore,
    summarizer: Summarizer,
    sessions: Semaphore,
    pipeline_timeout: Duration,
    summary_scope: SummaryScope,
    reporter: Arc<dyn StageReporter>,
}

impl<D: SessionDriver> PipelineOrchestrator<D> {
    #[must_use]
    pub fn new(driver: D, store: RecordStore, service: &ServiceConfig) -> Self {
        Self {
            driver,
            store,
            summarizer: Summarizer::new().with_retry(service.summary_retry),
            sessions: Semaphore::new(service.max_sessions.max(1)),
            pipeline_timeout: Duration::from_secs(service.pipeline_timeout_secs),
            summary_scope: service.summary_scope,
            reporter: Arc::new(TracingProgress),
        }
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn StageReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Session slots not currently in use
    #[must_use]
    pub fn available_sessions(&self) -> usize {
        self.sessions.available_permits()
    }

    /// Reject requests that cannot succeed before any browser is launched
    pub fn validate(request: &ScrapeRequest) -> ScrapeResult<()> {
        if request.mode == ScrapeMode::Synchronous
            && request
                .summarizer
                .as_ref()
                .is_none_or(|s| s.api_key.trim().is_empty())
        {
            return Err(ScrapeError::Config(
                "An API key for the summarizer is required in synchronous mode".to_string(),
            ));
        }
        Ok(())
    }

    /// Run the pipeline to completion in the caller's task.
    ///
    /// Failures are logged with the stage they occurred in before being
    /// returned.
    pub async fn run(&self, request: ScrapeRequest) -> ScrapeResult<PipelineReport> {
        Self::validate(&request)?;
        let target = request.session.target_url().to_string();

        let _permit = self
            .sessions
            .acquire()
            .await
            .map_err(|_| ScrapeError::Other("Session pool closed".to_string()))?;

        let started = Instant::now();
        let mut stage = PipelineStage::Idle;
        self.reporter.report_stage(stage);

        self.enter(&mut stage, PipelineStage::Launching);
        let mut handle =
            match tokio::time::timeout(self.pipeline_timeout, self.driver.open(&request.session))
                .await
            {
                Ok(Ok(handle)) => handle,
                Ok(Err(e)) => return Err(self.fail(stage, &target, e)),
                Err(_) => return Err(self.fail(stage, &target, self.timeout_error())),
            };

        let remaining = self.pipeline_timeout.saturating_sub(started.elapsed());
        let outcome =
            match tokio::time::timeout(remaining, self.drive(&mut handle, &request, &mut stage))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(self.timeout_error()),
            };
        let last_stage = stage;

        self.enter(&mut stage, PipelineStage::Closing);
        self.driver.close(handle).await;

        match outcome {
            Ok(report) => {
                self.enter(&mut stage, PipelineStage::Done);
                info!(
                    target_url = %target,
                    records = report.records.len(),
                    inserted = report.inserted,
                    skipped = report.skipped,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Scrape pipeline finished"
                );
                Ok(report)
            }
            Err(e) => Err(self.fail(last_stage, &target, e)),
        }
    }

    /// Start a detached run and return immediately. Errors are logged, never
    /// returned.
    pub fn spawn_detached(self: &Arc<Self>, request: ScrapeRequest) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            if let Ok(report) = orchestrator.run(request).await {
                debug!(
                    inserted = report.inserted,
                    skipped = report.skipped,
                    "Detached scrape persisted"
                );
            }
        })
    }

    /// Serve a request in its mode: synchronous runs complete before
    /// returning, detached runs are acknowledged at once.
    pub async fn submit(self: &Arc<Self>, request: ScrapeRequest) -> ScrapeResult<Submission> {
        Self::validate(&request)?;
        match request.mode {
            ScrapeMode::Synchronous => self.run(request).await.map(Submission::Completed),
            ScrapeMode::Detached => Ok(Submission::Acknowledged(self.spawn_detached(request))),
        }
    }

    async fn drive(
        &self,
        handle: &mut D::Handle,
        request: &ScrapeRequest,
        stage: &mut PipelineStage,
    ) -> ScrapeResult<PipelineReport> {
        let config = &request.session;

        self.enter(stage, PipelineStage::Navigating);
        self.driver
            .set_auth_cookie(handle, config.target_url(), config.auth_token())
            .await?;
        self.navigate_with_retry(handle, config).await?;

        self.enter(stage, PipelineStage::Waiting);
        let markers = self.driver.wait_for_stable(handle, config).await;
        debug!(markers, "Content wait finished");

        self.enter(stage, PipelineStage::Extracting);
        let markup = match self.driver.snapshot(handle).await {
            Ok(markup) => markup,
            Err(e) => {
                warn!(error = %e, "Snapshot failed, continuing with no records");
                String::new()
            }
        };
        let records = RecordExtractor::for_target(config.target_url()).extract(&markup);
        self.reporter.report_records(records.len());
        for record in &records {
            debug!(permalink = %record.permalink, "Extracted record\n{}", record.to_markdown());
        }

        self.enter(stage, PipelineStage::Deduplicating);
        let mut report = PipelineReport {
            records,
            ..PipelineReport::default()
        };
        let new_records = match self.store.persist_all(&report.records).await {
            Ok(persisted) => {
                report.inserted = persisted.inserted.len();
                report.skipped = persisted.skipped;
                Some(persisted.inserted)
            }
            Err(e) => {
                let err = ScrapeError::Store(format!("{e:#}"));
                if request.mode == ScrapeMode::Detached {
                    return Err(err);
                }
                warn!(error = %err, "Persistence failed, continuing without it");
                report.store_error = Some(err.to_string());
                None
            }
        };

        if request.mode == ScrapeMode::Synchronous {
            let settings = request.summarizer.as_ref().ok_or_else(|| {
                ScrapeError::Config("Summarizer settings missing".to_string())
            })?;

            self.enter(stage, PipelineStage::Summarizing);
            let selected = select_for_summary(self.summary_scope, &report.records, new_records.as_deref());
            let summary = self.summarizer.summarize_with_retry(selected, settings).await?;
            report.summary = Some(summary);
        }

        Ok(report)
    }

    /// Navigation under the session's retry policy. Not `retry::with_retry`:
    /// each attempt borrows the handle mutably, and an `FnMut` closure cannot
    /// hand that borrow to the future it returns.
    async fn navigate_with_retry(&self, handle: &mut D::Handle, config: &SessionConfig) -> ScrapeResult<()> {
        let policy = config.navigation_retry();
        let attempts = policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.driver.navigate(handle, config.target_url()).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts && e.is_retryable() => {
                    attempt += 1;
                    warn!(attempt, max_attempts = attempts, error = %e, "Navigation failed, retrying");
                    tokio::time::sleep(policy.delay_for(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn enter(&self, stage: &mut PipelineStage, next: PipelineStage) {
        *stage = next;
        self.reporter.report_stage(next);
    }

    fn fail(&self, stage: PipelineStage, target: &str, err: ScrapeError) -> ScrapeError {
        self.reporter.report_failure(stage, &err);
        self.reporter.report_stage(PipelineStage::Failed);
        error!(
            target_url = %target,
            stage = %stage,
            kind = err.kind(),
            error = %err,
            "Scrape pipeline failed"
        );
        err
    }

    fn timeout_error(&self) -> ScrapeError {
        ScrapeError::Timeout {
            operation: "Scrape pipeline".to_string(),
            secs: self.pipeline_timeout.as_secs(),
        }
    }
}

/// Records handed to the summarizer. `NewOnly` falls back to every record
/// when persistence failed and the new ones are unknown.
fn select_for_summary<'a>(
    scope: SummaryScope,
    all: &'a [Record],
    inserted: Option<&'a [Record]>,
) -> &'a [Record] {
    match (scope, inserted) {
        (SummaryScope::NewOnly, Some(new)) => new,
        _ => all,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionConfig {
        SessionConfig::builder()
            .target_url("https://twitter.com/i/lists/1")
            .auth_token("token")
            .build()
            .unwrap()
    }

    struct NeverDriver;

    impl SessionDriver for NeverDriver {
        type Handle = ();

        async fn open(&self, _config: &SessionConfig) -> ScrapeResult<()> {
            Err(ScrapeError::Launch("not available in unit tests".into()))
        }
        async fn set_auth_cookie(&self, _h: &mut (), _t: &str, _token: &str) -> ScrapeResult<()> {
            Ok(())
        }
        async fn navigate(&self, _h: &mut (), _url: &str) -> ScrapeResult<()> {
            Ok(())
        }
        async fn wait_for_stable(&self, _h: &mut (), _c: &SessionConfig) -> usize {
            0
        }
        async fn snapshot(&self, _h: &mut ()) -> ScrapeResult<String> {
            Ok(String::new())
        }
        async fn close(&self, _h: ()) {}
    }

    #[test]
    fn test_synchronous_requires_api_key() {
        let missing = ScrapeRequest {
            session: session(),
            summarizer: None,
            mode: ScrapeMode::Synchronous,
        };
        assert!(matches!(
            PipelineOrchestrator::<NeverDriver>::validate(&missing),
            Err(ScrapeError::Config(_))
        ));

        let blank = ScrapeRequest::synchronous(session(), SummarizerSettings::new("  "));
        assert!(PipelineOrchestrator::<NeverDriver>::validate(&blank).is_err());

        let detached = ScrapeRequest::detached(session());
        assert!(PipelineOrchestrator::<NeverDriver>::validate(&detached).is_ok());
    }

    #[test]
    fn test_summary_selection() {
        let all = vec![
            Record::new("a", "1", "", "https://twitter.com/a/status/1"),
            Record::new("b", "2", "", "https://twitter.com/b/status/2"),
        ];
        let new = vec![all[1].clone()];

        assert_eq!(select_for_summary(SummaryScope::All, &all, Some(&new)).len(), 2);
        assert_eq!(select_for_summary(SummaryScope::NewOnly, &all, Some(&new)), &new[..]);
        assert_eq!(select_for_summary(SummaryScope::NewOnly, &all, None).len(), 2);
    }

    #[tokio::test]
    async fn test_launch_failure_is_reported() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let store = RecordStore::open(&dir.path().join("records.sqlite")).await?;
        let orchestrator = PipelineOrchestrator::new(NeverDriver, store, &ServiceConfig::default());

        let result = orchestrator.run(ScrapeRequest::detached(session())).await;
        assert!(matches!(result, Err(ScrapeError::Launch(_))));
        assert_eq!(orchestrator.available_sessions(), 2);
        Ok(())
    }
}
