//! Pipeline state machine and stage reporting

use std::fmt;
use tracing::{debug, info, warn};

use crate::error::ScrapeError;

/// States a single scrape run moves through.
///
/// `Idle → Launching → Navigating → Waiting → Extracting → Deduplicating →
/// [Summarizing] → Closing → Done | Failed`. `Closing` is entered on every
/// path once a session has been opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Idle,
    Launching,
    Navigating,
    Waiting,
    Extracting,
    Deduplicating,
    Summarizing,
    Closing,
    Done,
    Failed,
}

impl PipelineStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Launching => "launching",
            Self::Navigating => "navigating",
            Self::Waiting => "waiting",
            Self::Extracting => "extracting",
            Self::Deduplicating => "deduplicating",
            Self::Summarizing => "summarizing",
            Self::Closing => "closing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer for pipeline progress.
///
/// Implementations must be cheap; they are called inline on the pipeline task.
pub trait StageReporter: Send + Sync {
    /// Called on every state transition, including the terminal one
    fn report_stage(&self, stage: PipelineStage);

    /// Called once after extraction
    fn report_records(&self, _extracted: usize) {}

    /// Called before `Failed` is reported, with the stage that failed
    fn report_failure(&self, _stage: PipelineStage, _error: &ScrapeError) {}
}

/// Reporter that logs every transition
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl StageReporter for TracingProgress {
    fn report_stage(&self, stage: PipelineStage) {
        debug!(stage = %stage, "Pipeline stage");
    }

    fn report_records(&self, extracted: usize) {
        info!(extracted, "Records extracted");
    }

    fn report_failure(&self, stage: PipelineStage, error: &ScrapeError) {
        warn!(stage = %stage, kind = error.kind(), error = %error, "Pipeline stage failed");
    }
}
