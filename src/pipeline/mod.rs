//! Scrape pipeline: session → extraction → dedup → summary

pub mod orchestrator;
pub mod stages;

pub use orchestrator::{PipelineOrchestrator, PipelineReport, ScrapeRequest, Submission};
pub use stages::{PipelineStage, StageReporter, TracingProgress};
