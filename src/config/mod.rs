//! Configuration module for scrape sessions and the service
//!
//! This module provides the per-request `SessionConfig` with its type-safe
//! builder, the summarizer settings, and the process-level `ServiceConfig`.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod service;
pub mod types;

// Re-exports for public API
pub use builder::{Complete, SessionConfigBuilder, WithTargetUrl};
pub use service::ServiceConfig;
pub use types::{
    ScrapeMode, SessionConfig, SettleConfig, SummarizerSettings, SummaryScope, ViewportConfig,
};
