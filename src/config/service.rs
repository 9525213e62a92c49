//! Process-level settings for the HTTP service
//!
//! Read once at startup from `FEED_DIGEST_*` environment variables; every
//! value has a default so the service starts with no configuration at all.

use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

use super::types::SummaryScope;
use crate::retry::RetryPolicy;
use crate::utils::DEFAULT_PORT;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// SQLite file holding the `records` table
    pub db_path: PathBuf,
    /// Upper bound on concurrently running browser sessions
    pub max_sessions: usize,
    /// Upper bound on one pipeline run, teardown excluded
    pub pipeline_timeout_secs: u64,
    pub headless: bool,
    pub summary_scope: SummaryScope,
    pub summary_retry: RetryPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            db_path: PathBuf::from("./feed_digest.sqlite"),
            max_sessions: 2,
            pipeline_timeout_secs: 180,
            headless: true,
            summary_scope: SummaryScope::All,
            summary_retry: RetryPolicy::none(),
        }
    }
}

impl ServiceConfig {
    /// Build from `FEED_DIGEST_*` environment variables, falling back to defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (used by `from_env` and tests)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let summary_scope = match lookup("FEED_DIGEST_SUMMARY_SCOPE").as_deref() {
            Some("new_only") | Some("new") => SummaryScope::NewOnly,
            Some("all") | None => SummaryScope::All,
            Some(other) => {
                warn!(value = other, "Unknown FEED_DIGEST_SUMMARY_SCOPE, using 'all'");
                SummaryScope::All
            }
        };

        let summary_attempts = parse_or(
            &lookup,
            "FEED_DIGEST_SUMMARY_ATTEMPTS",
            defaults.summary_retry.max_attempts,
        );

        Self {
            host: lookup("FEED_DIGEST_HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "FEED_DIGEST_PORT", defaults.port),
            db_path: lookup("FEED_DIGEST_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            max_sessions: parse_or(&lookup, "FEED_DIGEST_MAX_SESSIONS", defaults.max_sessions)
                .max(1),
            pipeline_timeout_secs: parse_or(
                &lookup,
                "FEED_DIGEST_PIPELINE_TIMEOUT_SECS",
                defaults.pipeline_timeout_secs,
            ),
            headless: parse_or(&lookup, "FEED_DIGEST_HEADLESS", defaults.headless),
            summary_scope,
            summary_retry: RetryPolicy::new(summary_attempts.max(1), 2_000, 20_000),
        }
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Invalid value, using default");
            default
        }),
        None => default,
    }
}
