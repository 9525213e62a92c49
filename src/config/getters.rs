//! Getter methods for `SessionConfig`

use std::path::{Path, PathBuf};

use super::types::{SessionConfig, SettleConfig, ViewportConfig};
use crate::retry::RetryPolicy;

impl SessionConfig {
    #[must_use]
    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    #[must_use]
    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    #[must_use]
    pub fn browser_path(&self) -> Option<&Path> {
        self.browser_path.as_deref()
    }

    #[must_use]
    pub fn proxy_url(&self) -> Option<&str> {
        self.proxy_url.as_deref()
    }

    #[must_use]
    pub fn viewport(&self) -> &ViewportConfig {
        &self.viewport
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn page_load_timeout_secs(&self) -> u64 {
        self.page_load_timeout_secs
    }

    #[must_use]
    pub fn navigation_timeout_secs(&self) -> u64 {
        self.navigation_timeout_secs
    }

    #[must_use]
    pub fn settle(&self) -> &SettleConfig {
        &self.settle
    }

    #[must_use]
    pub fn navigation_retry(&self) -> RetryPolicy {
        self.navigation_retry
    }

    #[must_use]
    pub fn chrome_data_dir(&self) -> Option<&PathBuf> {
        self.chrome_data_dir.as_ref()
    }
}
