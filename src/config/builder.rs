//! Type-safe builder for `SessionConfig` using the typestate pattern
//!
//! The target URL and the auth token must both be supplied before `build()`
//! becomes available.

use anyhow::{Result, anyhow};
use std::marker::PhantomData;
use std::path::PathBuf;
use url::Url;

use super::types::{SessionConfig, SettleConfig, ViewportConfig};
use crate::retry::RetryPolicy;
use crate::utils::is_valid_url;

// Type states for the builder
pub struct WithTargetUrl;
pub struct Complete;

pub struct SessionConfigBuilder<State = ()> {
    pub(crate) target_url: Option<String>,
    pub(crate) auth_token: Option<String>,
    pub(crate) browser_path: Option<PathBuf>,
    pub(crate) proxy_url: Option<String>,
    pub(crate) viewport: ViewportConfig,
    pub(crate) headless: bool,
    pub(crate) page_load_timeout_secs: u64,
    pub(crate) navigation_timeout_secs: u64,
    pub(crate) settle: SettleConfig,
    pub(crate) navigation_retry: RetryPolicy,
    pub(crate) chrome_data_dir: Option<PathBuf>,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for SessionConfigBuilder<()> {
    fn default() -> Self {
        Self {
            target_url: None,
            auth_token: None,
            browser_path: None,
            proxy_url: None,
            viewport: ViewportConfig::default(),
            headless: true,
            page_load_timeout_secs: 30,
            navigation_timeout_secs: 30,
            settle: SettleConfig::default(),
            navigation_retry: RetryPolicy::default(),
            chrome_data_dir: None,
            _phantom: PhantomData,
        }
    }
}

impl SessionConfig {
    /// Create a builder for configuring a `SessionConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> SessionConfigBuilder<()> {
        SessionConfigBuilder::default()
    }
}

impl<S> SessionConfigBuilder<S> {
    fn transition<T>(self) -> SessionConfigBuilder<T> {
        SessionConfigBuilder {
            target_url: self.target_url,
            auth_token: self.auth_token,
            browser_path: self.browser_path,
            proxy_url: self.proxy_url,
            viewport: self.viewport,
            headless: self.headless,
            page_load_timeout_secs: self.page_load_timeout_secs,
            navigation_timeout_secs: self.navigation_timeout_secs,
            settle: self.settle,
            navigation_retry: self.navigation_retry,
            chrome_data_dir: self.chrome_data_dir,
            _phantom: PhantomData,
        }
    }

    #[must_use]
    pub fn browser_path(mut self, path: Option<impl Into<PathBuf>>) -> Self {
        self.browser_path = path.map(Into::into);
        self
    }

    #[must_use]
    pub fn proxy_url(mut self, proxy: Option<impl Into<String>>) -> Self {
        self.proxy_url = proxy
            .map(Into::into)
            .map(|p: String| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self
    }

    #[must_use]
    pub fn viewport(mut self, viewport: ViewportConfig) -> Self {
        self.viewport = viewport;
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    #[must_use]
    pub fn page_load_timeout_secs(mut self, secs: u64) -> Self {
        self.page_load_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn navigation_timeout_secs(mut self, secs: u64) -> Self {
        self.navigation_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn settle(mut self, settle: SettleConfig) -> Self {
        self.settle = settle;
        self
    }

    #[must_use]
    pub fn navigation_retry(mut self, policy: RetryPolicy) -> Self {
        self.navigation_retry = policy;
        self
    }

    #[must_use]
    pub fn chrome_data_dir(mut self, dir: Option<impl Into<PathBuf>>) -> Self {
        self.chrome_data_dir = dir.map(Into::into);
        self
    }
}

impl SessionConfigBuilder<()> {
    pub fn target_url(mut self, url: impl Into<String>) -> SessionConfigBuilder<WithTargetUrl> {
        self.target_url = Some(url.into().trim().to_string());
        self.transition()
    }
}

impl SessionConfigBuilder<WithTargetUrl> {
    pub fn auth_token(mut self, token: impl Into<String>) -> SessionConfigBuilder<Complete> {
        self.auth_token = Some(token.into().trim().to_string());
        self.transition()
    }
}

// Build method only available when all required fields are set
impl SessionConfigBuilder<Complete> {
    pub fn build(self) -> Result<SessionConfig> {
        let target_url = self
            .target_url
            .ok_or_else(|| anyhow!("target_url is required"))?;
        if !is_valid_url(&target_url) {
            return Err(anyhow!(
                "target_url must be an absolute http(s) URL, got '{target_url}'"
            ));
        }

        let auth_token = self
            .auth_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow!("auth_token must not be empty"))?;

        if let Some(proxy) = &self.proxy_url {
            let parsed = Url::parse(proxy).map_err(|e| anyhow!("Invalid proxy URL '{proxy}': {e}"))?;
            if parsed.host_str().is_none() {
                return Err(anyhow!("Invalid proxy URL '{proxy}': missing host"));
            }
        }

        if self.settle.poll_interval_ms == 0 {
            return Err(anyhow!("settle.poll_interval_ms must be greater than zero"));
        }

        Ok(SessionConfig {
            target_url,
            auth_token,
            browser_path: self.browser_path,
            proxy_url: self.proxy_url,
            viewport: self.viewport,
            headless: self.headless,
            page_load_timeout_secs: self.page_load_timeout_secs,
            navigation_timeout_secs: self.navigation_timeout_secs,
            settle: self.settle,
            navigation_retry: self.navigation_retry,
            chrome_data_dir: self.chrome_data_dir,
        })
    }
}
