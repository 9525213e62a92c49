//! Core configuration types for scrape sessions
//!
//! `SessionConfig` is built per request and discarded when the browser
//! session closes; nothing here is persisted.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::retry::RetryPolicy;
use crate::utils::{
    CARD_SELECTOR, DEFAULT_MODEL, DEFAULT_OPENAI_BASE, DEFAULT_SUMMARY_PROMPT, VIEWPORT_HEIGHT,
    VIEWPORT_SCALE, VIEWPORT_WIDTH,
};

/// Emulated device metrics applied to the page before navigation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    pub mobile: bool,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
            device_scale_factor: VIEWPORT_SCALE,
            mobile: true,
        }
    }
}

/// Bounded polling wait for dynamic content
///
/// The page counts as settled once `document.readyState` is `complete` and
/// the number of elements matching `marker_selector` is non-zero and has not
/// changed for `stable_polls` consecutive polls. After `max_wait_secs` the
/// wait gives up and the snapshot is taken anyway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettleConfig {
    pub marker_selector: String,
    pub max_wait_secs: u64,
    pub poll_interval_ms: u64,
    pub stable_polls: u32,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            marker_selector: CARD_SELECTOR.to_string(),
            max_wait_secs: 10,
            poll_interval_ms: 250,
            stable_polls: 2,
        }
    }
}

/// Main configuration struct for one browser session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Feed page to load. **INVARIANT:** absolute http(s) URL (validated in builder).
    pub(crate) target_url: String,
    #[serde(skip_serializing)]
    pub(crate) auth_token: String,
    /// Browser executable. When `None` the executable is discovered on the host.
    pub(crate) browser_path: Option<PathBuf>,
    pub(crate) proxy_url: Option<String>,
    pub(crate) viewport: ViewportConfig,
    pub(crate) headless: bool,

    /// Timeout in seconds for `page.goto()`
    ///
    /// Default: 30 seconds
    pub(crate) page_load_timeout_secs: u64,

    /// Timeout in seconds for `page.wait_for_navigation()`
    ///
    /// Default: 30 seconds
    pub(crate) navigation_timeout_secs: u64,

    pub(crate) settle: SettleConfig,

    /// Retry policy applied to navigation (goto + load wait)
    pub(crate) navigation_retry: RetryPolicy,

    /// Chrome user data directory. When `None` a unique temporary profile is
    /// created per session and removed when the session closes.
    pub(crate) chrome_data_dir: Option<PathBuf>,
}

/// Credentials and overrides for the chat-completion call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerSettings {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub prompt_template: Option<String>,
}

impl SummarizerSettings {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            model: None,
            prompt_template: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url.filter(|s| !s.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model.filter(|s| !s.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_prompt_template(mut self, prompt: Option<String>) -> Self {
        self.prompt_template = prompt.filter(|s| !s.trim().is_empty());
        self
    }

    /// Endpoint root, without the trailing `/chat/completions`
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_BASE)
            .trim_end_matches('/')
    }

    #[must_use]
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    #[must_use]
    pub fn prompt_template(&self) -> &str {
        self.prompt_template.as_deref().unwrap_or(DEFAULT_SUMMARY_PROMPT)
    }
}

/// How a scrape request is served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeMode {
    /// Run the whole pipeline inside the request and return the summary
    #[default]
    Synchronous,
    /// Acknowledge immediately; scrape and persist in the background
    Detached,
}

/// Which records a synchronous request summarizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryScope {
    /// Every extracted record, whether or not it was already stored
    #[default]
    All,
    /// Only records this run inserted for the first time
    NewOnly,
}
