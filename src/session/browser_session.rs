//! Chromium-backed browser session
//!
//! Wraps the launched browser, its CDP handler task and the profile
//! directory. `close()` is the explicit teardown; `Drop` is the fallback for
//! paths where the session future is cancelled (pipeline timeout, client
//! disconnect) and guarantees the handler is aborted and the Chrome process
//! killed.

use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::SetCookiesParams;
use chromiumoxide::page::Page;
use log::{debug, warn};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::info;

use super::cookie::AuthCookie;
use super::settle::{SettleObservation, SettleTracker, SettleVerdict, probe_script};
use crate::browser_setup::launch_session_browser;
use crate::config::SessionConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::retry::with_timeout;

/// Outcome of the explicit teardown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupResult {
    Success,
    PartialFailure(Vec<String>),
}

pub struct BrowserSession {
    browser: Option<Browser>,
    handler: JoinHandle<()>,
    page: Page,
    profile: Option<TempDir>,
    page_load_timeout_secs: u64,
    navigation_timeout_secs: u64,
}

impl BrowserSession {
    /// Launch the browser and prepare a blank page with the configured viewport.
    ///
    /// Any failure here is a [`ScrapeError::Launch`].
    pub async fn open(config: &SessionConfig) -> ScrapeResult<Self> {
        let launched = launch_session_browser(config)
            .await
            .map_err(|e| ScrapeError::Launch(format!("{e:#}")))?;

        let page = match launched.browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let mut browser = launched.browser;
                let _ = browser.close().await;
                let _ = browser.wait().await;
                launched.handler.abort();
                return Err(ScrapeError::Launch(format!("Failed to create page: {e}")));
            }
        };

        let session = Self {
            browser: Some(launched.browser),
            handler: launched.handler,
            page,
            profile: launched.temp_profile,
            page_load_timeout_secs: config.page_load_timeout_secs(),
            navigation_timeout_secs: config.navigation_timeout_secs(),
        };

        let viewport = config.viewport();
        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(viewport.width))
            .height(i64::from(viewport.height))
            .device_scale_factor(viewport.device_scale_factor)
            .mobile(viewport.mobile)
            .build()
            .map_err(ScrapeError::Launch)?;
        if let Err(e) = session.page.execute(metrics).await {
            warn!(target: "feed_digest::session", "Failed to apply viewport: {e}");
        }

        info!("Browser session opened");
        Ok(session)
    }

    /// Install the auth cookie before the first navigation.
    pub async fn set_auth_cookie(&self, target_url: &str, token: &str) -> ScrapeResult<()> {
        let cookie = AuthCookie::for_target(target_url, token, chrono::Utc::now())
            .to_cdp()
            .map_err(|e| ScrapeError::Other(format!("Invalid auth cookie: {e}")))?;
        let domain = cookie.domain.clone().unwrap_or_default();

        self.page
            .execute(SetCookiesParams::new(vec![cookie]))
            .await
            .map_err(|e| ScrapeError::Other(format!("Failed to set auth cookie: {e}")))?;

        debug!(target: "feed_digest::session", "Auth cookie installed for {domain}");
        Ok(())
    }

    /// Navigate and wait for the load event, each step bounded by its timeout.
    pub async fn navigate(&self, url: &str) -> ScrapeResult<()> {
        let page = &self.page;
        with_timeout(
            async {
                page.goto(url).await.map_err(|e| ScrapeError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
                Ok(())
            },
            self.page_load_timeout_secs,
            "Page navigation",
        )
        .await?;

        with_timeout(
            async {
                page.wait_for_navigation()
                    .await
                    .map_err(|e| ScrapeError::Navigation {
                        url: url.to_string(),
                        message: e.to_string(),
                    })?;
                Ok(())
            },
            self.navigation_timeout_secs,
            "Page load",
        )
        .await?;

        info!(url, "Page loaded");
        Ok(())
    }

    /// Poll until the content markers are present and stable, or give up after
    /// `max_wait_secs` and proceed with whatever has rendered.
    ///
    /// Returns the last marker count observed.
    pub async fn wait_for_stable(&self, config: &SessionConfig) -> usize {
        let settle = config.settle();
        let script = probe_script(&settle.marker_selector);
        let mut tracker = SettleTracker::new(settle);
        let start = Instant::now();
        let max_wait = Duration::from_secs(settle.max_wait_secs);
        let poll_interval = Duration::from_millis(settle.poll_interval_ms);

        loop {
            match self.page.evaluate(script.as_str()).await {
                Ok(result) => match result.into_value::<SettleObservation>() {
                    Ok(observation) => {
                        if let SettleVerdict::Settled { markers } = tracker.observe(observation) {
                            info!(
                                markers,
                                elapsed_ms = start.elapsed().as_millis() as u64,
                                "Content settled"
                            );
                            return markers;
                        }
                    }
                    Err(e) => debug!(target: "feed_digest::session", "Unreadable settle probe: {e}"),
                },
                Err(e) => debug!(target: "feed_digest::session", "Settle probe failed: {e}, retrying"),
            }

            if start.elapsed() >= max_wait {
                warn!(
                    target: "feed_digest::session",
                    "Content did not settle within {}s, proceeding with {} markers",
                    settle.max_wait_secs,
                    tracker.last_markers()
                );
                return tracker.last_markers();
            }

            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Serialized DOM of the current page
    pub async fn snapshot(&self) -> ScrapeResult<String> {
        self.page
            .content()
            .await
            .map_err(|e| ScrapeError::Extraction(format!("Failed to read page content: {e}")))
    }

    /// Explicit teardown: close the browser, wait for the process to exit,
    /// stop the handler and remove the temporary profile.
    pub async fn close(mut self) -> CleanupResult {
        let mut errors = Vec::new();

        if let Some(mut browser) = self.browser.take() {
            debug!(target: "feed_digest::session", "Closing browser");
            if let Err(e) = browser.close().await {
                warn!(target: "feed_digest::session", "Failed to close browser: {e}");
                errors.push(format!("Browser close failed: {e}"));
            }
            if let Err(e) = browser.wait().await {
                warn!(target: "feed_digest::session", "Failed to wait for browser exit: {e}");
                errors.push(format!("Browser wait failed: {e}"));
            }
        }

        self.handler.abort();

        if let Some(profile) = self.profile.take() {
            let path = profile.path().to_path_buf();
            if let Err(e) = profile.close() {
                warn!(target: "feed_digest::session", "Failed to remove profile {}: {e}", path.display());
                errors.push(format!("Directory cleanup failed: {e}"));
            }
        }

        if errors.is_empty() {
            info!("Browser session closed");
            CleanupResult::Success
        } else {
            CleanupResult::PartialFailure(errors)
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
        if self.browser.is_some() {
            warn!(target: "feed_digest::session", "BrowserSession dropped without close(); killing browser");
            // Browser::drop kills the child process
            self.browser = None;
        }
        // Dropping the guard removes the profile directory
        self.profile = None;
    }
}
