//! Session driver: one browser session per scrape request
//!
//! The orchestrator talks to browsers only through [`SessionDriver`], so the
//! pipeline's stage ordering and teardown guarantees can be exercised without
//! launching Chrome.

pub mod browser_session;
pub mod cookie;
pub mod settle;

pub use browser_session::{BrowserSession, CleanupResult};
pub use cookie::AuthCookie;
pub use settle::{SettleObservation, SettleTracker, SettleVerdict};

use std::future::Future;

use crate::config::SessionConfig;
use crate::error::ScrapeResult;

/// Operations needed to turn a feed URL into rendered markup.
///
/// `close` consumes the handle and must be called on every exit path; the
/// orchestrator guarantees this.
pub trait SessionDriver: Send + Sync + 'static {
    type Handle: Send;

    fn open(&self, config: &SessionConfig) -> impl Future<Output = ScrapeResult<Self::Handle>> + Send;

    fn set_auth_cookie(
        &self,
        handle: &mut Self::Handle,
        target_url: &str,
        token: &str,
    ) -> impl Future<Output = ScrapeResult<()>> + Send;

    fn navigate(
        &self,
        handle: &mut Self::Handle,
        url: &str,
    ) -> impl Future<Output = ScrapeResult<()>> + Send;

    /// Suspend until dynamic content has rendered (bounded). Returns the number
    /// of content markers seen.
    fn wait_for_stable(
        &self,
        handle: &mut Self::Handle,
        config: &SessionConfig,
    ) -> impl Future<Output = usize> + Send;

    fn snapshot(&self, handle: &mut Self::Handle) -> impl Future<Output = ScrapeResult<String>> + Send;

    fn close(&self, handle: Self::Handle) -> impl Future<Output = ()> + Send;
}

/// Production driver backed by chromiumoxide
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumDriver;

impl SessionDriver for ChromiumDriver {
    type Handle = BrowserSession;

    async fn open(&self, config: &SessionConfig) -> ScrapeResult<BrowserSession> {
        BrowserSession::open(config).await
    }

    async fn set_auth_cookie(
        &self,
        handle: &mut BrowserSession,
        target_url: &str,
        token: &str,
    ) -> ScrapeResult<()> {
        handle.set_auth_cookie(target_url, token).await
    }

    async fn navigate(&self, handle: &mut BrowserSession, url: &str) -> ScrapeResult<()> {
        handle.navigate(url).await
    }

    async fn wait_for_stable(&self, handle: &mut BrowserSession, config: &SessionConfig) -> usize {
        handle.wait_for_stable(config).await
    }

    async fn snapshot(&self, handle: &mut BrowserSession) -> ScrapeResult<String> {
        handle.snapshot().await
    }

    async fn close(&self, handle: BrowserSession) {
        if let CleanupResult::PartialFailure(errors) = handle.close().await {
            log::warn!(target: "feed_digest::session", "Session teardown incomplete: {}", errors.join("; "));
        }
    }
}
