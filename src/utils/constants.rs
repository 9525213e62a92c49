//! Shared configuration constants for feed_digest
//!
//! Default values used throughout the codebase to keep session, summary and
//! service behavior consistent and avoid magic numbers.

/// Origin used to resolve relative permalinks when the target URL has none.
pub const DEFAULT_BASE_URL: &str = "https://twitter.com";

/// Name of the session cookie the feed expects.
pub const AUTH_COOKIE_NAME: &str = "auth_token";

/// Lifetime of the injected auth cookie: 7 days.
pub const AUTH_COOKIE_LIFETIME_SECS: i64 = 7 * 24 * 60 * 60;

/// Literal body returned to callers of detached scrapes.
pub const DETACHED_ACK: &str = "scraping";

/// Chat-completion endpoint root used when the caller supplies none.
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";

/// Model used when the caller supplies none.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-0125";

/// Sampling temperature sent with every summary request.
pub const SUMMARY_TEMPERATURE: f32 = 0.7;

/// Default instruction block appended after the rendered records.
///
/// Asks for a Chinese bullet-point digest with source links.
pub const DEFAULT_SUMMARY_PROMPT: &str = "将以上推文用中文总结成要点并附上相关链接";

/// CSS selector for one content card in the rendered feed.
pub const CARD_SELECTOR: &str = "[data-testid=\"tweet\"]";

/// Emulated phone viewport, matching the feed's mobile layout.
pub const VIEWPORT_WIDTH: u32 = 375;
pub const VIEWPORT_HEIGHT: u32 = 1000;
pub const VIEWPORT_SCALE: f64 = 3.0;

/// Default port for the HTTP facade.
pub const DEFAULT_PORT: u16 = 7540;

/// Chrome user agent string for the session browser
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
