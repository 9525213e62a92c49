//! Auth cookie construction
//!
//! The caller supplies a ready-made token; this module only decides how the
//! cookie is scoped and when it expires.

use chrono::{DateTime, Duration, Utc};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, TimeSinceEpoch};

use crate::utils::{AUTH_COOKIE_LIFETIME_SECS, AUTH_COOKIE_NAME, cookie_domain, is_secure_target};

#[derive(Debug, Clone, PartialEq)]
pub struct AuthCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Only https targets get a `Secure` cookie
    pub secure: bool,
    pub expires_at: DateTime<Utc>,
}

impl AuthCookie {
    /// Cookie for `target_url` issued at `issued_at`, valid for 7 days.
    #[must_use]
    pub fn for_target(target_url: &str, token: &str, issued_at: DateTime<Utc>) -> Self {
        Self {
            name: AUTH_COOKIE_NAME.to_string(),
            value: token.to_string(),
            domain: cookie_domain(target_url),
            path: "/".to_string(),
            secure: is_secure_target(target_url),
            expires_at: issued_at + Duration::seconds(AUTH_COOKIE_LIFETIME_SECS),
        }
    }

    /// CDP parameter for `Network.setCookies`. Expiry is in seconds since epoch.
    pub fn to_cdp(&self) -> Result<CookieParam, String> {
        CookieParam::builder()
            .name(self.name.clone())
            .value(self.value.clone())
            .domain(self.domain.clone())
            .path(self.path.clone())
            .secure(self.secure)
            .http_only(true)
            .expires(TimeSinceEpoch::new(self.expires_at.timestamp() as f64))
            .build()
    }
}
