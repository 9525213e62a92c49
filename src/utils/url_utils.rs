//! URL helpers for feed targets, permalinks and cookie scoping.

use std::sync::LazyLock;
use url::{Host, Url};

use super::constants::DEFAULT_BASE_URL;

static DEFAULT_BASE: LazyLock<Url> = LazyLock::new(|| {
    Url::parse(DEFAULT_BASE_URL).expect("BUG: hardcoded DEFAULT_BASE_URL is invalid")
});

/// Check if a URL is an absolute http(s) URL
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    // Skip data URLs, javascript URLs, and other non-http schemes
    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some(),
        Err(_) => false,
    }
}

/// Origin of the feed (`scheme://host[:port]/`) that permalinks resolve against.
///
/// Falls back to [`DEFAULT_BASE_URL`] when the target cannot be parsed or has
/// no host.
#[must_use]
pub fn base_origin(target_url: &str) -> Url {
    Url::parse(target_url)
        .ok()
        .filter(|u| u.host_str().is_some())
        .and_then(|u| Url::parse(&u.origin().ascii_serialization()).ok())
        .unwrap_or_else(|| DEFAULT_BASE.clone())
}

/// Cookie domain covering the target host and its subdomains.
///
/// `https://mobile.twitter.com/i/lists/1` → `.twitter.com`. Only the
/// `www.` and `mobile.` prefixes are stripped; other subdomains are kept.
/// IP addresses and single-label hosts such as `localhost` cannot carry a
/// domain cookie and get the bare host instead.
#[must_use]
pub fn cookie_domain(target_url: &str) -> String {
    let origin = base_origin(target_url);
    match origin.host() {
        Some(Host::Domain(domain)) if domain.contains('.') => {
            let host = domain.to_lowercase();
            let host = host
                .strip_prefix("www.")
                .or_else(|| host.strip_prefix("mobile."))
                .unwrap_or(&host);
            format!(".{host}")
        }
        Some(Host::Domain(domain)) => domain.to_lowercase(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => format!("[{ip}]"),
        None => String::new(),
    }
}

/// Whether cookies for the target must be marked `Secure`: only https
/// targets, since browsers never send secure cookies over plain http.
#[must_use]
pub fn is_secure_target(target_url: &str) -> bool {
    base_origin(target_url).scheme() == "https"
}

/// Resolve an `href` found in the markup against the feed origin.
///
/// Returns `None` for empty or unresolvable references.
#[must_use]
pub fn resolve_href(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(String::from)
}
