//! Field extraction for a single content card

use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use url::Url;
use xxhash_rust::xxh3::xxh3_64;

use super::distill::distill_text;
use crate::record::Record;
use crate::utils::resolve_href;

static USER_NAME_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[data-testid='User-Name']")
        .expect("BUG: hardcoded CSS selector \"[data-testid='User-Name']\" is invalid")
});

static TIME_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("time").expect("BUG: hardcoded CSS selector 'time' is invalid")
});

/// Build a [`Record`] from one card. Never fails: missing parts become empty
/// strings and a missing permalink becomes a synthetic key.
pub(crate) fn record_from_card(card: &ElementRef, base: &Url) -> Record {
    let username = card
        .select(&USER_NAME_SELECTOR)
        .next()
        .map(|el| username_text(&el))
        .unwrap_or_default();

    let time = card.select(&TIME_SELECTOR).next();
    let timestamp = time
        .and_then(|t| t.value().attr("datetime"))
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let text = distill_text(card);

    let permalink = time
        .and_then(|t| t.parent())
        .and_then(ElementRef::wrap)
        .and_then(|link| link.value().attr("href"))
        .and_then(|href| resolve_href(base, href))
        .unwrap_or_else(|| synthetic_permalink(base, &username, &text, &timestamp));

    Record {
        username,
        text,
        timestamp,
        permalink,
    }
}

/// Visible author text: display name and handle, without the relative time
/// label that sits in the same subtree.
fn username_text(user_name: &ElementRef) -> String {
    let mut parts = Vec::new();
    for node in user_name.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let inside_time = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take_while(|el| el.id() != user_name.id())
            .any(|el| el.value().name() == "time");
        if inside_time {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() && !is_separator(trimmed) {
            parts.push(trimmed);
        }
    }
    parts.join(" ")
}

/// Text made only of punctuation such as the `·` between handle and time
fn is_separator(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_ascii_punctuation() || matches!(c, '·' | '•' | '|' | '–' | '—'))
}

/// Stable key for a card without a usable link: the feed origin with a
/// fragment derived from the card's content. Identical cards map to the same
/// key, so repeated scrapes still dedupe.
pub fn synthetic_permalink(base: &Url, username: &str, text: &str, timestamp: &str) -> String {
    let digest = xxh3_64(format!("{username}\u{1f}{text}\u{1f}{timestamp}").as_bytes());
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(Some(&format!("card-{}", hex::encode(digest.to_be_bytes()))));
    url.into()
}
