//! Rendered markup → ordered records
//!
//! Extraction is a pure function of the markup and the feed origin: no I/O,
//! and the same input always yields the same records in document order.
//! Malformed cards degrade to partially empty records instead of failing the
//! whole page.

mod cards;
pub mod distill;

pub use cards::synthetic_permalink;
pub use distill::distill_text;

use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

use crate::record::Record;
use crate::utils::{CARD_SELECTOR, base_origin};

static CARD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(CARD_SELECTOR).expect("BUG: hardcoded CARD_SELECTOR is invalid")
});

/// Extracts records from feed snapshots of one origin
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    base: Url,
}

impl RecordExtractor {
    /// Extractor resolving permalinks against the origin of `target_url`
    #[must_use]
    pub fn for_target(target_url: &str) -> Self {
        Self::new(base_origin(target_url))
    }

    #[must_use]
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Every card in `markup`, in document order
    #[must_use]
    pub fn extract(&self, markup: &str) -> Vec<Record> {
        let document = Html::parse_document(markup);
        let records: Vec<Record> = document
            .select(&CARD)
            .map(|card| cards::record_from_card(&card, &self.base))
            .collect();

        tracing::debug!(
            cards = records.len(),
            base = %self.base,
            "Extracted records from snapshot"
        );
        records
    }
}

/// Convenience wrapper: extract with permalinks resolved against `base`
#[must_use]
pub fn extract_records(markup: &str, base: &Url) -> Vec<Record> {
    RecordExtractor::new(base.clone()).extract(markup)
}
