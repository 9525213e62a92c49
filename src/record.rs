//! The unit of extracted content.

use serde::{Deserialize, Serialize};

/// One content card lifted from the rendered feed.
///
/// Records are created once by the extractor and never mutated; the store
/// either inserts them or rejects them as duplicates of an existing
/// `permalink`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub username: String,
    /// Plain readable text, trimmed
    pub text: String,
    /// ISO-8601 `datetime` of the card, empty when the card had no timestamp
    pub timestamp: String,
    /// Absolute URL; the dedup key
    pub permalink: String,
}

impl Record {
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        text: impl Into<String>,
        timestamp: impl Into<String>,
        permalink: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            text: text.into(),
            timestamp: timestamp.into(),
            permalink: permalink.into(),
        }
    }

    /// Line used inside the summary prompt: `username: text (source: permalink)`
    #[must_use]
    pub fn prompt_line(&self) -> String {
        format!("{}: {} (source: {})", self.username, self.text, self.permalink)
    }

    /// Markdown digest entry: linked author, quoted text, timestamp footer.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let quoted = self
            .text
            .lines()
            .map(|line| format!("> {line}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "### [{}]({})\n{}\n> --{}\n",
            self.username, self.permalink, quoted, self.timestamp
        )
    }
}
