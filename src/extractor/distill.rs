//! Plain-text distillation of a content card.
//!
//! Keeps the prose of a card and drops its chrome:
//! 1. Prefer the dedicated rich-text container when the card has one
//! 2. Otherwise render the whole card, skipping author, timestamp, action
//!    bar, buttons, icons and scripts
//! 3. Block elements and `<br>` become line breaks; whitespace inside a line
//!    is collapsed and blank lines are dropped

use ego_tree::NodeId;
use scraper::{ElementRef, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Maximum element nesting walked while rendering text.
///
/// Feed cards nest 20-30 levels deep; anything beyond this is truncated with a
/// warning rather than risking the stack.
const MAX_NESTING_DEPTH: usize = 100;

static RICH_TEXT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[data-testid='tweetText']")
        .expect("BUG: hardcoded CSS selector \"[data-testid='tweetText']\" is invalid")
});

static CHROME_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "[data-testid='User-Name'], time, [role='group'], button, svg, script, style, noscript",
    )
    .expect("BUG: hardcoded chrome selector list is invalid")
});

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption", "figure",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p",
    "pre", "section", "table", "tr", "ul",
];

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Readable text of a card, trimmed. Empty when the card carries no prose.
#[must_use]
pub fn distill_text(card: &ElementRef) -> String {
    if let Some(rich) = card.select(&RICH_TEXT_SELECTOR).next() {
        return render_text(&rich, &HashSet::new());
    }

    let to_remove: HashSet<NodeId> = card.select(&CHROME_SELECTOR).map(|el| el.id()).collect();
    render_text(card, &to_remove)
}

/// Render the text of `root` with line structure, skipping the subtrees in
/// `to_remove`.
pub(crate) fn render_text(root: &ElementRef, to_remove: &HashSet<NodeId>) -> String {
    let mut raw = String::new();
    collect_text(root, to_remove, &mut raw, 0);
    normalize_lines(&raw)
}

fn collect_text(element: &ElementRef, to_remove: &HashSet<NodeId>, output: &mut String, depth: usize) {
    if depth > MAX_NESTING_DEPTH {
        tracing::warn!(
            element = element.value().name(),
            max_depth = MAX_NESTING_DEPTH,
            "Card nesting too deep, truncating text"
        );
        return;
    }

    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            output.push_str(text);
            continue;
        }

        let Some(child_el) = ElementRef::wrap(child) else {
            continue;
        };
        if to_remove.contains(&child_el.id()) {
            continue;
        }

        let name = child_el.value().name();
        if SKIPPED_TAGS.contains(&name) {
            continue;
        }
        match name {
            "br" => output.push('\n'),
            // Emoji are rendered as images whose alt text is the character
            "img" => {
                if let Some(alt) = child_el.value().attr("alt") {
                    output.push_str(alt);
                }
            }
            _ if BLOCK_TAGS.contains(&name) => {
                output.push('\n');
                collect_text(&child_el, to_remove, output, depth + 1);
                output.push('\n');
            }
            _ => collect_text(&child_el, to_remove, output, depth + 1),
        }
    }
}

fn normalize_lines(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
