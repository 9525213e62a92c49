//! Content-settle detection
//!
//! The feed renders cards asynchronously after the load event. Instead of a
//! fixed sleep the session polls a small probe script and feeds each
//! observation into [`SettleTracker`], which decides when the card count has
//! stopped changing.

use serde::Deserialize;

use crate::config::SettleConfig;

/// Probe evaluated in the page. `{selector}` is replaced with the JSON-quoted
/// marker selector.
const PROBE_TEMPLATE: &str = r"
    (function() {
        return {
            readyState: document.readyState,
            markers: document.querySelectorAll({selector}).length
        };
    })()
";

/// Build the probe script for a marker selector
#[must_use]
pub fn probe_script(marker_selector: &str) -> String {
    let quoted = serde_json::to_string(marker_selector).unwrap_or_else(|_| "\"\"".to_string());
    PROBE_TEMPLATE.replace("{selector}", &quoted)
}

/// One probe result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SettleObservation {
    #[serde(rename = "readyState", deserialize_with = "ready_state_complete")]
    pub document_complete: bool,
    pub markers: usize,
}

fn ready_state_complete<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let state = String::deserialize(deserializer)?;
    Ok(state == "complete")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleVerdict {
    /// Keep polling
    Pending,
    /// Content present and stable
    Settled { markers: usize },
}

/// Tracks consecutive observations until the marker count stops changing
#[derive(Debug, Clone)]
pub struct SettleTracker {
    required_stable: u32,
    last_markers: Option<usize>,
    stable_count: u32,
}

impl SettleTracker {
    #[must_use]
    pub fn new(config: &SettleConfig) -> Self {
        Self {
            required_stable: config.stable_polls.max(1),
            last_markers: None,
            stable_count: 0,
        }
    }

    /// Record an observation and report whether the page has settled.
    ///
    /// An observation only counts toward stability when the document is
    /// complete and at least one marker is present; any change in the count
    /// restarts the streak.
    pub fn observe(&mut self, observation: SettleObservation) -> SettleVerdict {
        if !observation.document_complete || observation.markers == 0 {
            self.last_markers = None;
            self.stable_count = 0;
            return SettleVerdict::Pending;
        }

        if self.last_markers == Some(observation.markers) {
            self.stable_count += 1;
        } else {
            self.last_markers = Some(observation.markers);
            self.stable_count = 1;
        }

        if self.stable_count >= self.required_stable {
            SettleVerdict::Settled {
                markers: observation.markers,
            }
        } else {
            SettleVerdict::Pending
        }
    }

    /// Last non-zero marker count seen, for logging when the wait gives up
    #[must_use]
    pub fn last_markers(&self) -> usize {
        self.last_markers.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(complete: bool, markers: usize) -> SettleObservation {
        SettleObservation {
            document_complete: complete,
            markers,
        }
    }

    #[test]
    fn test_settles_after_stable_streak() {
        let mut tracker = SettleTracker::new(&SettleConfig::default());
        assert_eq!(tracker.observe(obs(false, 0)), SettleVerdict::Pending);
        assert_eq!(tracker.observe(obs(true, 0)), SettleVerdict::Pending);
        assert_eq!(tracker.observe(obs(true, 3)), SettleVerdict::Pending);
        assert_eq!(tracker.observe(obs(true, 7)), SettleVerdict::Pending);
        assert_eq!(
            tracker.observe(obs(true, 7)),
            SettleVerdict::Settled { markers: 7 }
        );
    }

    #[test]
    fn test_markers_disappearing_resets_streak() {
        let config = SettleConfig {
            stable_polls: 3,
            ..SettleConfig::default()
        };
        let mut tracker = SettleTracker::new(&config);
        tracker.observe(obs(true, 5));
        tracker.observe(obs(true, 5));
        assert_eq!(tracker.observe(obs(true, 0)), SettleVerdict::Pending);
        assert_eq!(tracker.last_markers(), 0);
        tracker.observe(obs(true, 5));
        tracker.observe(obs(true, 5));
        assert_eq!(
            tracker.observe(obs(true, 5)),
            SettleVerdict::Settled { markers: 5 }
        );
    }

    #[test]
    fn test_probe_deserializes() {
        let value = serde_json::json!({"readyState": "interactive", "markers": 4});
        let observation: SettleObservation = serde_json::from_value(value).unwrap();
        assert_eq!(observation, obs(false, 4));
    }

    #[test]
    fn test_probe_script_quotes_selector() {
        let script = probe_script("[data-testid=\"tweet\"]");
        assert!(script.contains(r#"querySelectorAll("[data-testid=\"tweet\"]")"#));
    }
}
