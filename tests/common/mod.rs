//! Test utilities shared by the feed_digest integration tests

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use feed_digest::{
    PipelineStage, ScrapeError, ScrapeResult, SessionConfig, SessionDriver, StageReporter,
};
use tempfile::TempDir;

/// Creates a temporary directory for test output
#[allow(dead_code)]
pub fn create_test_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// One feed card in the markup shape the extractor expects
#[allow(dead_code)]
pub fn card_html(display_name: &str, handle: &str, status_path: Option<&str>, datetime: Option<&str>, text: &str) -> String {
    let time = datetime
        .map(|dt| format!(r#"<time datetime="{dt}">3h</time>"#))
        .unwrap_or_default();
    let time_link = match status_path {
        Some(path) => format!(r#"<a href="{path}" role="link">{time}</a>"#),
        None => time,
    };
    format!(
        r#"<article data-testid="tweet" role="article">
  <div data-testid="User-Name">
    <a href="/{handle}" role="link"><span>{display_name}</span></a>
    <span>@{handle}</span>
    <span>·</span>
    {time_link}
  </div>
  <div data-testid="tweetText" lang="en"><span>{text}</span></div>
  <div role="group">
    <button data-testid="reply"><svg></svg><span>4</span></button>
    <button data-testid="like"><svg></svg><span>12</span></button>
  </div>
</article>"#
    )
}

/// Full feed page wrapping the given cards
#[allow(dead_code)]
pub fn feed_page(cards: &[String]) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>List / X</title>
    <script>window.__INITIAL_STATE__ = {{}};</script>
</head>
<body>
    <div id="react-root">
        <nav role="navigation"><a href="/home">Home</a></nav>
        <main role="main">
            <section aria-labelledby="timeline">{}</section>
        </main>
    </div>
</body>
</html>"#,
        cards.join("\n")
    )
}

/// Session config pointing at a list on twitter.com with fast retries
#[allow(dead_code)]
pub fn session_config() -> SessionConfig {
    SessionConfig::builder()
        .navigation_retry(feed_digest::RetryPolicy::new(2, 1, 1))
        .target_url("https://twitter.com/i/lists/1")
        .auth_token("test-token")
        .build()
        .expect("valid test session config")
}

/// Chat-completion response body carrying `content`
#[allow(dead_code)]
pub fn chat_response(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

/// Shared view of the calls a [`ScriptedDriver`] received
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<&'static str>>>);

#[allow(dead_code)]
impl CallLog {
    pub fn calls(&self) -> Vec<&'static str> {
        self.0.lock().expect("calls lock").clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    fn push(&self, call: &'static str) {
        self.0.lock().expect("calls lock").push(call);
    }
}

/// Session driver that serves fixed markup and records every call
#[allow(dead_code)]
#[derive(Default)]
pub struct ScriptedDriver {
    markup: String,
    fail_open: bool,
    navigation_failures: AtomicU32,
    stall: Option<Duration>,
    calls: CallLog,
}

#[allow(dead_code)]
impl ScriptedDriver {
    pub fn serving(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            ..Self::default()
        }
    }

    pub fn failing_launch() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    /// Fail the first `count` navigations with a retryable error
    pub fn with_navigation_failures(self, count: u32) -> Self {
        self.navigation_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Make the settle wait hang for `duration`
    pub fn with_stall(mut self, duration: Duration) -> Self {
        self.stall = Some(duration);
        self
    }

    /// Handle on the call log that outlives moving the driver
    pub fn call_log(&self) -> CallLog {
        self.calls.clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.push(call);
    }
}

impl SessionDriver for ScriptedDriver {
    type Handle = ();

    async fn open(&self, _config: &SessionConfig) -> ScrapeResult<()> {
        self.record("open");
        if self.fail_open {
            return Err(ScrapeError::Launch("Browser executable not found".into()));
        }
        Ok(())
    }

    async fn set_auth_cookie(&self, _handle: &mut (), _target_url: &str, _token: &str) -> ScrapeResult<()> {
        self.record("cookie");
        Ok(())
    }

    async fn navigate(&self, _handle: &mut (), url: &str) -> ScrapeResult<()> {
        self.record("navigate");
        let remaining = self.navigation_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.navigation_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_RESET".into(),
            });
        }
        Ok(())
    }

    async fn wait_for_stable(&self, _handle: &mut (), _config: &SessionConfig) -> usize {
        self.record("wait");
        if let Some(stall) = self.stall {
            tokio::time::sleep(stall).await;
        }
        0
    }

    async fn snapshot(&self, _handle: &mut ()) -> ScrapeResult<String> {
        self.record("snapshot");
        Ok(self.markup.clone())
    }

    async fn close(&self, _handle: ()) {
        self.record("close");
    }
}

/// Reporter that keeps every stage it sees
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingReporter {
    stages: Mutex<Vec<PipelineStage>>,
    failures: Mutex<Vec<PipelineStage>>,
}

#[allow(dead_code)]
impl RecordingReporter {
    pub fn stages(&self) -> Vec<PipelineStage> {
        self.stages.lock().expect("stages lock").clone()
    }

    pub fn failures(&self) -> Vec<PipelineStage> {
        self.failures.lock().expect("failures lock").clone()
    }
}

impl StageReporter for RecordingReporter {
    fn report_stage(&self, stage: PipelineStage) {
        self.stages.lock().expect("stages lock").push(stage);
    }

    fn report_failure(&self, stage: PipelineStage, _error: &ScrapeError) {
        self.failures.lock().expect("failures lock").push(stage);
    }
}
