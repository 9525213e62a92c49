//! End-to-end pipeline runs against a scripted session driver and a mock
//! chat-completion endpoint

mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use common::{RecordingReporter, ScriptedDriver, card_html, chat_response, feed_page, session_config};
use feed_digest::{
    PipelineOrchestrator, PipelineStage, Record, RecordStore, ScrapeError, ScrapeRequest,
    ServiceConfig, Submission, SummarizerSettings, SummaryScope,
};
use mockito::Matcher;
use tempfile::TempDir;

fn two_card_feed() -> String {
    feed_page(&[
        card_html("Ann", "ann", Some("/ann/status/1"), Some("2024-03-01T10:00:00.000Z"), "first post"),
        card_html("Bob", "bob", Some("/bob/status/2"), Some("2024-03-01T11:00:00.000Z"), "second post"),
    ])
}

async fn open_store(dir: &TempDir) -> Result<RecordStore> {
    RecordStore::open(&dir.path().join("records.sqlite")).await
}

fn settings(base: &str) -> SummarizerSettings {
    SummarizerSettings::new("sk-test")
        .with_base_url(Some(base.to_string()))
        .with_prompt_template(Some("Summarize.".to_string()))
}

#[tokio::test]
async fn test_synchronous_run_walks_every_stage() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir).await?;

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "messages": [{
                "role": "user",
                "content": "Ann @ann: first post (source: https://twitter.com/ann/status/1)\n\n\
                            Bob @bob: second post (source: https://twitter.com/bob/status/2)\n\n\
                            Summarize."
            }]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_response("- Ann posted\n- Bob posted"))
        .create_async()
        .await;

    let driver = ScriptedDriver::serving(two_card_feed());
    let calls = driver.call_log();
    let reporter = Arc::new(RecordingReporter::default());
    let orchestrator = PipelineOrchestrator::new(driver, store.clone(), &ServiceConfig::default())
        .with_reporter(reporter.clone());

    let report = orchestrator
        .run(ScrapeRequest::synchronous(session_config(), settings(&server.url())))
        .await?;

    mock.assert_async().await;
    assert_eq!(report.summary.as_deref(), Some("- Ann posted\n- Bob posted"));
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.inserted, 2);
    assert_eq!(store.count().await?, 2);

    assert_eq!(
        reporter.stages(),
        vec![
            PipelineStage::Idle,
            PipelineStage::Launching,
            PipelineStage::Navigating,
            PipelineStage::Waiting,
            PipelineStage::Extracting,
            PipelineStage::Deduplicating,
            PipelineStage::Summarizing,
            PipelineStage::Closing,
            PipelineStage::Done,
        ]
    );
    assert_eq!(
        calls.calls(),
        vec!["open", "cookie", "navigate", "wait", "snapshot", "close"]
    );
    Ok(())
}

#[tokio::test]
async fn test_summarizer_failure_still_closes_session() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir).await?;

    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let driver = ScriptedDriver::serving(two_card_feed());
    let calls = driver.call_log();
    let reporter = Arc::new(RecordingReporter::default());
    let orchestrator = PipelineOrchestrator::new(driver, store.clone(), &ServiceConfig::default())
        .with_reporter(reporter.clone());

    let result = orchestrator
        .run(ScrapeRequest::synchronous(session_config(), settings(&server.url())))
        .await;

    assert!(matches!(result, Err(ScrapeError::Upstream { status: 500, .. })));
    assert_eq!(calls.count("close"), 1);
    assert_eq!(reporter.failures(), vec![PipelineStage::Summarizing]);
    assert_eq!(
        reporter.stages().last().copied(),
        Some(PipelineStage::Failed)
    );
    // Records were persisted before summarization failed
    assert_eq!(store.count().await?, 2);
    Ok(())
}

#[tokio::test]
async fn test_repeated_detached_runs_store_one_row_per_permalink() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir).await?;
    let markup = feed_page(&[card_html(
        "Ann",
        "ann",
        Some("/ann/status/1"),
        Some("2024-03-01T10:00:00.000Z"),
        "only post",
    )]);

    let orchestrator =
        PipelineOrchestrator::new(ScriptedDriver::serving(markup), store.clone(), &ServiceConfig::default());

    let first = orchestrator.run(ScrapeRequest::detached(session_config())).await?;
    let second = orchestrator.run(ScrapeRequest::detached(session_config())).await?;

    assert_eq!((first.inserted, first.skipped), (1, 0));
    assert_eq!((second.inserted, second.skipped), (0, 1));
    assert!(second.summary.is_none());
    assert_eq!(store.count().await?, 1);
    assert!(store.exists("https://twitter.com/ann/status/1").await?);
    Ok(())
}

#[tokio::test]
async fn test_detached_submit_acknowledges_then_persists() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir).await?;
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        ScriptedDriver::serving(two_card_feed()),
        store.clone(),
        &ServiceConfig::default(),
    ));

    let submission = orchestrator
        .submit(ScrapeRequest::detached(session_config()))
        .await?;

    let Submission::Acknowledged(handle) = submission else {
        panic!("detached submit must not wait for the pipeline");
    };
    handle.await?;

    assert_eq!(store.count().await?, 2);
    Ok(())
}

#[tokio::test]
async fn test_detached_launch_failure_is_contained() -> Result<()> {
    let dir = TempDir::new()?;
    let driver = ScriptedDriver::failing_launch();
    let calls = driver.call_log();
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        driver,
        open_store(&dir).await?,
        &ServiceConfig::default(),
    ));

    let Submission::Acknowledged(handle) = orchestrator
        .submit(ScrapeRequest::detached(session_config()))
        .await?
    else {
        panic!("expected acknowledgement");
    };
    handle.await?;

    // Nothing was opened, so there is nothing to close
    assert_eq!(calls.calls(), vec!["open"]);
    assert_eq!(orchestrator.available_sessions(), 2);
    Ok(())
}

#[tokio::test]
async fn test_navigation_is_retried() -> Result<()> {
    let dir = TempDir::new()?;
    let driver = ScriptedDriver::serving(two_card_feed()).with_navigation_failures(1);
    let calls = driver.call_log();
    let orchestrator =
        PipelineOrchestrator::new(driver, open_store(&dir).await?, &ServiceConfig::default());

    let report = orchestrator.run(ScrapeRequest::detached(session_config())).await?;

    assert_eq!(report.inserted, 2);
    assert_eq!(calls.count("navigate"), 2);
    Ok(())
}

#[tokio::test]
async fn test_navigation_retries_are_bounded() -> Result<()> {
    let dir = TempDir::new()?;
    let driver = ScriptedDriver::serving(two_card_feed()).with_navigation_failures(5);
    let calls = driver.call_log();
    let orchestrator =
        PipelineOrchestrator::new(driver, open_store(&dir).await?, &ServiceConfig::default());

    let result = orchestrator.run(ScrapeRequest::detached(session_config())).await;

    assert!(matches!(result, Err(ScrapeError::Navigation { .. })));
    assert_eq!(calls.count("navigate"), 2);
    assert_eq!(calls.count("close"), 1);
    Ok(())
}

#[tokio::test]
async fn test_pipeline_timeout_tears_down_session() -> Result<()> {
    let dir = TempDir::new()?;
    let driver = ScriptedDriver::serving(two_card_feed()).with_stall(Duration::from_secs(30));
    let calls = driver.call_log();
    let service = ServiceConfig {
        pipeline_timeout_secs: 1,
        ..ServiceConfig::default()
    };
    let reporter = Arc::new(RecordingReporter::default());
    let orchestrator = PipelineOrchestrator::new(driver, open_store(&dir).await?, &service)
        .with_reporter(reporter.clone());

    let result = orchestrator.run(ScrapeRequest::detached(session_config())).await;

    assert!(matches!(result, Err(ScrapeError::Timeout { secs: 1, .. })));
    assert_eq!(calls.count("close"), 1);
    assert_eq!(reporter.failures(), vec![PipelineStage::Waiting]);
    Ok(())
}

#[tokio::test]
async fn test_new_only_scope_summarizes_fresh_records() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir).await?;
    store
        .insert_if_absent(&Record::new(
            "Ann @ann",
            "first post",
            "2024-03-01T10:00:00.000Z",
            "https://twitter.com/ann/status/1",
        ))
        .await?;

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "messages": [{
                "role": "user",
                "content": "Bob @bob: second post (source: https://twitter.com/bob/status/2)\n\nSummarize."
            }]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_response("- Bob posted"))
        .create_async()
        .await;

    let service = ServiceConfig {
        summary_scope: SummaryScope::NewOnly,
        ..ServiceConfig::default()
    };
    let orchestrator =
        PipelineOrchestrator::new(ScriptedDriver::serving(two_card_feed()), store, &service);

    let report = orchestrator
        .run(ScrapeRequest::synchronous(session_config(), settings(&server.url())))
        .await?;

    mock.assert_async().await;
    assert_eq!(report.summary.as_deref(), Some("- Bob posted"));
    assert_eq!((report.inserted, report.skipped), (1, 1));
    Ok(())
}

#[tokio::test]
async fn test_synchronous_without_key_is_rejected_before_launch() -> Result<()> {
    let dir = TempDir::new()?;
    let driver = ScriptedDriver::serving(two_card_feed());
    let calls = driver.call_log();
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        driver,
        open_store(&dir).await?,
        &ServiceConfig::default(),
    ));

    let result = orchestrator
        .submit(ScrapeRequest::synchronous(session_config(), SummarizerSettings::new("")))
        .await;

    assert!(matches!(result, Err(ScrapeError::Config(_))));
    assert!(calls.calls().is_empty());
    Ok(())
}
