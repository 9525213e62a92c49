// HTTP server: Feed Digest
//
// Serves the scrape form and the /scrape endpoint. Configuration comes from
// FEED_DIGEST_* environment variables.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use feed_digest::{
    AppState, ChromiumDriver, PipelineOrchestrator, RecordStore, ServiceConfig, router,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("feed_digest=info".parse()?))
        .init();

    let config = ServiceConfig::from_env();

    let store = RecordStore::open(&config.db_path).await?;
    let orchestrator = Arc::new(PipelineOrchestrator::new(ChromiumDriver, store.clone(), &config));

    let app = router(Arc::new(AppState {
        orchestrator,
        headless: config.headless,
    }));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Feed digest server running on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    store.close().await;
    Ok(())
}
