//! HTTP facade
//!
//! `GET /` serves the form, `POST /scrape` runs or detaches a scrape and
//! `GET /health` reports store and session-pool state. Handlers only parse
//! input and map outcomes; all pipeline policy lives in the orchestrator.

mod form;

pub use form::{FORM_HTML, ScrapeForm};

use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::error::ScrapeError;
use crate::pipeline::{PipelineOrchestrator, Submission};
use crate::session::SessionDriver;
use crate::utils::DETACHED_ACK;

const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// Shared handler state
pub struct AppState<D: SessionDriver> {
    pub orchestrator: Arc<PipelineOrchestrator<D>>,
    /// Whether session browsers run headless
    pub headless: bool,
}

/// Error payload `{"error": "..."}` with a status derived from the error kind
#[derive(Debug)]
pub struct ApiError(pub ScrapeError);

impl From<ScrapeError> for ApiError {
    fn from(err: ScrapeError) -> Self {
        Self(err)
    }
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ScrapeError::Config(_) => StatusCode::BAD_REQUEST,
            ScrapeError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ScrapeError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Build the router with CORS and request tracing
pub fn router<D: SessionDriver>(state: Arc<AppState<D>>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/scrape", post(scrape::<D>))
        .route("/health", get(health::<D>))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::HEAD,
                    Method::PUT,
                    Method::PATCH,
                    Method::POST,
                    Method::DELETE,
                ])
                .allow_headers(Any),
        )
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    // Path only; form bodies carry credentials
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

async fn index() -> Html<&'static str> {
    Html(FORM_HTML)
}

async fn scrape<D: SessionDriver>(
    State(state): State<Arc<AppState<D>>>,
    Form(form): Form<ScrapeForm>,
) -> Result<Response, ApiError> {
    let request = form.into_request(state.headless)?;

    match state.orchestrator.submit(request).await? {
        Submission::Completed(report) => Ok(plain_text(report.summary.unwrap_or_default())),
        Submission::Acknowledged(_) => Ok(plain_text(DETACHED_ACK.to_string())),
    }
}

async fn health<D: SessionDriver>(State(state): State<Arc<AppState<D>>>) -> Response {
    match state.orchestrator.store().count().await {
        Ok(records) => Json(json!({
            "status": "ok",
            "records": records,
            "available_sessions": state.orchestrator.available_sessions(),
        }))
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Health check could not read the store");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "error": format!("{e:#}") })),
            )
                .into_response()
        }
    }
}

fn plain_text(body: String) -> Response {
    (
        [(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF8))],
        body,
    )
        .into_response()
}
