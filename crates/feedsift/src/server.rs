//! HTTP filtering proxy.
//!
//! # Endpoints
//!
//! - `GET /filter?url=...&expression=...&format=...` - filter a feed
//! - `POST /filter?format=...` with a JSON body `{"url": ..., "expression": ...}`
//! - `GET /health` - health check
//!
//! `format` is `json` (default), `rss` or `atom`; anything else falls back to
//! `json`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use feedsift_feed::OutputFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::pipeline::{FilterRequest, FilterResponse, Pipeline, PipelineError};

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("missing required parameter 'url'")]
    MissingUrl,

    #[error("invalid JSON body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::MissingUrl | ServerError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::Fetch(_)) => StatusCode::BAD_GATEWAY,
            ServerError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::MissingUrl => "MISSING_URL",
            ServerError::InvalidBody(_) => "INVALID_JSON",
            ServerError::Pipeline(PipelineError::Fetch(_)) => "FETCH_ERROR",
            ServerError::Pipeline(PipelineError::Compile(_)) => "COMPILE_ERROR",
            ServerError::Pipeline(PipelineError::Evaluation(_)) => "EVALUATION_ERROR",
            ServerError::Pipeline(PipelineError::Encoding(_)) => "ENCODING_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "filter request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Query parameters accepted by `/filter`.
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    pub url: Option<String>,
    pub expression: Option<String>,
    pub format: Option<String>,
}

/// JSON body accepted by `POST /filter`.
#[derive(Debug, Default, Deserialize)]
pub struct FilterBody {
    pub url: Option<String>,
    pub expression: Option<String>,
}

struct AppState {
    pipeline: Pipeline,
}

/// Builds the proxy router around a pipeline.
pub fn router(pipeline: Pipeline) -> Router {
    let state = Arc::new(AppState { pipeline });
    Router::new()
        .route("/filter", get(filter_get).post(filter_post))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the router until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn serve(pipeline: Pipeline, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %listener.local_addr()?, "feedsift proxy listening");

    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(async {
            // A failed signal handler just means no graceful shutdown.
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
}

async fn filter_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Result<Response, ServerError> {
    let request = build_request(params.url, params.expression, params.format.as_deref())?;
    run(&state, request).await
}

async fn filter_post(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
    body: Bytes,
) -> Result<Response, ServerError> {
    let body: FilterBody = serde_json::from_slice(&body)?;
    let request = build_request(body.url, body.expression, params.format.as_deref())?;
    run(&state, request).await
}

fn build_request(
    url: Option<String>,
    expression: Option<String>,
    format: Option<&str>,
) -> Result<FilterRequest, ServerError> {
    let url = url
        .filter(|u| !u.trim().is_empty())
        .ok_or(ServerError::MissingUrl)?;
    Ok(FilterRequest {
        url,
        expression,
        format: OutputFormat::from_param(format),
    })
}

async fn run(state: &AppState, request: FilterRequest) -> Result<Response, ServerError> {
    let response = state.pipeline.run(&request).await?;
    info!(
        url = %request.url,
        total = response.total,
        included = response.included,
        errors = response.errors.len(),
        "filtered feed"
    );
    Ok(success(response))
}

fn success(response: FilterResponse) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, response.content_type())],
        response.body,
    )
        .into_response()
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsift_expr::CompileError;
    use feedsift_feed::FetchError;

    #[test]
    fn test_build_request_requires_url() {
        assert!(matches!(
            build_request(None, None, None),
            Err(ServerError::MissingUrl)
        ));
        assert!(matches!(
            build_request(Some("  ".to_string()), None, None),
            Err(ServerError::MissingUrl)
        ));
    }

    #[test]
    fn test_build_request_format_fallback() {
        let request = build_request(Some("https://x".to_string()), None, Some("yaml")).unwrap();
        assert_eq!(request.format, OutputFormat::Json);
        let request = build_request(Some("https://x".to_string()), None, Some("atom")).unwrap();
        assert_eq!(request.format, OutputFormat::Atom);
    }

    #[test]
    fn test_status_mapping() {
        let fetch = ServerError::Pipeline(PipelineError::Fetch(FetchError::Status {
            location: "x".to_string(),
            status: 404,
        }));
        let compile = ServerError::Pipeline(PipelineError::Compile(CompileError::EmptyExpression));

        assert_eq!(ServerError::MissingUrl.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(fetch.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(compile.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(compile.error_code(), "COMPILE_ERROR");
    }
}
