//! HTTP boundary: `POST /convert` runs the pipeline for one URL.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use crate::pipeline::{Pipeline, PipelineError};

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub url: String,
}

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/convert", post(convert))
        .layer(cors)
        .with_state(pipeline)
}

pub async fn serve(bind: &str, pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(pipeline)).await?;
    Ok(())
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the URL to Blog Converter API" }))
}

async fn convert(
    State(pipeline): State<Arc<Pipeline>>,
    Json(req): Json<ConvertRequest>,
) -> Response {
    info!(url = %req.url, "Processing URL");
    match pipeline.convert(&req.url).await {
        Ok(post) => Json(post).into_response(),
        Err(e) => {
            let (status, detail) = match &e {
                PipelineError::Fetch(err) => (
                    StatusCode::BAD_REQUEST,
                    format!("Failed to crawl URL or content is empty: {err}"),
                ),
                PipelineError::Generation(err) => {
                    if let Some(excerpt) = err.raw_reply_excerpt() {
                        debug!(url = %req.url, "Rejected reply: {}", excerpt);
                    }
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Generation failed: {err}"),
                    )
                }
            };
            warn!(url = %req.url, status = status.as_u16(), "{}", detail);
            (status, Json(json!({ "detail": detail }))).into_response()
        }
    }
}
