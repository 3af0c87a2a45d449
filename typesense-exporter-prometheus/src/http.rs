//! HTTP server exposing the scrape endpoint and landing page.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::collector::{SharedCollector, render};

/// Content type for the text exposition format.
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Typesense Prometheus Exporter</title>
    <style>
        html, body {
            height: 100%;
            margin: 0;
            display: flex;
            align-items: center;
            justify-content: center;
            background-color: black;
            color: white;
            font-family: Arial, sans-serif;
        }
        .container { text-align: center; }
        a { text-decoration: none; color: #00bcd4; font-size: 18px; }
        a:hover { text-decoration: underline; }
    </style>
</head>
<body>
    <div class="container">
        <h1>Typesense Prometheus Exporter</h1>
        <p><a href="/metrics">Go to Metrics</a></p>
    </div>
</body>
</html>
"#;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    collector: SharedCollector,
}

/// Create the HTTP router.
fn create_router(collector: SharedCollector) -> Router {
    let state = AppState { collector };

    Router::new()
        .route("/", get(index_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the /metrics endpoint.
///
/// Runs one collection cycle and renders whatever it produced. An upstream
/// outage yields an empty body, which is a valid scrape.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let samples = state.collector.collect().await;
    let body = render(&samples);

    (
        StatusCode::OK,
        [("content-type", EXPOSITION_CONTENT_TYPE)],
        body,
    )
        .into_response()
}

/// Handler for the landing page.
async fn index_handler() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// HTTP server for the scrape endpoint.
pub struct HttpServer {
    collector: SharedCollector,
    listen_addr: SocketAddr,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(collector: SharedCollector, listen_addr: SocketAddr) -> Self {
        Self {
            collector,
            listen_addr,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let router = create_router(self.collector);

        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("failed to bind to {}: {}", self.listen_addr, e))?;

        info!(addr = %self.listen_addr, "scrape endpoint listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
