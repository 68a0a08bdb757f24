//! HTTP exporter serving the Prometheus registry.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::watch;

use voicetime_core::config::MetricsConfig;
use voicetime_core::error::AppError;
use voicetime_core::result::AppResult;

use crate::sink::PrometheusSink;

/// Pull-based metrics endpoint.
#[derive(Debug)]
pub struct MetricsExporter {
    /// Sink whose registry is exposed
    sink: Arc<PrometheusSink>,
    /// Bind settings
    config: MetricsConfig,
}

impl MetricsExporter {
    /// Create an exporter for `sink`.
    pub fn new(sink: Arc<PrometheusSink>, config: MetricsConfig) -> Self {
        Self { sink, config }
    }

    /// Build the router: `GET /metrics` and `GET /health`.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .with_state(Arc::clone(&self.sink))
    }

    /// Bind and serve until the cancel signal is received.
    pub async fn serve(&self, mut cancel: watch::Receiver<bool>) -> AppResult<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::metrics(format!("Failed to bind {}: {}", addr, e)))?;

        tracing::info!("[metrics] Prometheus exporter on {}/metrics", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                while cancel.changed().await.is_ok() {
                    if *cancel.borrow() {
                        break;
                    }
                }
            })
            .await
            .map_err(|e| AppError::metrics(format!("Metrics server error: {}", e)))?;

        tracing::info!("Metrics exporter stopped");
        Ok(())
    }
}

async fn metrics_handler(State(sink): State<Arc<PrometheusSink>>) -> Response {
    match sink.render() {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            tracing::error!("Failed to render metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use voicetime_core::traits::MetricsSink;
    use voicetime_core::types::{GuildId, UserId};

    fn exporter() -> (Arc<PrometheusSink>, MetricsExporter) {
        let sink = Arc::new(PrometheusSink::new().expect("sink"));
        let exporter = MetricsExporter::new(Arc::clone(&sink), MetricsConfig::default());
        (sink, exporter)
    }

    #[tokio::test]
    async fn test_metrics_endpoint_renders_counters() {
        let (sink, exporter) = exporter();
        sink.add_user_seconds(GuildId::new(1), UserId::new(2), 5.0);

        let response = exporter
            .router()
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let text = String::from_utf8(body.to_vec()).expect("utf8");
        assert!(text.contains("user_presence_seconds_total{guild=\"1\",user=\"2\"}"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (_, exporter) = exporter();
        let response = exporter
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["status"], "ok");
    }
}
