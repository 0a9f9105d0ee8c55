//! HTTP server: metrics exposition, health check and query proxy.
//!
//! | Path                  | Handler |
//! |-----------------------|---------|
//! | `/`                   | index page |
//! | `/api/v1/metrics`     | text exposition of the registry (also `/metrics`) |
//! | `/api/v1/health`      | `ok` |
//! | `/api/v1/query`       | instant query proxy |
//! | `/api/v1/query_range` | range query proxy |
//! | `/api/v1/aggregate`   | `<op>_over_time` proxy |

mod access_log;
mod handlers;
mod state;

use std::io;
use std::net::SocketAddr;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tracing::info;

pub use access_log::AccessLogLayer;
pub use handlers::ApiError;
pub use state::ServerState;

/// Builds the application router with all layers applied.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(handlers::handle_index))
        .route("/api/v1/metrics", get(handlers::handle_metrics))
        .route("/metrics", get(handlers::handle_metrics))
        .route("/api/v1/health", get(handlers::handle_health))
        .route("/api/v1/query", get(handlers::handle_query))
        .route("/api/v1/query_range", get(handlers::handle_query_range))
        .route("/api/v1/aggregate", get(handlers::handle_aggregate))
        .with_state(state)
        .layer(AccessLogLayer)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
}

/// Serves until `shutdown` is cancelled, then drains in-flight requests.
pub async fn serve(
    listener: TcpListener,
    state: ServerState,
    shutdown: CancellationToken,
) -> io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "listening");
    }

    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exposition::CONTENT_TYPE;
    use crate::proxy::PrometheusClient;
    use crate::registry::Registry;
    use axum::body::{Body, to_bytes};
    use axum::extract::Query;
    use axum::http::{Request, StatusCode, header};
    use axum::response::Json;
    use serde_json::Value;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn state_with_upstream(base_url: &str) -> (Arc<Registry>, ServerState) {
        let registry = Arc::new(Registry::new());
        let upstream = PrometheusClient::new(base_url, Duration::from_secs(5)).unwrap();
        (Arc::clone(&registry), ServerState::new(registry, upstream))
    }

    /// Upstream that is never contacted by the request under test.
    fn offline_state() -> (Arc<Registry>, ServerState) {
        state_with_upstream("http://127.0.0.1:1")
    }

    async fn spawn_upstream(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn get_response(app: Router, uri: &str) -> (StatusCode, String, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (_, state) = offline_state();
        let (status, _, body) = get_response(router(state), "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_index_links_metrics() {
        let (_, state) = offline_state();
        let (status, content_type, body) = get_response(router(state), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/html"));
        assert!(body.contains("href='/api/v1/metrics'"));
    }

    #[tokio::test]
    async fn test_metrics_empty_registry() {
        let (_, state) = offline_state();
        let (status, content_type, body) = get_response(router(state), "/api/v1/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, CONTENT_TYPE);
        assert_eq!(body, "");
    }

    #[tokio::test]
    async fn test_metrics_exposition_and_alias() {
        let (registry, state) = offline_state();
        registry.register("cpu_total", "CPU usage percentage", &["hostname"]);
        registry.update("cpu_total", 12.5, &["host-a"]);

        let app = router(state);
        let (_, _, body) = get_response(app.clone(), "/api/v1/metrics").await;
        assert!(body.contains("# TYPE metricly_cpu_total gauge\n"));
        assert!(body.contains("metricly_cpu_total{hostname=\"host-a\"} 12.5\n"));

        let (status, _, alias_body) = get_response(app, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(alias_body, body);
    }

    #[tokio::test]
    async fn test_query_validation_error() {
        let (_, state) = offline_state();
        let (status, content_type, body) =
            get_response(router(state), "/api/v1/query?metric=cpu_total&foo=bar").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(content_type.starts_with("application/json"));
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["data"]["status_code"], 400);
        assert_eq!(json["data"]["message"], "unknown parameter in request: foo");
    }

    #[tokio::test]
    async fn test_query_range_requires_bounds() {
        let (_, state) = offline_state();
        let (status, _, body) =
            get_response(router(state), "/api/v1/query_range?metric=cpu_total&start=1").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("start and end both required"));
    }

    #[tokio::test]
    async fn test_aggregate_proxied() {
        let upstream = Router::new().route(
            "/api/v1/query",
            get(|Query(params): Query<BTreeMap<String, String>>| async move {
                Json(serde_json::json!({
                    "status": "success",
                    "data": {
                        "resultType": "vector",
                        "result": [{"metric": {"q": params["query"]}, "value": [1, "42"]}]
                    }
                }))
            }),
        );
        let base = spawn_upstream(upstream).await;
        let (_, state) = state_with_upstream(&base);

        let (status, _, body) = get_response(
            router(state),
            "/api/v1/aggregate?metric=metricly_cpu_total&operation=max&window=1h",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["resultType"], "vector");
        assert_eq!(
            json["data"]["result"][0]["metric"]["q"],
            "max_over_time(metricly_cpu_total[1h])"
        );
        assert_eq!(json["data"]["result"][0]["value"][1], "42");
    }

    #[tokio::test]
    async fn test_query_range_proxied_with_last() {
        let upstream = Router::new().route(
            "/api/v1/query_range",
            get(|Query(params): Query<BTreeMap<String, String>>| async move {
                let start: i64 = params["start"].parse().unwrap();
                let end: i64 = params["end"].parse().unwrap();
                Json(serde_json::json!({
                    "status": "success",
                    "data": {
                        "resultType": "matrix",
                        "result": [{
                            "metric": {"span": (end - start).to_string(), "step": params["step"]},
                            "values": [[1, "1"], [2, "2"]]
                        }]
                    }
                }))
            }),
        );
        let base = spawn_upstream(upstream).await;
        let (_, state) = state_with_upstream(&base);

        let (status, _, body) =
            get_response(router(state), "/api/v1/query_range?metric=cpu_total&last=5m").await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        let series = &json["data"]["result"][0];
        assert_eq!(series["metric"]["span"], "300");
        assert_eq!(series["metric"]["step"], "15s");
        assert_eq!(series["values"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let upstream = Router::new().route(
            "/api/v1/query",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = spawn_upstream(upstream).await;
        let (_, state) = state_with_upstream(&base);

        let (status, _, body) = get_response(router(state), "/api/v1/query?metric=cpu_total").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["data"]["status_code"], 502);
        assert_eq!(json["data"]["message"], "prom returned 500 Internal Server Error");
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let (_, state) = offline_state();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = CancellationToken::new();

        let server = tokio::spawn(serve(listener, state, shutdown.clone()));
        shutdown.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server did not shut down")
            .unwrap();
        assert!(result.is_ok());
    }
}
