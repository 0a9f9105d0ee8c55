//! HTTP request handlers: index page, metrics exposition, health and the
//! Prometheus query proxy.

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Json, Response};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::exposition::{self, CONTENT_TYPE};
use crate::proxy::{
    InstantSample, PrometheusResponse, QueryError, RangeSeries, UpstreamError, aggregate_query,
    instant_query, range_query,
};

use super::state::ServerState;

const INDEX_HTML: &str = "\
<html>
<head><title>Hostmetrics Exporter</title></head>
<body>
<h1>Hostmetrics Exporter</h1>
<p><a href='/api/v1/metrics'>Metrics</a></p>
</body>
</html>
";

/// Raw query string pairs, in request order, repeats included.
type RawParams = Query<Vec<(String, String)>>;

// ============================================================
// Errors
// ============================================================

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    data: ErrorData,
}

#[derive(Serialize)]
struct ErrorData {
    status_code: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Query(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        let message = self.to_string();
        if let ApiError::Upstream(_) = self {
            warn!(error = %message, "upstream query failed");
        }

        let body = ErrorBody {
            status: "failed",
            data: ErrorData {
                status_code: status.as_u16(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================
// Static
// ============================================================

pub(crate) async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub(crate) async fn handle_health() -> &'static str {
    "ok"
}

// ============================================================
// Metrics
// ============================================================

pub(crate) async fn handle_metrics(State(state): State<ServerState>) -> impl IntoResponse {
    let body = exposition::render(&state.registry.snapshot());
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], body)
}

// ============================================================
// Proxy
// ============================================================

pub(crate) async fn handle_query(
    State(state): State<ServerState>,
    Query(params): RawParams,
) -> Result<Json<PrometheusResponse<InstantSample>>, ApiError> {
    let request = instant_query(&params)?;
    Ok(Json(state.upstream.fetch(&request).await?))
}

pub(crate) async fn handle_query_range(
    State(state): State<ServerState>,
    Query(params): RawParams,
) -> Result<Json<PrometheusResponse<RangeSeries>>, ApiError> {
    let request = range_query(&params, Utc::now())?;
    Ok(Json(state.upstream.fetch(&request).await?))
}

pub(crate) async fn handle_aggregate(
    State(state): State<ServerState>,
    Query(params): RawParams,
) -> Result<Json<PrometheusResponse<InstantSample>>, ApiError> {
    let request = aggregate_query(&params)?;
    Ok(Json(state.upstream.fetch(&request).await?))
}
