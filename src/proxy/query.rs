//! Validation of proxy request parameters and construction of upstream
//! Prometheus queries.
//!
//! Clients speak in terms of `metric`; Prometheus expects a PromQL `query`.
//! Each endpoint accepts a fixed set of parameters and rejects anything else.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::util::{DurationParseError, parse_duration};

/// Step used for range queries that do not specify one.
pub const DEFAULT_STEP: &str = "15s";

/// Request validation failures; all map to `400 Bad Request`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown parameter in request: {0}")]
    UnknownParameter(String),
    #[error("value for parameter {0} found empty")]
    EmptyValue(String),
    #[error("parameter {0} required")]
    MissingParameter(String),
    #[error(
        "start, end and last cannot be used together, either use start and end or just last to get a range of datapoints"
    )]
    LastWithRange,
    #[error("start and end both required to get a range of datapoints")]
    MissingRange,
    #[error(transparent)]
    InvalidDuration(#[from] DurationParseError),
    #[error("unsupported operation: {0}, use avg, max or min")]
    UnsupportedOperation(String),
}

/// Upstream query parameters, sorted by name.
pub type QueryParams = BTreeMap<String, String>;

/// Prometheus HTTP API endpoint under `/api/v1/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Query,
    QueryRange,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Query => "query",
            Endpoint::QueryRange => "query_range",
        }
    }
}

/// A validated request ready to be sent upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub endpoint: Endpoint,
    pub params: QueryParams,
}

/// Aggregation over a time window, `<op>_over_time(metric[window])`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Avg,
    Max,
    Min,
}

impl AggregateOp {
    pub fn parse(op: &str) -> Result<Self, QueryError> {
        match op {
            "avg" => Ok(AggregateOp::Avg),
            "max" => Ok(AggregateOp::Max),
            "min" => Ok(AggregateOp::Min),
            other => Err(QueryError::UnsupportedOperation(other.to_string())),
        }
    }

    pub fn promql_function(self) -> &'static str {
        match self {
            AggregateOp::Avg => "avg_over_time",
            AggregateOp::Max => "max_over_time",
            AggregateOp::Min => "min_over_time",
        }
    }
}

/// Validates raw request parameters.
///
/// Every parameter must be in `supported` and have a non-empty value; every
/// name in `required` must be present. A repeated parameter keeps its last
/// value. `metric` is renamed to `query`.
pub fn process_query_params(
    params: &[(String, String)],
    supported: &[&str],
    required: &[&str],
) -> Result<QueryParams, QueryError> {
    let mut result = QueryParams::new();

    for (name, value) in params {
        if !supported.contains(&name.as_str()) {
            return Err(QueryError::UnknownParameter(name.clone()));
        }
        if value.is_empty() {
            return Err(QueryError::EmptyValue(name.clone()));
        }
        result.insert(name.clone(), value.clone());
    }

    if let Some(missing) = required.iter().find(|r| !result.contains_key(**r)) {
        return Err(QueryError::MissingParameter(missing.to_string()));
    }

    if let Some(metric) = result.remove("metric") {
        result.insert("query".to_string(), metric);
    }
    Ok(result)
}

/// `/api/v1/query`: `metric` (required) and `timestamp`, forwarded as `time`.
pub fn instant_query(params: &[(String, String)]) -> Result<UpstreamRequest, QueryError> {
    let mut params = process_query_params(params, &["metric", "timestamp"], &["metric"])?;
    if let Some(timestamp) = params.remove("timestamp") {
        params.insert("time".to_string(), timestamp);
    }

    Ok(UpstreamRequest {
        endpoint: Endpoint::Query,
        params,
    })
}

/// `/api/v1/query_range`: `metric` (required) with either `start` and `end`
/// or a `last` duration resolved against `now`; `step` defaults to 15s.
pub fn range_query(
    params: &[(String, String)],
    now: DateTime<Utc>,
) -> Result<UpstreamRequest, QueryError> {
    let mut params = process_query_params(
        params,
        &["metric", "start", "end", "last", "step"],
        &["metric"],
    )?;

    if let Some(last) = params.remove("last") {
        if params.contains_key("start") || params.contains_key("end") {
            return Err(QueryError::LastWithRange);
        }
        let window = parse_duration(&last)?;
        let end = now.timestamp();
        let start = end.saturating_sub(i64::try_from(window.as_secs()).unwrap_or(i64::MAX));
        params.insert("start".to_string(), start.to_string());
        params.insert("end".to_string(), end.to_string());
    } else if !params.contains_key("start") || !params.contains_key("end") {
        return Err(QueryError::MissingRange);
    }

    params
        .entry("step".to_string())
        .or_insert_with(|| DEFAULT_STEP.to_string());

    Ok(UpstreamRequest {
        endpoint: Endpoint::QueryRange,
        params,
    })
}

/// `/api/v1/aggregate`: `metric`, `operation` and `window`, all required.
pub fn aggregate_query(params: &[(String, String)]) -> Result<UpstreamRequest, QueryError> {
    let params = process_query_params(
        params,
        &["metric", "operation", "window"],
        &["metric", "operation", "window"],
    )?;

    // All three are present after validation.
    let metric = params.get("query").map(String::as_str).unwrap_or_default();
    let operation = params.get("operation").map(String::as_str).unwrap_or_default();
    let window = params.get("window").map(String::as_str).unwrap_or_default();

    let op = AggregateOp::parse(operation)?;
    parse_duration(window)?;

    let query = format!("{}({metric}[{window}])", op.promql_function());
    Ok(UpstreamRequest {
        endpoint: Endpoint::Query,
        params: QueryParams::from([("query".to_string(), query)]),
    })
}
