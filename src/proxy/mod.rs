//! Query proxy in front of an upstream Prometheus server.
//!
//! Requests are validated and translated into PromQL by [`query`], then
//! forwarded by [`client::PrometheusClient`]. The proxy shares no state with
//! the metric registry.

pub mod client;
pub mod query;

pub use client::{
    InstantSample, PrometheusClient, PrometheusResponse, RangeSeries, UpstreamError,
};
pub use query::{
    AggregateOp, Endpoint, QueryError, QueryParams, UpstreamRequest, aggregate_query,
    instant_query, process_query_params, range_query,
};
