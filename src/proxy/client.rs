//! HTTP client for the upstream Prometheus query API.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::query::UpstreamRequest;

/// Upstream failures; all map to `502 Bad Gateway`.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream url {url}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("failed to query: {0}")]
    Request(#[source] reqwest::Error),
    #[error("prom returned {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to parse result: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Envelope of every Prometheus query API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrometheusResponse<R> {
    pub status: String,
    pub data: ResponseData<R>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseData<R> {
    #[serde(rename = "resultType")]
    pub result_type: String,
    pub result: Vec<R>,
}

/// One series of an instant vector: `[<unix time>, "<value>"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstantSample {
    pub metric: BTreeMap<String, String>,
    pub value: (Value, Value),
}

/// One series of a range matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSeries {
    pub metric: BTreeMap<String, String>,
    pub values: Vec<(Value, Value)>,
}

#[derive(Debug, Clone)]
pub struct PrometheusClient {
    http: reqwest::Client,
    base_url: String,
}

impl PrometheusClient {
    /// Creates a client for `base_url` (e.g. `http://127.0.0.1:9090`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(UpstreamError::Request)?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { http, base_url })
    }

    /// Full upstream URL, `<base>/api/v1/<endpoint>?<params>`.
    pub fn url_for(&self, request: &UpstreamRequest) -> Result<reqwest::Url, UpstreamError> {
        let url = format!("{}/api/v1/{}", self.base_url, request.endpoint.path());
        reqwest::Url::parse_with_params(&url, &request.params).map_err(|e| {
            UpstreamError::InvalidUrl {
                url,
                message: e.to_string(),
            }
        })
    }

    /// Sends `request` and decodes the result entries as `R`.
    pub async fn fetch<R: DeserializeOwned>(
        &self,
        request: &UpstreamRequest,
    ) -> Result<PrometheusResponse<R>, UpstreamError> {
        let url = self.url_for(request)?;
        debug!(%url, "querying prometheus");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(UpstreamError::Request)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(UpstreamError::Status(status));
        }

        response.json().await.map_err(UpstreamError::Decode)
    }
}
