use std::sync::Arc;

use crate::proxy::PrometheusClient;
use crate::registry::Registry;

/// State shared by all handlers.
#[derive(Clone)]
pub struct ServerState {
    pub registry: Arc<Registry>,
    pub upstream: PrometheusClient,
}

impl ServerState {
    pub fn new(registry: Arc<Registry>, upstream: PrometheusClient) -> Self {
        Self { registry, upstream }
    }
}
