//! hostmetrics - Linux host metrics exporter with a Prometheus query proxy.
//!
//! This library provides the building blocks of the `hostmetricsd` daemon:
//! - `collector` - CPU, memory, network and disk collectors over `/proc`
//! - `registry` / `exposition` - current metric values and their text format
//! - `scheduler` - periodic collector execution
//! - `server` / `proxy` - HTTP endpoints and the upstream Prometheus client

pub mod collector;
pub mod config;
pub mod exposition;
pub mod proxy;
pub mod registry;
pub mod scheduler;
pub mod server;
pub mod util;

/// Crate version, reported at startup.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
