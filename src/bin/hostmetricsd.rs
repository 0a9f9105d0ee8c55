//! hostmetricsd - host metrics exporter daemon.
//!
//! Collects CPU, memory, network and disk metrics from `/proc` on a fixed
//! interval, serves them in the Prometheus text format and proxies queries to
//! an upstream Prometheus server.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(target_os = "linux")]
use hostmetrics::collector::RealFs;
#[cfg(not(target_os = "linux"))]
use hostmetrics::collector::mock::MockFs;
use hostmetrics::collector::{Collector, SourcePaths, host_collectors};
use hostmetrics::config::{Config, ConfigError};
use hostmetrics::proxy::{PrometheusClient, UpstreamError};
use hostmetrics::registry::Registry;
use hostmetrics::scheduler::Scheduler;
use hostmetrics::server::{self, ServerState};
use hostmetrics::util;

/// How long collectors get to finish their current tick after shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(
    name = "hostmetricsd",
    about = "Linux host metrics exporter",
    version = hostmetrics::VERSION
)]
struct Args {
    /// Path to the YAML config file [default: /etc/hostmetrics/config.yaml].
    #[arg(short, long, env = "HOSTMETRICS_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address (host:port). Overrides `server` from the config file.
    #[arg(long, env = "HOSTMETRICS_LISTEN")]
    listen: Option<String>,

    /// Collection interval in seconds.
    #[arg(long, env = "HOSTMETRICS_INTERVAL")]
    interval: Option<u64>,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, env = "HOSTMETRICS_PROC_PATH")]
    proc_path: Option<PathBuf>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to create upstream client: {0}")]
    Upstream(#[from] UpstreamError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] io::Error),
    #[error("failed to build tokio runtime: {0}")]
    Runtime(#[source] io::Error),
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO; `debug: true` in the config file acts like -v.
fn init_logging(verbose: u8, quiet: bool, debug: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match (verbose, debug) {
            (0, false) => Level::INFO,
            (0, true) | (1, _) => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["hostmetrics", "hostmetricsd"] {
        if let Ok(directive) = format!("{target}={level}").parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads the config file and applies command line overrides.
fn load_config(args: &Args) -> Result<Config, ConfigError> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(listen) = &args.listen {
        config.set_listen(listen)?;
    }
    if let Some(interval) = args.interval {
        config.interval = interval;
    }
    if let Some(proc_path) = &args.proc_path {
        config.proc_path = proc_path.clone();
    }
    config.validate()?;
    Ok(config)
}

fn create_collectors(paths: &SourcePaths, hostname: &str) -> Vec<Box<dyn Collector>> {
    #[cfg(target_os = "linux")]
    {
        host_collectors(RealFs::new(), paths, hostname)
    }
    #[cfg(not(target_os = "linux"))]
    {
        host_collectors(MockFs::typical_system_at(paths), paths, hostname)
    }
}

/// Cancels `cancel` on SIGINT or SIGTERM.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => return,
    }

    info!("received shutdown signal");
    cancel.cancel();
}

async fn run(config: Config) -> Result<(), StartupError> {
    let hostname = util::hostname();
    info!(
        version = hostmetrics::VERSION,
        hostname = %hostname,
        interval_s = config.interval,
        proc_path = %config.proc_path.display(),
        "hostmetricsd starting"
    );

    let upstream = PrometheusClient::new(config.prometheus_base_url(), config.prometheus_timeout())?;
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.clone(),
            source,
        })?;

    let registry = Arc::new(Registry::new());
    let paths = SourcePaths::from_env(&config.proc_path);
    let cancel = CancellationToken::new();

    let scheduler = Scheduler::new(Arc::clone(&registry), config.collection_interval())
        .with_collectors(create_collectors(&paths, &hostname))
        .start(cancel.clone());

    tokio::spawn(shutdown_signal(cancel.clone()));

    let served = server::serve(listener, ServerState::new(registry, upstream), cancel.clone()).await;
    cancel.cancel();

    if tokio::time::timeout(SHUTDOWN_GRACE, scheduler.join())
        .await
        .is_err()
    {
        warn!(
            grace_s = SHUTDOWN_GRACE.as_secs(),
            "collectors did not stop in time"
        );
    }

    info!("hostmetricsd stopped");
    served.map_err(StartupError::Serve)
}

fn main() {
    let args = Args::parse();

    let config = load_config(&args);
    init_logging(
        args.verbose,
        args.quiet,
        config.as_ref().is_ok_and(|c| c.debug),
    );

    let result = config
        .map_err(StartupError::from)
        .and_then(|config| {
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(StartupError::Runtime)
                .map(|runtime| (runtime, config))
        })
        .and_then(|(runtime, config)| runtime.block_on(run(config)));

    if let Err(e) = result {
        error!(error = %e, "hostmetricsd failed");
        process::exit(1);
    }
}
