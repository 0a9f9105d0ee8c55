//! Periodic execution of collectors.
//!
//! Every collector gets its own tokio task ticking on a shared interval.
//! `report()` is blocking file I/O, so each tick moves the collector onto the
//! blocking pool and takes it back once the tick finishes; a collector never
//! runs two ticks at once. All tasks observe one [`CancellationToken`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::collector::Collector;
use crate::registry::Registry;

/// Fixed set of collectors sharing one interval and one registry.
pub struct Scheduler {
    registry: Arc<Registry>,
    interval: Duration,
    collectors: Vec<Box<dyn Collector>>,
}

impl Scheduler {
    pub fn new(registry: Arc<Registry>, interval: Duration) -> Self {
        Self {
            registry,
            interval,
            collectors: Vec::new(),
        }
    }

    pub fn with_collector(mut self, collector: Box<dyn Collector>) -> Self {
        self.collectors.push(collector);
        self
    }

    pub fn with_collectors(mut self, collectors: impl IntoIterator<Item = Box<dyn Collector>>) -> Self {
        self.collectors.extend(collectors);
        self
    }

    /// Registers every collector's metrics, then spawns one task per collector.
    ///
    /// Registration completes before this returns, so a scrape right after
    /// startup already sees every descriptor. Must be called inside a tokio
    /// runtime.
    pub fn start(self, cancel: CancellationToken) -> SchedulerHandle {
        for collector in &self.collectors {
            collector.register_metrics(&self.registry);
        }

        info!(
            collectors = self.collectors.len(),
            interval_ms = self.interval.as_millis() as u64,
            "scheduler started"
        );

        let tasks = self
            .collectors
            .into_iter()
            .map(|collector| {
                tokio::spawn(collector_loop(
                    collector,
                    Arc::clone(&self.registry),
                    self.interval,
                    cancel.clone(),
                ))
            })
            .collect();

        SchedulerHandle { tasks }
    }
}

/// Handle to the running collector tasks.
pub struct SchedulerHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Waits for every collector task to stop.
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                error!(error = %e, "collector task failed");
            }
        }
    }
}

async fn collector_loop(
    mut collector: Box<dyn Collector>,
    registry: Arc<Registry>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let name = collector.name();
    let mut tick = tokio::time::interval(interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut completed: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {}
        }

        let registry = Arc::clone(&registry);
        let t0 = Instant::now();
        let result = tokio::task::spawn_blocking(move || {
            let outcome = collector.report(&registry);
            (collector, outcome)
        })
        .await;
        let elapsed = t0.elapsed();

        let outcome = match result {
            Ok((returned, outcome)) => {
                collector = returned;
                outcome
            }
            Err(e) => {
                error!(collector = name, error = %e, "collector panicked, stopping it");
                return;
            }
        };

        match outcome {
            Ok(()) => {
                completed += 1;
                if completed == 1 {
                    info!(
                        collector = name,
                        duration_ms = elapsed.as_millis() as u64,
                        "first tick completed"
                    );
                } else {
                    debug!(
                        collector = name,
                        duration_ms = elapsed.as_millis() as u64,
                        completed,
                        "tick completed"
                    );
                }
            }
            Err(e) => {
                warn!(
                    collector = name,
                    error = %e,
                    duration_ms = elapsed.as_millis() as u64,
                    "tick skipped"
                );
            }
        }

        if elapsed > interval / 2 {
            warn!(
                collector = name,
                duration_ms = elapsed.as_millis() as u64,
                interval_ms = interval.as_millis() as u64,
                "tick exceeded 50% of interval"
            );
        }
    }

    debug!(collector = name, "collector stopped");
}
