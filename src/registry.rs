//! In-memory store of metric descriptors and their current values.
//!
//! Collectors register the metrics they own once at startup and then
//! overwrite values on every tick. The HTTP layer reads a consistent
//! snapshot on every scrape. No history is kept: the last write wins.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

/// Immutable description of a metric family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
}

/// A single value of a metric family, identified by its label values.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub value: f64,
    /// Values in the same order as [`MetricDescriptor::label_names`].
    pub label_values: Vec<String>,
}

/// A descriptor together with all its current samples.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub descriptor: MetricDescriptor,
    /// Ordered by label values.
    pub samples: Vec<MetricSample>,
}

/// Composite key of a stored sample.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SampleKey {
    name: String,
    label_values: Vec<String>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    descriptors: BTreeMap<String, MetricDescriptor>,
    samples: BTreeMap<SampleKey, f64>,
}

/// Thread-safe metric registry.
///
/// One mutex guards descriptors and samples together, so registration,
/// updates and snapshots are mutually exclusive.
#[derive(Debug, Default)]
pub struct Registry {
    inner: Mutex<RegistryInner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        // Every critical section leaves the maps consistent, so a panic in
        // another holder does not invalidate them.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a metric family.
    ///
    /// Registering the same name again with the same label names is a no-op.
    /// Registering it with different label names is a programming error and
    /// keeps the original descriptor.
    pub fn register(&self, name: &str, help: &str, label_names: &[&str]) {
        let mut inner = self.lock();

        if let Some(existing) = inner.descriptors.get(name) {
            let same_labels = existing.label_names.len() == label_names.len()
                && existing
                    .label_names
                    .iter()
                    .zip(label_names)
                    .all(|(a, b)| a == b);
            debug_assert!(
                same_labels,
                "metric {name} re-registered with labels {label_names:?}, \
                 previously {:?}",
                existing.label_names
            );
            if !same_labels {
                warn!(
                    metric = name,
                    existing = ?existing.label_names,
                    requested = ?label_names,
                    "metric re-registered with different labels, keeping original"
                );
            }
            return;
        }

        inner.descriptors.insert(
            name.to_string(),
            MetricDescriptor {
                name: name.to_string(),
                help: help.to_string(),
                label_names: label_names.iter().map(|s| s.to_string()).collect(),
            },
        );
    }

    /// Sets the value of the sample identified by `name` and `label_values`.
    ///
    /// The metric must be registered with exactly as many labels as given;
    /// otherwise the update is dropped with a warning.
    pub fn update(&self, name: &str, value: f64, label_values: &[&str]) {
        let mut inner = self.lock();

        let Some(descriptor) = inner.descriptors.get(name) else {
            warn!(metric = name, "update of unregistered metric ignored");
            return;
        };
        if descriptor.label_names.len() != label_values.len() {
            warn!(
                metric = name,
                expected = descriptor.label_names.len(),
                got = label_values.len(),
                "update with wrong label count ignored"
            );
            return;
        }

        let key = SampleKey {
            name: name.to_string(),
            label_values: label_values.iter().map(|s| s.to_string()).collect(),
        };
        inner.samples.insert(key, value);
    }

    /// Returns the current value of a single sample.
    pub fn get(&self, name: &str, label_values: &[&str]) -> Option<f64> {
        let key = SampleKey {
            name: name.to_string(),
            label_values: label_values.iter().map(|s| s.to_string()).collect(),
        };
        self.lock().samples.get(&key).copied()
    }

    /// Copies out every registered family with its samples.
    ///
    /// Families are ordered by name, samples by label values. Families that
    /// have never been updated are included with no samples.
    pub fn snapshot(&self) -> Vec<MetricFamily> {
        let inner = self.lock();

        let mut families: Vec<MetricFamily> = inner
            .descriptors
            .values()
            .map(|descriptor| MetricFamily {
                descriptor: descriptor.clone(),
                samples: Vec::new(),
            })
            .collect();

        // Both maps are sorted by name, so a single merge pass groups samples.
        let mut idx = 0;
        for (key, value) in &inner.samples {
            while families
                .get(idx)
                .is_some_and(|f| f.descriptor.name < key.name)
            {
                idx += 1;
            }
            let Some(family) = families.get_mut(idx) else {
                break;
            };
            if family.descriptor.name == key.name {
                family.samples.push(MetricSample {
                    value: *value,
                    label_values: key.label_values.clone(),
                });
            }
        }

        families
    }
}
