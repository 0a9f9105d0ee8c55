//! Network interface collector reading `/proc/net/dev`.
//!
//! Publishes, per interface, how much each counter grew since the previous
//! tick. Readings are paired by interface name, so a reordered file does not
//! mix counters of different interfaces. When interfaces appear or vanish
//! the tick fails and the new reading becomes the baseline.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use super::procfs::{NetDevStats, parse_net_dev};
use super::traits::FileSystem;
use super::{CollectError, Collector, HOSTNAME_LABEL, read_source, register_all};
use crate::registry::Registry;

pub const RX_BYTES: &str = "network_rx_bytes_total";
pub const TX_BYTES: &str = "network_tx_bytes_total";
pub const RX_PACKETS: &str = "network_rx_packets_total";
pub const TX_PACKETS: &str = "network_tx_packets_total";
pub const RX_ERRORS: &str = "network_rx_errors_total";
pub const TX_ERRORS: &str = "network_tx_errors_total";
pub const RX_DROPS: &str = "network_rx_drops_total";
pub const TX_DROPS: &str = "network_tx_drops_total";

const METRICS: [(&str, &str); 8] = [
    (RX_BYTES, "total bytes received"),
    (TX_BYTES, "total bytes transmitted"),
    (RX_PACKETS, "total packets received"),
    (TX_PACKETS, "total packets transmitted"),
    (RX_ERRORS, "total errors received"),
    (TX_ERRORS, "total errors transmitted"),
    (RX_DROPS, "total drops received"),
    (TX_DROPS, "total drops transmitted"),
];

const INTERFACE_LABEL: &str = "interface";

fn interface_names(stats: &[NetDevStats]) -> BTreeSet<&str> {
    stats.iter().map(|s| s.interface.as_str()).collect()
}

/// Per-interface counter growth between two readings.
///
/// Fails when the two readings do not cover the same interfaces. The result
/// follows the order of `current`; counters that went backwards yield zero.
pub fn interface_deltas(
    previous: &[NetDevStats],
    current: &[NetDevStats],
) -> Result<Vec<NetDevStats>, CollectError> {
    let previous_names = interface_names(previous);
    let current_names = interface_names(current);
    if previous_names != current_names {
        return Err(CollectError::InterfaceMismatch {
            previous: previous_names.into_iter().map(String::from).collect(),
            current: current_names.into_iter().map(String::from).collect(),
        });
    }

    let by_name: HashMap<&str, &NetDevStats> = previous
        .iter()
        .map(|s| (s.interface.as_str(), s))
        .collect();

    let deltas = current
        .iter()
        .filter_map(|curr| {
            let prev = by_name.get(curr.interface.as_str())?;
            Some(NetDevStats {
                interface: curr.interface.clone(),
                rx_bytes: curr.rx_bytes.saturating_sub(prev.rx_bytes),
                rx_packets: curr.rx_packets.saturating_sub(prev.rx_packets),
                rx_errs: curr.rx_errs.saturating_sub(prev.rx_errs),
                rx_drop: curr.rx_drop.saturating_sub(prev.rx_drop),
                tx_bytes: curr.tx_bytes.saturating_sub(prev.tx_bytes),
                tx_packets: curr.tx_packets.saturating_sub(prev.tx_packets),
                tx_errs: curr.tx_errs.saturating_sub(prev.tx_errs),
                tx_drop: curr.tx_drop.saturating_sub(prev.tx_drop),
            })
        })
        .collect();

    Ok(deltas)
}

/// Publishes per-interface traffic, error and drop counts per tick.
pub struct NetworkCollector<F: FileSystem> {
    fs: F,
    source: PathBuf,
    hostname: String,
    previous: Option<Vec<NetDevStats>>,
}

impl<F: FileSystem> NetworkCollector<F> {
    pub fn new(fs: F, source: impl AsRef<Path>, hostname: impl Into<String>) -> Self {
        Self {
            fs,
            source: source.as_ref().to_path_buf(),
            hostname: hostname.into(),
            previous: None,
        }
    }
}

impl<F: FileSystem> Collector for NetworkCollector<F> {
    fn name(&self) -> &'static str {
        "network"
    }

    fn register_metrics(&self, registry: &Registry) {
        register_all(registry, &METRICS, &[HOSTNAME_LABEL, INTERFACE_LABEL]);
    }

    fn report(&mut self, registry: &Registry) -> Result<(), CollectError> {
        let content = read_source(&self.fs, &self.source)?;
        let current = parse_net_dev(&content);

        let Some(previous) = self.previous.replace(current.clone()) else {
            return Ok(());
        };
        let deltas = interface_deltas(&previous, &current)?;

        for delta in &deltas {
            let labels = [self.hostname.as_str(), delta.interface.as_str()];
            for (name, value) in [
                (RX_BYTES, delta.rx_bytes),
                (TX_BYTES, delta.tx_bytes),
                (RX_PACKETS, delta.rx_packets),
                (TX_PACKETS, delta.tx_packets),
                (RX_ERRORS, delta.rx_errs),
                (TX_ERRORS, delta.tx_errs),
                (RX_DROPS, delta.rx_drop),
                (TX_DROPS, delta.tx_drop),
            ] {
                registry.update(name, value as f64, &labels);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockFs;

    const HEADER: &str = "Inter-|   Receive |  Transmit\n face |bytes packets|bytes packets\n";

    fn net_dev(lines: &[&str]) -> String {
        let mut content = HEADER.to_string();
        for line in lines {
            content.push_str(line);
            content.push('\n');
        }
        content
    }

    fn stats(interface: &str, rx_bytes: u64, tx_bytes: u64) -> NetDevStats {
        NetDevStats {
            interface: interface.to_string(),
            rx_bytes,
            tx_bytes,
            ..Default::default()
        }
    }

    #[test]
    fn test_deltas_pair_by_name() {
        let previous = vec![stats("eth0", 100, 10), stats("lo", 1000, 1000)];
        let current = vec![stats("lo", 1500, 1200), stats("eth0", 300, 40)];

        let deltas = interface_deltas(&previous, &current).unwrap();
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].interface, "lo");
        assert_eq!(deltas[0].rx_bytes, 500);
        assert_eq!(deltas[0].tx_bytes, 200);
        assert_eq!(deltas[1].interface, "eth0");
        assert_eq!(deltas[1].rx_bytes, 200);
        assert_eq!(deltas[1].tx_bytes, 30);
    }

    #[test]
    fn test_deltas_counter_reset_is_zero() {
        let previous = vec![stats("eth0", 1000, 1000)];
        let current = vec![stats("eth0", 10, 2000)];

        let deltas = interface_deltas(&previous, &current).unwrap();
        assert_eq!(deltas[0].rx_bytes, 0);
        assert_eq!(deltas[0].tx_bytes, 1000);
    }

    #[test]
    fn test_deltas_interface_mismatch() {
        let previous = vec![stats("eth0", 1, 1)];
        let current = vec![stats("eth0", 2, 2), stats("wg0", 1, 1)];

        match interface_deltas(&previous, &current) {
            Err(CollectError::InterfaceMismatch { previous, current }) => {
                assert_eq!(previous, vec!["eth0"]);
                assert_eq!(current, vec!["eth0", "wg0"]);
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_report_two_ticks() {
        let fs = MockFs::new();
        fs.add_file(
            "/proc/net/dev",
            net_dev(&["  eth0: 1000 10 1 2 0 0 0 0 500 5 0 1 0 0 0 0"]),
        );

        let registry = Registry::new();
        let mut collector = NetworkCollector::new(fs.clone(), "/proc/net/dev", "h");
        collector.register_metrics(&registry);

        collector.report(&registry).unwrap();
        assert_eq!(registry.get(RX_BYTES, &["h", "eth0"]), None);

        fs.add_file(
            "/proc/net/dev",
            net_dev(&["  eth0: 3000 30 2 2 0 0 0 0 900 9 0 4 0 0 0 0"]),
        );
        collector.report(&registry).unwrap();

        let labels = ["h", "eth0"];
        assert_eq!(registry.get(RX_BYTES, &labels), Some(2000.0));
        assert_eq!(registry.get(RX_PACKETS, &labels), Some(20.0));
        assert_eq!(registry.get(RX_ERRORS, &labels), Some(1.0));
        assert_eq!(registry.get(RX_DROPS, &labels), Some(0.0));
        assert_eq!(registry.get(TX_BYTES, &labels), Some(400.0));
        assert_eq!(registry.get(TX_PACKETS, &labels), Some(4.0));
        assert_eq!(registry.get(TX_ERRORS, &labels), Some(0.0));
        assert_eq!(registry.get(TX_DROPS, &labels), Some(3.0));
    }

    #[test]
    fn test_report_mismatch_rebaselines() {
        let fs = MockFs::new();
        fs.add_file("/net", net_dev(&["eth0: 100 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0"]));

        let registry = Registry::new();
        let mut collector = NetworkCollector::new(fs.clone(), "/net", "h");
        collector.register_metrics(&registry);
        collector.report(&registry).unwrap();

        fs.add_file("/net", net_dev(&["eth0: 200 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0"]));
        collector.report(&registry).unwrap();
        assert_eq!(registry.get(RX_BYTES, &["h", "eth0"]), Some(100.0));

        fs.add_file(
            "/net",
            net_dev(&[
                "eth0: 250 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
                "wg0: 7 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            ]),
        );
        let err = collector.report(&registry).unwrap_err();
        assert!(matches!(err, CollectError::InterfaceMismatch { .. }));
        assert_eq!(registry.get(RX_BYTES, &["h", "eth0"]), Some(100.0));

        fs.add_file(
            "/net",
            net_dev(&[
                "eth0: 400 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
                "wg0: 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            ]),
        );
        collector.report(&registry).unwrap();
        assert_eq!(registry.get(RX_BYTES, &["h", "eth0"]), Some(150.0));
        assert_eq!(registry.get(RX_BYTES, &["h", "wg0"]), Some(10.0));
    }
}
