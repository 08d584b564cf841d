use serde::{Deserialize, Serialize};

use crate::runtime::types::RawStats;

const MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ContainerStats {
    pub(crate) cpu_percent: f64,
    pub(crate) memory_usage_mb: f64,
    pub(crate) memory_limit_mb: f64,
    pub(crate) memory_percent: f64,
    pub(crate) network_rx_mb: f64,
    pub(crate) network_tx_mb: f64,
    pub(crate) pids: u64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl ContainerStats {
    pub(crate) fn from_raw(raw: &RawStats) -> ContainerStats {
        let cpu_delta = raw.cpu_total as f64 - raw.precpu_total as f64;
        let system_delta = raw.system_cpu as f64 - raw.presystem_cpu as f64;

        let cpu_percent = if system_delta > 0.0 && cpu_delta >= 0.0 {
            cpu_delta / system_delta * raw.online_cpus.max(1) as f64 * 100.0
        } else {
            0.0
        };

        let memory_percent = if raw.memory_limit > 0 {
            raw.memory_usage as f64 / raw.memory_limit as f64 * 100.0
        } else {
            0.0
        };

        let (rx, tx) = raw.networks
            .iter()
            .fold((0u64, 0u64), |(rx, tx), (r, t)| (rx + r, tx + t));

        ContainerStats {
            cpu_percent: round2(cpu_percent),
            memory_usage_mb: round2(raw.memory_usage as f64 / MB),
            memory_limit_mb: round2(raw.memory_limit as f64 / MB),
            memory_percent: round2(memory_percent),
            network_rx_mb: round2(rx as f64 / MB),
            network_tx_mb: round2(tx as f64 / MB),
            pids: raw.pids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_percent_scales_with_online_cpus() {
        let raw = RawStats {
            cpu_total: 300_000_000,
            precpu_total: 100_000_000,
            system_cpu: 2_000_000_000,
            presystem_cpu: 1_000_000_000,
            online_cpus: 4,
            ..Default::default()
        };

        assert_eq!(ContainerStats::from_raw(&raw).cpu_percent, 80.0);
    }

    #[test]
    fn test_cpu_percent_is_zero_without_system_progress() {
        let raw = RawStats {
            cpu_total: 500,
            precpu_total: 100,
            system_cpu: 1_000,
            presystem_cpu: 1_000,
            online_cpus: 2,
            ..Default::default()
        };

        assert_eq!(ContainerStats::from_raw(&raw).cpu_percent, 0.0);
    }

    #[test]
    fn test_memory_and_network() {
        let raw = RawStats {
            memory_usage: 512 * 1024 * 1024,
            memory_limit: 2048 * 1024 * 1024,
            networks: vec![(1024 * 1024, 3 * 1024 * 1024), (1024 * 1024 / 2, 0)],
            pids: 17,
            ..Default::default()
        };

        let stats = ContainerStats::from_raw(&raw);
        assert_eq!(stats.memory_usage_mb, 512.0);
        assert_eq!(stats.memory_limit_mb, 2048.0);
        assert_eq!(stats.memory_percent, 25.0);
        assert_eq!(stats.network_rx_mb, 1.5);
        assert_eq!(stats.network_tx_mb, 3.0);
        assert_eq!(stats.pids, 17);
    }

    #[test]
    fn test_unlimited_memory_does_not_divide_by_zero() {
        let raw = RawStats { memory_usage: 1024, ..Default::default() };
        assert_eq!(ContainerStats::from_raw(&raw).memory_percent, 0.0);
    }
}
