use bollard::Docker;
use bollard::models::{ContainerCpuStats, ContainerStatsResponse};
use bollard::query_parameters::StatsOptionsBuilder;
use futures::StreamExt;

use crate::runtime::error::RuntimeError;
use crate::runtime::types::RawStats;

fn cpu_total(stats: &Option<ContainerCpuStats>) -> u64 {
    stats.as_ref().and_then(|s| s.cpu_usage.as_ref()).and_then(|u| u.total_usage).unwrap_or(0)
}

fn system_total(stats: &Option<ContainerCpuStats>) -> u64 {
    stats.as_ref().and_then(|s| s.system_cpu_usage).unwrap_or(0)
}

pub(super) fn raw_from_response(response: &ContainerStatsResponse) -> RawStats {
    // Older daemons omit online_cpus, the per-cpu array length stands in.
    let online_cpus = response.cpu_stats
        .as_ref()
        .and_then(|s| s.online_cpus.or_else(|| {
            s.cpu_usage.as_ref().and_then(|u| u.percpu_usage.as_ref()).map(|p| p.len() as u32)
        }))
        .unwrap_or(1);

    let memory = response.memory_stats.as_ref();

    RawStats {
        cpu_total: cpu_total(&response.cpu_stats),
        precpu_total: cpu_total(&response.precpu_stats),
        system_cpu: system_total(&response.cpu_stats),
        presystem_cpu: system_total(&response.precpu_stats),
        online_cpus,
        memory_usage: memory.and_then(|m| m.usage).unwrap_or(0),
        memory_limit: memory.and_then(|m| m.limit).unwrap_or(0),
        networks: response.networks
            .as_ref()
            .map(|networks| {
                networks.values()
                    .map(|n| (n.rx_bytes.unwrap_or(0), n.tx_bytes.unwrap_or(0)))
                    .collect()
            })
            .unwrap_or_default(),
        pids: response.pids_stats.as_ref().and_then(|p| p.current).unwrap_or(0),
    }
}

pub(super) async fn sample(docker: &Docker, container_id: &str) -> Result<RawStats, RuntimeError> {
    let options = StatsOptionsBuilder::new().stream(false).one_shot(false).build();
    let mut stream = docker.stats(container_id, Some(options));

    match stream.next().await {
        Some(response) => Ok(raw_from_response(&response?)),
        None => Err(RuntimeError::Transient(format!("No stats returned for {}", container_id))),
    }
}
