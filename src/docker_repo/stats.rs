// Process a raw Docker stats API response into cumulative container counters.

use bollard::models::ContainerStatsResponse;

/// Raw counters from one stats read. CPU values are cumulative nanoseconds; the
/// sampler turns them into a percentage against the previous read.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ContainerUsage {
    pub cpu_total_ns: u64,
    pub system_cpu_ns: Option<u64>,
    pub online_cpus: Option<u32>,
    pub memory_usage_bytes: u64,
    pub memory_limit_bytes: u64,
    pub network_rx_bytes: u64,
    pub network_tx_bytes: u64,
    pub block_read_bytes: u64,
    pub block_write_bytes: u64,
    pub pids: u64,
}

pub(crate) fn process_statistics(s: &ContainerStatsResponse) -> Option<ContainerUsage> {
    let cpu_stats = s.cpu_stats.as_ref()?;
    let cpu_total_ns = cpu_stats.cpu_usage.as_ref()?.total_usage.unwrap_or(0);

    // Same as `docker stats`: page cache that can be reclaimed is not "used".
    let memory = s.memory_stats.as_ref();
    let inactive_file = memory
        .and_then(|m| m.stats.as_ref())
        .and_then(|st| st.get("inactive_file").copied())
        .unwrap_or(0);
    let memory_usage_bytes = memory
        .and_then(|m| m.usage)
        .unwrap_or(0)
        .saturating_sub(inactive_file);
    let memory_limit_bytes = memory.and_then(|m| m.limit).unwrap_or(0);

    let (network_rx_bytes, network_tx_bytes) =
        s.networks.as_ref().map_or((0u64, 0u64), |n| {
            n.values().fold((0u64, 0u64), |(rx, tx), v| {
                (rx + v.rx_bytes.unwrap_or(0), tx + v.tx_bytes.unwrap_or(0))
            })
        });

    let (block_read_bytes, block_write_bytes) = s
        .blkio_stats
        .as_ref()
        .and_then(|b| b.io_service_bytes_recursive.as_ref())
        .map_or((0u64, 0u64), |entries| {
            let mut read = 0u64;
            let mut write = 0u64;
            for e in entries {
                match e.op.as_deref() {
                    Some(op) if op.eq_ignore_ascii_case("read") => read += e.value.unwrap_or(0),
                    Some(op) if op.eq_ignore_ascii_case("write") => write += e.value.unwrap_or(0),
                    _ => {}
                }
            }
            (read, write)
        });

    let pids = s.pids_stats.as_ref().and_then(|p| p.current).unwrap_or(0);

    Some(ContainerUsage {
        cpu_total_ns,
        system_cpu_ns: cpu_stats.system_cpu_usage,
        online_cpus: cpu_stats.online_cpus,
        memory_usage_bytes,
        memory_limit_bytes,
        network_rx_bytes,
        network_tx_bytes,
        block_read_bytes,
        block_write_bytes,
        pids,
    })
}
