//! Fixed descriptor tables for the two Typesense diagnostic documents.
//!
//! The upstream field vocabulary is stable and known ahead of time, so the
//! full set of exposable metrics is listed here. Fields added by newer
//! Typesense releases are ignored until a descriptor is added for them.

use std::collections::HashMap;

/// Labels carried by every flat gauge.
pub static CLUSTER_LABELS: &[&str] = &["typesense_cluster"];

/// Labels for stats broken down per API endpoint.
pub static ENDPOINT_LABELS: &[&str] = &["typesense_cluster", "endpoint"];

/// Identity of one exposable metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDescriptor {
    /// Output metric name, already carrying the `typesense_` prefix.
    pub name: &'static str,
    /// Help text for the exposition output.
    pub help: &'static str,
    /// Ordered label names; sample label values must match this arity.
    pub labels: &'static [&'static str],
}

/// Lookup from upstream field key to descriptor. Built once per collector,
/// read-only afterwards.
pub type DescriptorTable = HashMap<&'static str, MetricDescriptor>;

fn gauge(name: &'static str, help: &'static str) -> MetricDescriptor {
    MetricDescriptor {
        name,
        help,
        labels: CLUSTER_LABELS,
    }
}

fn per_endpoint(name: &'static str, help: &'static str) -> MetricDescriptor {
    MetricDescriptor {
        name,
        help,
        labels: ENDPOINT_LABELS,
    }
}

/// Descriptors for the `metrics.json` document: flat system and process
/// gauges, all keyed by cluster.
pub fn metrics_table() -> DescriptorTable {
    HashMap::from([
        (
            "system_cpu1_active_percentage",
            gauge(
                "typesense_system_cpu1_active_percentage",
                "System CPU core 1 active percentage",
            ),
        ),
        (
            "system_cpu2_active_percentage",
            gauge(
                "typesense_system_cpu2_active_percentage",
                "System CPU core 2 active percentage",
            ),
        ),
        (
            "system_cpu3_active_percentage",
            gauge(
                "typesense_system_cpu3_active_percentage",
                "System CPU core 3 active percentage",
            ),
        ),
        (
            "system_cpu4_active_percentage",
            gauge(
                "typesense_system_cpu4_active_percentage",
                "System CPU core 4 active percentage",
            ),
        ),
        (
            "system_cpu_active_percentage",
            gauge(
                "typesense_system_cpu_active_percentage",
                "System overall CPU active percentage",
            ),
        ),
        (
            "system_disk_total_bytes",
            gauge(
                "typesense_system_disk_total_bytes",
                "Total system disk space in bytes",
            ),
        ),
        (
            "system_disk_used_bytes",
            gauge(
                "typesense_system_disk_used_bytes",
                "Used system disk space in bytes",
            ),
        ),
        (
            "system_memory_total_bytes",
            gauge(
                "typesense_system_memory_total_bytes",
                "Total system memory in bytes",
            ),
        ),
        (
            "system_memory_used_bytes",
            gauge(
                "typesense_system_memory_used_bytes",
                "Used system memory in bytes",
            ),
        ),
        (
            "system_memory_total_swap_bytes",
            gauge(
                "typesense_system_memory_total_swap_bytes",
                "Total system swap memory in bytes",
            ),
        ),
        (
            "system_memory_used_swap_bytes",
            gauge(
                "typesense_system_memory_used_swap_bytes",
                "Used system swap memory in bytes",
            ),
        ),
        (
            "system_network_received_bytes",
            gauge(
                "typesense_system_network_received_bytes",
                "Total network received bytes",
            ),
        ),
        (
            "system_network_sent_bytes",
            gauge(
                "typesense_system_network_sent_bytes",
                "Total network sent bytes",
            ),
        ),
        (
            "typesense_memory_active_bytes",
            gauge(
                "typesense_memory_active_bytes",
                "Typesense active memory usage in bytes",
            ),
        ),
        (
            "typesense_memory_allocated_bytes",
            gauge(
                "typesense_memory_allocated_bytes",
                "Typesense allocated memory in bytes",
            ),
        ),
        (
            "typesense_memory_fragmentation_ratio",
            gauge(
                "typesense_memory_fragmentation_ratio",
                "Typesense memory fragmentation ratio",
            ),
        ),
        (
            "typesense_memory_mapped_bytes",
            gauge(
                "typesense_memory_mapped_bytes",
                "Typesense memory mapped in bytes",
            ),
        ),
        (
            "typesense_memory_metadata_bytes",
            gauge(
                "typesense_memory_metadata_bytes",
                "Typesense memory metadata size in bytes",
            ),
        ),
        (
            "typesense_memory_resident_bytes",
            gauge(
                "typesense_memory_resident_bytes",
                "Typesense resident memory usage in bytes",
            ),
        ),
        (
            "typesense_memory_retained_bytes",
            gauge(
                "typesense_memory_retained_bytes",
                "Typesense retained memory in bytes",
            ),
        ),
    ])
}

/// Descriptors for the `stats.json` document. Mostly flat gauges; the two
/// per-endpoint breakdowns carry the additional `endpoint` label.
pub fn stats_table() -> DescriptorTable {
    HashMap::from([
        ("uptime", gauge("typesense_uptime_seconds", "Uptime in seconds")),
        (
            "memory.used",
            gauge("typesense_memory_used_bytes", "Memory used in bytes"),
        ),
        (
            "memory.total",
            gauge("typesense_memory_total_bytes", "Total memory in bytes"),
        ),
        (
            "memory.available",
            gauge(
                "typesense_memory_available_bytes",
                "Available memory in bytes",
            ),
        ),
        (
            "memory.resident",
            gauge(
                "typesense_memory_resident_bytes",
                "Resident memory in bytes",
            ),
        ),
        (
            "delete_latency_ms",
            gauge(
                "typesense_delete_latency_ms",
                "Latency of delete operations",
            ),
        ),
        (
            "delete_requests_per_second",
            gauge(
                "typesense_delete_requests_per_second",
                "Delete requests per second",
            ),
        ),
        (
            "import_latency_ms",
            gauge(
                "typesense_import_latency_ms",
                "Latency of import operations",
            ),
        ),
        (
            "import_requests_per_second",
            gauge(
                "typesense_import_requests_per_second",
                "Import requests per second",
            ),
        ),
        (
            "overloaded_requests_per_second",
            gauge(
                "typesense_overloaded_requests_per_second",
                "Overloaded requests per second",
            ),
        ),
        (
            "pending_write_batches",
            gauge("typesense_pending_write_batches", "Pending write batches"),
        ),
        (
            "search_latency_ms",
            gauge(
                "typesense_search_latency_ms",
                "Latency of search operations",
            ),
        ),
        (
            "search_requests_per_second",
            gauge(
                "typesense_search_requests_per_second",
                "Search requests per second",
            ),
        ),
        (
            "total_requests_per_second",
            gauge(
                "typesense_total_requests_per_second",
                "Total requests per second",
            ),
        ),
        (
            "write_latency_ms",
            gauge("typesense_write_latency_ms", "Latency of write operations"),
        ),
        (
            "write_requests_per_second",
            gauge(
                "typesense_write_requests_per_second",
                "Write requests per second",
            ),
        ),
        (
            "latency_ms",
            per_endpoint("typesense_latency_ms", "Latency for specific endpoints"),
        ),
        (
            "requests_per_second",
            per_endpoint(
                "typesense_requests_per_second",
                "Requests per second for specific endpoints",
            ),
        ),
    ])
}
