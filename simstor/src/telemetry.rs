//! Internal telemetry.
//!
//! Everything simstor measures about itself goes through the `metrics` facade
//! under the names below. [`install`] wires the facade to a Prometheus scrape
//! endpoint.

use std::net::SocketAddr;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use tracing::info;

/// Events generated, labelled by `event`
pub const EVENTS_GENERATED: &str = "simstor_events_generated_total";
/// Events generated, labelled by `severity`
pub const EVENTS_BY_SEVERITY: &str = "simstor_events_by_severity_total";
/// Wall time spent synthesizing one event
pub const SYNTHESIS_DURATION: &str = "simstor_synthesis_duration_seconds";
/// Weighted draws that fell through to the fallback definition
pub const SELECTOR_FALLBACK: &str = "simstor_selector_fallback_total";
/// Nodes in the inventory
pub const INVENTORY_NODES: &str = "simstor_inventory_nodes";
/// Volumes in the inventory
pub const INVENTORY_VOLUMES: &str = "simstor_inventory_volumes";
/// Summed volume capacity
pub const INVENTORY_CAPACITY: &str = "simstor_inventory_capacity_gb";
/// Events dropped because the sink queue was full
pub const SINK_DROPPED: &str = "simstor_sink_dropped_total";
/// Events delivered by the HTTP sink
pub const SINK_DELIVERED: &str = "simstor_sink_delivered_total";
/// Failed HTTP sink batch deliveries
pub const SINK_DELIVERY_FAILURE: &str = "simstor_sink_delivery_failure_total";
/// Process heartbeat
pub const RUNNING: &str = "simstor_running";
/// One, five and fifteen minute host load averages, labelled by `window`
pub const HOST_LOAD: &str = "simstor_host_load_average";
/// Host memory total
pub const HOST_MEMORY_TOTAL: &str = "simstor_host_memory_total_bytes";
/// Host memory available
pub const HOST_MEMORY_AVAILABLE: &str = "simstor_host_memory_available_bytes";
/// Cumulative host CPU ticks, labelled by `mode`
pub const HOST_CPU_TICKS: &str = "simstor_host_cpu_ticks";

/// Errors produced by [`install`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The Prometheus exporter could not be built or installed
    #[error("Failed to install prometheus recorder: {0}")]
    Prometheus(#[from] metrics_exporter_prometheus::BuildError),
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
/// Defines the manner of simstor's telemetry.
pub enum Telemetry {
    /// Serve internal telemetry at a Prometheus scrape endpoint.
    Prometheus {
        /// Address and port for prometheus exporter
        addr: SocketAddr,
        /// Additional labels to include in every metric
        #[serde(default)]
        global_labels: FxHashMap<String, String>,
    },
    /// Record nothing.
    None,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::Prometheus {
            addr: SocketAddr::from(([0, 0, 0, 0], 9000)),
            global_labels: FxHashMap::default(),
        }
    }
}

/// Install the global metrics recorder described by `telemetry`.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns an error if the exporter cannot bind or a recorder is already
/// installed.
pub fn install(telemetry: &Telemetry) -> Result<(), Error> {
    match telemetry {
        Telemetry::Prometheus {
            addr,
            global_labels,
        } => {
            let mut builder = PrometheusBuilder::new().with_http_listener(*addr);
            for (k, v) in global_labels {
                builder = builder.add_global_label(k, v);
            }
            builder.install()?;
            describe();
            info!("serving prometheus metrics at {addr}");
        }
        Telemetry::None => info!("telemetry disabled"),
    }
    Ok(())
}

fn describe() {
    describe_counter!(EVENTS_GENERATED, "events generated by name");
    describe_counter!(EVENTS_BY_SEVERITY, "events generated by severity");
    describe_histogram!(
        SYNTHESIS_DURATION,
        Unit::Seconds,
        "time to synthesize one event"
    );
    describe_counter!(SELECTOR_FALLBACK, "weighted draws that matched no definition");
    describe_gauge!(INVENTORY_NODES, "nodes in the simulated inventory");
    describe_gauge!(INVENTORY_VOLUMES, "volumes in the simulated inventory");
    describe_gauge!(
        INVENTORY_CAPACITY,
        "summed capacity of every simulated volume in gigabytes"
    );
    describe_counter!(SINK_DROPPED, "events dropped on a full sink queue");
    describe_counter!(SINK_DELIVERED, "events delivered to the remote log sink");
    describe_counter!(SINK_DELIVERY_FAILURE, "failed remote log sink batches");
    describe_gauge!(RUNNING, "set to one while simstor runs");
    describe_gauge!(HOST_LOAD, "host load average");
    describe_gauge!(HOST_MEMORY_TOTAL, Unit::Bytes, "host memory total");
    describe_gauge!(HOST_MEMORY_AVAILABLE, Unit::Bytes, "host memory available");
    describe_gauge!(HOST_CPU_TICKS, "cumulative host cpu ticks");
}

#[cfg(test)]
mod test {
    use super::Telemetry;

    #[test]
    fn default_serves_prometheus_on_9000() {
        match Telemetry::default() {
            Telemetry::Prometheus {
                addr,
                global_labels,
            } => {
                assert_eq!(addr.port(), 9000);
                assert!(addr.ip().is_unspecified());
                assert!(global_labels.is_empty());
            }
            Telemetry::None => panic!("expected prometheus"),
        }
    }
}
