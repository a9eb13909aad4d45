//! Per-kind message and field construction.
//!
//! Each [`EventKind`] maps to one handler. Handlers are stateless: they read
//! the chosen [`Node`] and [`Volume`], draw what they need from the supplied
//! rng and return a [`Materialized`]. The one kind that changes cluster state,
//! `VOLUME_EXPANDED`, reports the change as `capacity_delta` and leaves
//! applying it to the caller.

use rand::Rng;
use serde_json::Value;

use crate::{EventKind, Fields, Node, Volume};

mod access;
mod alert;
mod data;
mod hardware;
mod node;
mod volume;

/// Users that appear as actors in volume and access events.
pub(crate) const USERS: [&str; 12] = [
    "alice",
    "bob",
    "carol",
    "dave",
    "erin",
    "frank",
    "grace",
    "heidi",
    "ivan",
    "judy",
    "svc-backup",
    "svc-provisioner",
];

/// The kind-specific half of a generated event.
#[derive(Debug, Clone, PartialEq)]
pub struct Materialized {
    /// Human-readable log line
    pub message: String,
    /// Fields specific to this kind
    pub fields: Fields,
    /// Gigabytes to add to the chosen volume, set only by `VOLUME_EXPANDED`
    pub capacity_delta: Option<u64>,
}

impl Materialized {
    pub(crate) fn new(message: String) -> Self {
        Self {
            message,
            fields: Fields::new(),
            capacity_delta: None,
        }
    }

    pub(crate) fn with<V>(mut self, key: &str, value: V) -> Self
    where
        V: Into<Value>,
    {
        self.fields.insert(key.to_string(), value.into());
        self
    }
}

impl EventKind {
    /// Build the message and fields for this kind.
    pub fn materialize<R>(self, node: &Node, volume: &Volume, rng: &mut R) -> Materialized
    where
        R: Rng + ?Sized,
    {
        match self {
            EventKind::NodeJoined => node::joined(node, volume, rng),
            EventKind::NodeLeft => node::left(node, volume, rng),
            EventKind::NodeOffline => node::offline(node, volume, rng),
            EventKind::NodeRebooted => node::rebooted(node, volume, rng),
            EventKind::VolumeCreated => volume::created(node, volume, rng),
            EventKind::VolumeDeleted => volume::deleted(node, volume, rng),
            EventKind::VolumeExpanded => volume::expanded(node, volume, rng),
            EventKind::VolumeMounted => volume::mounted(node, volume, rng),
            EventKind::SnapshotCreated => volume::snapshot_created(node, volume, rng),
            EventKind::DataRead => data::read(node, volume, rng),
            EventKind::DataWrite => data::write(node, volume, rng),
            EventKind::ReplicationStarted => data::replication_started(node, volume, rng),
            EventKind::ReplicationCompleted => data::replication_completed(node, volume, rng),
            EventKind::ReplicationFailed => data::replication_failed(node, volume, rng),
            EventKind::CacheHit => data::cache_hit(node, volume, rng),
            EventKind::CacheMiss => data::cache_miss(node, volume, rng),
            EventKind::AlertCapacity => alert::capacity(node, volume, rng),
            EventKind::AlertPerformance => alert::performance(node, volume, rng),
            EventKind::IoLatencySpike => alert::io_latency_spike(node, volume, rng),
            EventKind::HealthCheck => alert::health_check(node, volume, rng),
            EventKind::DiskFailure => hardware::disk_failure(node, volume, rng),
            EventKind::DiskTemperatureHigh => hardware::disk_temperature_high(node, volume, rng),
            EventKind::DataCorruptionDetected => hardware::corruption_detected(node, volume, rng),
            EventKind::UserLogin => access::user_login(node, volume, rng),
            EventKind::AuthFailure => access::auth_failure(node, volume, rng),
            EventKind::ApiRequest => access::api_request(node, volume, rng),
        }
    }
}

/// Build the message and fields for the event called `name`.
///
/// Names outside [`EventKind`] get a generic message and an `unknown_event`
/// marker rather than an error.
pub fn materialize<R>(name: &str, node: &Node, volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    match EventKind::from_name(name) {
        Some(kind) => kind.materialize(node, volume, rng),
        None => unknown(name, node),
    }
}

fn unknown(name: &str, node: &Node) -> Materialized {
    Materialized::new(format!("UNKNOWN EVENT {name} on node {}", node.id))
        .with("unknown_event", true)
}
