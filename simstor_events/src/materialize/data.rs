//! Data path events: reads, writes, replication and cache traffic.

use std::ops::RangeInclusive;

use rand::Rng;

use super::Materialized;
use crate::{
    Node, Volume,
    common::{choose, round2},
};

const TRANSFER_BYTES: RangeInclusive<u64> = 4_096..=104_857_600;
const READ_LATENCY_MS: RangeInclusive<f64> = 0.1..=50.0;
const WRITE_LATENCY_MS: RangeInclusive<f64> = 0.2..=80.0;
const REPLICA_SIZE_MB: RangeInclusive<u64> = 100..=20_000;
const REPLICA_DURATION_MS: RangeInclusive<u64> = 100..=120_000;
const REPLICA_PEERS: RangeInclusive<u32> = 1..=12;
const RETRY_SECS: RangeInclusive<u64> = 5..=120;
const HIT_RATIO: RangeInclusive<f64> = 0.70..=0.99;
const FETCH_LATENCY_MS: RangeInclusive<u64> = 1..=200;
const REPLICATION_ERRORS: [&str; 3] = [
    "E_REPL_TIMEOUT",
    "E_REPL_CHECKSUM",
    "E_REPL_PEER_UNREACHABLE",
];

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Megabytes per second for `bytes` moved in `millis`.
fn throughput_mbps(bytes: u64, millis: f64) -> f64 {
    round2((bytes as f64 / BYTES_PER_MB) / (millis / 1_000.0))
}

fn peer<R>(rng: &mut R) -> String
where
    R: Rng + ?Sized,
{
    format!("node-{:02}", rng.random_range(REPLICA_PEERS))
}

fn cache_key<R>(volume: &Volume, rng: &mut R) -> String
where
    R: Rng + ?Sized,
{
    format!("blk:{}:{:06x}", volume.id, rng.random_range(0..0x00ff_ffff_u32))
}

pub(super) fn read<R>(node: &Node, volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let bytes = rng.random_range(TRANSFER_BYTES);
    let latency_ms = round2(rng.random_range(READ_LATENCY_MS));
    let throughput = throughput_mbps(bytes, latency_ms);
    Materialized::new(format!(
        "Read {bytes} bytes from volume {} on node {} in {latency_ms}ms ({throughput} MB/s)",
        volume.id, node.id
    ))
    .with("bytes", bytes)
    .with("latency_ms", latency_ms)
    .with("throughput_mbps", throughput)
}

pub(super) fn write<R>(node: &Node, volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let bytes = rng.random_range(TRANSFER_BYTES);
    let latency_ms = round2(rng.random_range(WRITE_LATENCY_MS));
    let throughput = throughput_mbps(bytes, latency_ms);
    Materialized::new(format!(
        "Wrote {bytes} bytes to volume {} on node {} in {latency_ms}ms ({throughput} MB/s)",
        volume.id, node.id
    ))
    .with("bytes", bytes)
    .with("latency_ms", latency_ms)
    .with("throughput_mbps", throughput)
}

pub(super) fn replication_started<R>(node: &Node, volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let target = peer(rng);
    let size_mb = rng.random_range(REPLICA_SIZE_MB);
    Materialized::new(format!(
        "Replication of volume {} STARTED from {} to {target} ({size_mb}MB)",
        volume.id, node.id
    ))
    .with("target_node", target)
    .with("size_mb", size_mb)
}

pub(super) fn replication_completed<R>(_node: &Node, volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let target = peer(rng);
    let size_mb = rng.random_range(REPLICA_SIZE_MB);
    let duration_ms = rng.random_range(REPLICA_DURATION_MS);
    let throughput = round2(size_mb as f64 / (duration_ms as f64 / 1_000.0));
    Materialized::new(format!(
        "Replication of volume {} to {target} COMPLETED in {duration_ms}ms ({throughput} MB/s)",
        volume.id
    ))
    .with("target_node", target)
    .with("size_mb", size_mb)
    .with("duration_ms", duration_ms)
    .with("throughput_mbps", throughput)
}

pub(super) fn replication_failed<R>(_node: &Node, volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let target = peer(rng);
    let error_code = choose(rng, &REPLICATION_ERRORS);
    let retry = rng.random_range(RETRY_SECS);
    Materialized::new(format!(
        "Replication of volume {} to {target} FAILED: {error_code}, retrying in {retry}s",
        volume.id
    ))
    .with("target_node", target)
    .with("error_code", error_code)
    .with("retry_in_secs", retry)
}

pub(super) fn cache_hit<R>(node: &Node, volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let key = cache_key(volume, rng);
    let hit_ratio = round2(rng.random_range(HIT_RATIO));
    Materialized::new(format!("Cache HIT for {key} on node {}", node.id))
        .with("cache_key", key)
        .with("hit_ratio", hit_ratio)
}

pub(super) fn cache_miss<R>(node: &Node, volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let key = cache_key(volume, rng);
    let fetch_ms = rng.random_range(FETCH_LATENCY_MS);
    Materialized::new(format!(
        "Cache MISS for {key} on node {}, fetched in {fetch_ms}ms",
        node.id
    ))
    .with("cache_key", key)
    .with("fetch_latency_ms", fetch_ms)
}
