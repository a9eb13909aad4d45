//! Node membership events.

use std::ops::RangeInclusive;

use rand::Rng;

use super::Materialized;
use crate::{Node, Volume, common::choose};

const JOIN_REASONS: [&str; 4] = [
    "scale-out",
    "replacement",
    "maintenance-complete",
    "rebalance",
];
const LEAVE_REASONS: [&str; 3] = ["decommissioned", "maintenance", "scale-in"];
const OFFLINE_REASONS: [&str; 4] = [
    "heartbeat-timeout",
    "network-partition",
    "power-loss",
    "kernel-panic",
];
const REBOOT_REASONS: [&str; 4] = [
    "kernel-upgrade",
    "firmware-update",
    "watchdog",
    "operator-request",
];

const HEARTBEAT_SECS: RangeInclusive<u64> = 5..=300;
const UPTIME_HOURS: RangeInclusive<u64> = 1..=2_000;

pub(super) fn joined<R>(node: &Node, _volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let reason = choose(rng, &JOIN_REASONS);
    Materialized::new(format!(
        "Node {} ({}) JOINED cluster {} in {}",
        node.id, node.ip, node.cluster, node.region
    ))
    .with("reason", reason)
}

pub(super) fn left<R>(node: &Node, _volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let reason = choose(rng, &LEAVE_REASONS);
    Materialized::new(format!(
        "Node {} LEFT cluster {}: {reason}",
        node.id, node.cluster
    ))
    .with("reason", reason)
}

pub(super) fn offline<R>(node: &Node, _volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let reason = choose(rng, &OFFLINE_REASONS);
    let silent = rng.random_range(HEARTBEAT_SECS);
    Materialized::new(format!(
        "Node {} ({}) OFFLINE, no heartbeat for {silent}s",
        node.id, node.ip
    ))
    .with("reason", reason)
    .with("last_heartbeat_secs", silent)
}

pub(super) fn rebooted<R>(node: &Node, _volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let reason = choose(rng, &REBOOT_REASONS);
    let uptime = rng.random_range(UPTIME_HOURS);
    Materialized::new(format!(
        "Node {} REBOOTED after {uptime}h uptime: {reason}",
        node.id
    ))
    .with("reason", reason)
    .with("uptime_hours", uptime)
}
