//! Capacity and performance alerts.

use std::ops::RangeInclusive;

use rand::Rng;

use super::Materialized;
use crate::{
    Node, Volume,
    common::{round1, round2},
};

const USED_PERCENT: RangeInclusive<f64> = 80.0..=99.9;
const P99_LATENCY_MS: RangeInclusive<u64> = 100..=5_000;
const LATENCY_THRESHOLD_MS: u64 = 100;
const SPIKE_LATENCY_MS: RangeInclusive<f64> = 100.0..=2_000.0;
const IOPS: RangeInclusive<u64> = 100..=50_000;
const QUEUE_DEPTH: RangeInclusive<u64> = 1..=256;
const HEALTHY_PROBABILITY: f64 = 0.98;

pub(super) fn capacity<R>(_node: &Node, volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let used_percent = round1(rng.random_range(USED_PERCENT));
    let capacity_gb = volume.capacity_gb();
    let used_gb = round2(capacity_gb as f64 * used_percent / 100.0);
    Materialized::new(format!(
        "Volume {} at {used_percent}% capacity ({used_gb}GB of {capacity_gb}GB)",
        volume.id
    ))
    .with("used_percent", used_percent)
    .with("used_gb", used_gb)
    .with("capacity_gb", capacity_gb)
}

pub(super) fn performance<R>(node: &Node, _volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let p99 = rng.random_range(P99_LATENCY_MS);
    Materialized::new(format!(
        "Node {} p99 latency {p99}ms exceeds {LATENCY_THRESHOLD_MS}ms threshold",
        node.id
    ))
    .with("p99_latency_ms", p99)
    .with("threshold_ms", LATENCY_THRESHOLD_MS)
}

pub(super) fn io_latency_spike<R>(_node: &Node, volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let latency_ms = round2(rng.random_range(SPIKE_LATENCY_MS));
    let iops = rng.random_range(IOPS);
    let queue_depth = rng.random_range(QUEUE_DEPTH);
    Materialized::new(format!(
        "IO latency spike on volume {}: {latency_ms}ms at {iops} IOPS (queue depth {queue_depth})",
        volume.id
    ))
    .with("latency_ms", latency_ms)
    .with("iops", iops)
    .with("queue_depth", queue_depth)
}

pub(super) fn health_check<R>(node: &Node, _volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let iops = rng.random_range(IOPS);
    let healthy = rng.random_bool(HEALTHY_PROBABILITY);
    let verdict = if healthy { "passed" } else { "failed" };
    Materialized::new(format!(
        "Health check {verdict} on node {} ({iops} IOPS)",
        node.id
    ))
    .with("iops", iops)
    .with("healthy", healthy)
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::SmallRng};

    use super::{P99_LATENCY_MS, capacity, io_latency_spike, performance};
    use crate::materialize::{data, test::fixture};

    proptest! {
        #[test]
        fn capacity_alert_is_consistent(seed: u64) {
            let (node, volume) = fixture();
            let mut rng = SmallRng::seed_from_u64(seed);
            let out = capacity(&node, &volume, &mut rng);
            let pct = out.fields["used_percent"].as_f64().expect("percent is numeric");
            prop_assert!((80.0..=99.9).contains(&pct));
            let used = out.fields["used_gb"].as_f64().expect("used is numeric");
            prop_assert!(used <= volume.capacity_gb() as f64);
            prop_assert_eq!(out.fields["capacity_gb"].as_u64(), Some(volume.capacity_gb()));
        }

        #[test]
        fn performance_alert_exceeds_threshold(seed: u64) {
            let (node, volume) = fixture();
            let mut rng = SmallRng::seed_from_u64(seed);
            let out = performance(&node, &volume, &mut rng);
            let p99 = out.fields["p99_latency_ms"].as_u64().expect("latency is integral");
            prop_assert!(P99_LATENCY_MS.contains(&p99));
            prop_assert!(p99 >= out.fields["threshold_ms"].as_u64().expect("threshold is integral"));
        }

        #[test]
        fn latency_is_a_float_wherever_it_appears(seed: u64) {
            let (node, volume) = fixture();
            let mut rng = SmallRng::seed_from_u64(seed);
            let spike = io_latency_spike(&node, &volume, &mut rng);
            let latency = &spike.fields["latency_ms"];
            prop_assert!(latency.is_f64());
            let ms = latency.as_f64().expect("latency is numeric");
            prop_assert!((100.0..=2_000.0).contains(&ms));
            for out in [data::read(&node, &volume, &mut rng), data::write(&node, &volume, &mut rng)] {
                prop_assert!(out.fields["latency_ms"].is_f64());
            }
        }
    }
}
