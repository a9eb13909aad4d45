//! Disk and data integrity events.

use std::ops::RangeInclusive;

use rand::Rng;

use super::Materialized;
use crate::{Node, Volume, common::choose};

const DISK_SLOTS: RangeInclusive<u8> = 1..=8;
const DISK_ERRORS: [&str; 3] = ["E_DISK_IO", "E_SMART_THRESHOLD", "E_SECTOR_UNREADABLE"];
const TEMPERATURE_C: RangeInclusive<u64> = 60..=85;
const REPAIR_PROBABILITY: f64 = 0.6;

fn disk_id<R>(rng: &mut R) -> String
where
    R: Rng + ?Sized,
{
    format!("disk-{}", rng.random_range(DISK_SLOTS))
}

pub(super) fn disk_failure<R>(node: &Node, _volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let disk = disk_id(rng);
    let error_code = choose(rng, &DISK_ERRORS);
    Materialized::new(format!(
        "Disk {disk} FAILED on node {}: {error_code}",
        node.id
    ))
    .with("disk_id", disk)
    .with("error_code", error_code)
}

pub(super) fn disk_temperature_high<R>(node: &Node, _volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let disk = disk_id(rng);
    let temperature = rng.random_range(TEMPERATURE_C);
    Materialized::new(format!(
        "Disk {disk} on node {} running hot at {temperature}C",
        node.id
    ))
    .with("disk_id", disk)
    .with("temperature_c", temperature)
}

pub(super) fn corruption_detected<R>(_node: &Node, volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let block = rng.random_range(0..1_u64 << 32);
    let expected: u32 = rng.random();
    // a non-zero xor guarantees the checksums differ
    let actual = expected ^ rng.random_range(1..=u32::MAX);
    let repaired = rng.random_bool(REPAIR_PROBABILITY);
    let outcome = if repaired { "repaired" } else { "unrepaired" };
    Materialized::new(format!(
        "Checksum mismatch on volume {} block {block}: expected {expected:08x}, got {actual:08x} ({outcome})",
        volume.id
    ))
    .with("block_id", block)
    .with("checksum_expected", format!("{expected:08x}"))
    .with("checksum_actual", format!("{actual:08x}"))
    .with("repaired", repaired)
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::SmallRng};

    use super::{DISK_ERRORS, corruption_detected, disk_failure};
    use crate::materialize::test::fixture;

    fn is_disk_id(id: &str) -> bool {
        id.strip_prefix("disk-")
            .and_then(|n| n.parse::<u8>().ok())
            .is_some_and(|n| (1..=8).contains(&n))
            && id.len() == "disk-1".len()
    }

    proptest! {
        #[test]
        fn disk_failure_fields(seed: u64) {
            let (node, volume) = fixture();
            let mut rng = SmallRng::seed_from_u64(seed);
            let out = disk_failure(&node, &volume, &mut rng);
            let disk = out.fields["disk_id"].as_str().expect("disk id is a string");
            prop_assert!(is_disk_id(disk), "bad disk id {}", disk);
            let code = out.fields["error_code"].as_str().expect("error code is a string");
            prop_assert!(DISK_ERRORS.contains(&code));
        }

        #[test]
        fn corrupt_checksums_differ(seed: u64) {
            let (node, volume) = fixture();
            let mut rng = SmallRng::seed_from_u64(seed);
            let out = corruption_detected(&node, &volume, &mut rng);
            prop_assert_ne!(&out.fields["checksum_expected"], &out.fields["checksum_actual"]);
        }
    }
}
