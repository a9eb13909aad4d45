//! Volume lifecycle events.

use std::ops::RangeInclusive;

use rand::Rng;

use super::{Materialized, USERS};
use crate::{Node, Volume, common::choose};

const CREATED_SIZE_GB: RangeInclusive<u64> = 100..=3_000;
const EXPANSION_GB: RangeInclusive<u64> = 50..=500;
const RETAINED_SNAPSHOTS: RangeInclusive<u64> = 0..=10;
const SNAPSHOT_SIZE_MB: RangeInclusive<u64> = 10..=50_000;
const MOUNT_ROOTS: [&str; 4] = ["/mnt/data", "/var/lib/storage", "/srv/volumes", "/data"];

pub(super) fn created<R>(_node: &Node, volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let size_gb = rng.random_range(CREATED_SIZE_GB);
    let created_by = choose(rng, &USERS);
    Materialized::new(format!("Volume {} CREATED with {size_gb}GB", volume.id))
        .with("size_gb", size_gb)
        .with("created_by", created_by)
}

pub(super) fn deleted<R>(_node: &Node, volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let deleted_by = choose(rng, &USERS);
    let retained = rng.random_range(RETAINED_SNAPSHOTS);
    Materialized::new(format!("Volume {} DELETED by {deleted_by}", volume.id))
        .with("deleted_by", deleted_by)
        .with("retained_snapshots", retained)
}

pub(super) fn expanded<R>(_node: &Node, volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let delta_gb = rng.random_range(EXPANSION_GB);
    let old_capacity_gb = volume.capacity_gb();
    let new_capacity_gb = old_capacity_gb.saturating_add(delta_gb);
    let mut out = Materialized::new(format!(
        "Volume {} EXPANDED from {old_capacity_gb}GB to {new_capacity_gb}GB",
        volume.id
    ))
    .with("old_capacity_gb", old_capacity_gb)
    .with("new_capacity_gb", new_capacity_gb)
    .with("delta_gb", delta_gb);
    out.capacity_delta = Some(delta_gb);
    out
}

pub(super) fn mounted<R>(node: &Node, volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let mount_path = format!("{}/{}", choose(rng, &MOUNT_ROOTS), volume.id);
    let read_only = rng.random_bool(0.1);
    Materialized::new(format!(
        "Volume {} MOUNTED on node {} at {mount_path}",
        volume.id, node.id
    ))
    .with("mount_path", mount_path)
    .with("read_only", read_only)
}

pub(super) fn snapshot_created<R>(_node: &Node, volume: &Volume, rng: &mut R) -> Materialized
where
    R: Rng + ?Sized,
{
    let snapshot_id = format!("snap-{:08x}", rng.random::<u32>());
    let size_mb = rng.random_range(SNAPSHOT_SIZE_MB);
    Materialized::new(format!(
        "Snapshot {snapshot_id} CREATED for volume {} ({size_mb}MB)",
        volume.id
    ))
    .with("snapshot_id", snapshot_id)
    .with("size_mb", size_mb)
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::SmallRng};

    use super::{CREATED_SIZE_GB, EXPANSION_GB, created, expanded};
    use crate::materialize::test::fixture;

    proptest! {
        #[test]
        fn created_message_carries_bounded_size(seed: u64) {
            let (node, volume) = fixture();
            let mut rng = SmallRng::seed_from_u64(seed);
            let out = created(&node, &volume, &mut rng);

            let size = out
                .message
                .strip_prefix(&format!("Volume {} CREATED with ", volume.id))
                .and_then(|rest| rest.strip_suffix("GB"))
                .and_then(|n| n.parse::<u64>().ok())
                .expect("message does not match `Volume <id> CREATED with <N>GB`");
            prop_assert!(CREATED_SIZE_GB.contains(&size));
            prop_assert_eq!(out.fields["size_gb"].as_u64(), Some(size));
            let created_by = out.fields["created_by"].as_str().expect("created_by is a string");
            prop_assert!(!created_by.is_empty());
        }

        #[test]
        fn expansion_is_old_plus_delta(seed: u64) {
            let (node, volume) = fixture();
            let mut rng = SmallRng::seed_from_u64(seed);
            let out = expanded(&node, &volume, &mut rng);

            let delta = out.capacity_delta.expect("expansion sets a delta");
            prop_assert!(EXPANSION_GB.contains(&delta));
            prop_assert_eq!(out.fields["old_capacity_gb"].as_u64(), Some(volume.capacity_gb()));
            prop_assert_eq!(out.fields["new_capacity_gb"].as_u64(), Some(volume.capacity_gb() + delta));
            prop_assert_eq!(out.fields["delta_gb"].as_u64(), Some(delta));
        }
    }
}
