//! The simulated cluster inventory.
//!
//! Nodes are immutable for the life of the process. Volumes are immutable
//! save for capacity, which only grows and only through
//! [`Inventory::expand_volume`].

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::Error;

/// A simulated cluster member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Node {
    /// Unique node id
    pub id: String,
    /// Cluster this node belongs to
    pub cluster: String,
    /// Node address
    pub ip: String,
    /// Region the node runs in
    pub region: String,
}

impl Node {
    fn new(id: &str, cluster: &str, ip: &str, region: &str) -> Self {
        Self {
            id: id.to_string(),
            cluster: cluster.to_string(),
            ip: ip.to_string(),
            region: region.to_string(),
        }
    }
}

/// A simulated storage volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Volume {
    /// Unique volume id
    pub id: String,
    /// Cluster the volume nominally lives in, not checked against nodes
    pub cluster: String,
    capacity_gb: u64,
}

impl Volume {
    /// Create a new volume.
    #[must_use]
    pub fn new(id: impl Into<String>, cluster: impl Into<String>, capacity_gb: u64) -> Self {
        Self {
            id: id.into(),
            cluster: cluster.into(),
            capacity_gb,
        }
    }

    /// Current capacity in gigabytes.
    #[must_use]
    pub fn capacity_gb(&self) -> u64 {
        self.capacity_gb
    }
}

/// Capacity before and after a volume expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expansion {
    /// Capacity before the expansion
    pub old_capacity_gb: u64,
    /// Capacity after the expansion, never less than `old_capacity_gb`
    pub new_capacity_gb: u64,
}

/// Indices of one node and one volume chosen for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Picked {
    /// Index into [`Inventory::nodes`]
    pub node: usize,
    /// Index into [`Inventory::volumes`]
    pub volume: usize,
}

/// The node and volume catalogs.
#[derive(Debug, Clone, PartialEq)]
pub struct Inventory {
    nodes: Vec<Node>,
    volumes: Vec<Volume>,
}

impl Inventory {
    /// Create a new inventory.
    ///
    /// # Errors
    ///
    /// Returns an error if either catalog is empty or ids repeat within a
    /// catalog.
    pub fn new(nodes: Vec<Node>, volumes: Vec<Volume>) -> Result<Self, Error> {
        if nodes.is_empty() {
            return Err(Error::EmptyInventory("node"));
        }
        if volumes.is_empty() {
            return Err(Error::EmptyInventory("volume"));
        }
        unique_ids("node", nodes.iter().map(|n| n.id.as_str()))?;
        unique_ids("volume", volumes.iter().map(|v| v.id.as_str()))?;
        Ok(Self { nodes, volumes })
    }

    /// All nodes.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All volumes.
    #[must_use]
    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    /// Sum of every volume's capacity.
    #[must_use]
    pub fn total_capacity_gb(&self) -> u64 {
        self.volumes
            .iter()
            .fold(0_u64, |acc, v| acc.saturating_add(v.capacity_gb))
    }

    /// Choose a node and a volume uniformly and independently of each other.
    pub fn pick<R>(&self, rng: &mut R) -> Picked
    where
        R: Rng + ?Sized,
    {
        Picked {
            node: rng.random_range(0..self.nodes.len()),
            volume: rng.random_range(0..self.volumes.len()),
        }
    }

    /// Grow the volume at `index` by `delta_gb`, saturating at `u64::MAX`.
    ///
    /// Returns `None` if `index` is out of bounds.
    pub fn expand_volume(&mut self, index: usize, delta_gb: u64) -> Option<Expansion> {
        let volume = self.volumes.get_mut(index)?;
        let old_capacity_gb = volume.capacity_gb;
        volume.capacity_gb = old_capacity_gb.saturating_add(delta_gb);
        Some(Expansion {
            old_capacity_gb,
            new_capacity_gb: volume.capacity_gb,
        })
    }
}

fn unique_ids<'a>(kind: &'static str, ids: impl Iterator<Item = &'a str>) -> Result<(), Error> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(Error::DuplicateResource {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

impl Default for Inventory {
    /// Six nodes across two clusters and eight volumes.
    fn default() -> Self {
        Self {
            nodes: vec![
                Node::new("node-01", "cluster-east", "10.0.1.11", "us-east-1"),
                Node::new("node-02", "cluster-east", "10.0.1.12", "us-east-1"),
                Node::new("node-03", "cluster-east", "10.0.2.13", "us-east-2"),
                Node::new("node-04", "cluster-west", "10.1.1.21", "us-west-2"),
                Node::new("node-05", "cluster-west", "10.1.1.22", "us-west-2"),
                Node::new("node-06", "cluster-west", "10.1.2.23", "eu-west-1"),
            ],
            volumes: vec![
                Volume::new("vol-a1b2", "cluster-east", 500),
                Volume::new("vol-c3d4", "cluster-east", 1_000),
                Volume::new("vol-e5f6", "cluster-east", 250),
                Volume::new("vol-g7h8", "cluster-east", 2_000),
                Volume::new("vol-i9j0", "cluster-west", 750),
                Volume::new("vol-k1l2", "cluster-west", 1_500),
                Volume::new("vol-m3n4", "cluster-west", 100),
                Volume::new("vol-o5p6", "cluster-west", 4_000),
            ],
        }
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::SmallRng};

    use super::{Inventory, Node, Volume};
    use crate::Error;

    #[test]
    fn builtin_inventory_passes_validation() {
        let inventory = Inventory::default();
        let rebuilt = Inventory::new(inventory.nodes().to_vec(), inventory.volumes().to_vec())
            .expect("builtin inventory invalid");
        assert_eq!(rebuilt, inventory);
    }

    #[test]
    fn empty_and_duplicate_catalogs_are_rejected() {
        let inventory = Inventory::default();
        assert_eq!(
            Inventory::new(Vec::new(), inventory.volumes().to_vec()),
            Err(Error::EmptyInventory("node"))
        );
        assert_eq!(
            Inventory::new(inventory.nodes().to_vec(), Vec::new()),
            Err(Error::EmptyInventory("volume"))
        );
        let mut volumes = inventory.volumes().to_vec();
        volumes.push(Volume::new("vol-a1b2", "cluster-west", 1));
        assert_eq!(
            Inventory::new(inventory.nodes().to_vec(), volumes),
            Err(Error::DuplicateResource {
                kind: "volume",
                id: "vol-a1b2".to_string()
            })
        );
        let node = Node::new("n", "c", "127.0.0.1", "r");
        assert!(matches!(
            Inventory::new(vec![node.clone(), node], inventory.volumes().to_vec()),
            Err(Error::DuplicateResource { kind: "node", .. })
        ));
    }

    #[test]
    fn expansion_out_of_bounds_is_none() {
        let mut inventory = Inventory::default();
        assert_eq!(inventory.expand_volume(inventory.volumes().len(), 10), None);
    }

    #[test]
    fn expansion_saturates() {
        let mut inventory = Inventory::new(
            vec![Node::new("n", "c", "127.0.0.1", "r")],
            vec![Volume::new("v", "c", u64::MAX - 1)],
        )
        .expect("valid inventory");
        let expansion = inventory.expand_volume(0, 10).expect("volume exists");
        assert_eq!(expansion.new_capacity_gb, u64::MAX);
        assert_eq!(inventory.volumes()[0].capacity_gb(), u64::MAX);
    }

    proptest! {
        #[test]
        fn capacity_never_decreases(deltas in prop::collection::vec(0_u64..10_000, 1..64), seed: u64) {
            let mut inventory = Inventory::default();
            let mut rng = SmallRng::seed_from_u64(seed);
            for delta in deltas {
                let before: Vec<u64> = inventory.volumes().iter().map(Volume::capacity_gb).collect();
                let idx = inventory.pick(&mut rng).volume;
                let expansion = inventory.expand_volume(idx, delta).expect("picked volume exists");
                prop_assert_eq!(expansion.old_capacity_gb, before[idx]);
                prop_assert_eq!(expansion.new_capacity_gb, before[idx] + delta);
                for (i, vol) in inventory.volumes().iter().enumerate() {
                    if i == idx {
                        prop_assert!(vol.capacity_gb() >= before[i]);
                    } else {
                        prop_assert_eq!(vol.capacity_gb(), before[i]);
                    }
                }
            }
        }

        #[test]
        fn pick_stays_in_bounds(seed: u64) {
            let inventory = Inventory::default();
            let mut rng = SmallRng::seed_from_u64(seed);
            let picked = inventory.pick(&mut rng);
            prop_assert!(picked.node < inventory.nodes().len());
            prop_assert!(picked.volume < inventory.volumes().len());
        }
    }
}
