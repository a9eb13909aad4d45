//! The event synthesizer.
//!
//! A [`Synthesizer`] owns the event [`Catalog`] and the cluster [`Inventory`].
//! Each call to [`Synthesizer::generate`] selects an event definition, picks
//! a node and a volume, materializes the kind-specific message and fields,
//! applies any capacity growth and finally layers the common fields and
//! enrichment on top.
//!
//! Events observe the inventory as it stands when they are generated. A
//! `VOLUME_EXPANDED` event reports the post-expansion capacity in its common
//! `capacity_gb` field and every later event touching that volume sees the
//! grown value.

use rand::Rng;
use serde::Serialize;

use crate::{
    Catalog, EventDefinition, Fields, Inventory, Severity, enrich::enrich,
    materialize::materialize,
};

/// One synthesized event, ready for a log sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedEvent {
    /// Event name, equal to `fields["event"]`
    pub name: String,
    /// Severity from the catalog definition
    pub severity: Severity,
    /// Human-readable log line
    pub message: String,
    /// Common, kind-specific and enrichment fields
    pub fields: Fields,
    /// Whether the selector fell through to the catalog's fallback
    #[serde(skip)]
    pub selected_by_fallback: bool,
}

/// Generates events against an owned catalog and inventory.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    catalog: Catalog,
    inventory: Inventory,
    pid: u32,
}

impl Synthesizer {
    /// Create a new synthesizer. `pid` is stamped on every event.
    #[must_use]
    pub fn new(catalog: Catalog, inventory: Inventory, pid: u32) -> Self {
        Self {
            catalog,
            inventory,
            pid,
        }
    }

    /// The event catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The inventory, including any capacity growth applied so far.
    #[must_use]
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Select an event definition by weight and synthesize it.
    pub fn generate<R>(&mut self, rng: &mut R) -> GeneratedEvent
    where
        R: Rng + ?Sized,
    {
        let pick = self.catalog.select(rng);
        let mut event = synthesize(&mut self.inventory, pick.definition(), self.pid, rng);
        event.selected_by_fallback = pick.is_fallback();
        event
    }

    /// Synthesize `definition` without consulting the selector.
    ///
    /// The definition need not belong to the catalog.
    pub fn generate_definition<R>(
        &mut self,
        definition: &EventDefinition,
        rng: &mut R,
    ) -> GeneratedEvent
    where
        R: Rng + ?Sized,
    {
        synthesize(&mut self.inventory, definition, self.pid, rng)
    }
}

fn synthesize<R>(
    inventory: &mut Inventory,
    definition: &EventDefinition,
    pid: u32,
    rng: &mut R,
) -> GeneratedEvent
where
    R: Rng + ?Sized,
{
    let picked = inventory.pick(rng);
    let materialized = materialize(
        &definition.name,
        &inventory.nodes()[picked.node],
        &inventory.volumes()[picked.volume],
        rng,
    );
    if let Some(delta) = materialized.capacity_delta {
        let expansion = inventory.expand_volume(picked.volume, delta);
        // `pick` only hands out in-bounds indices
        debug_assert!(
            expansion.is_some_and(|e| e.new_capacity_gb >= e.old_capacity_gb),
            "volume {} did not grow by {delta}GB",
            picked.volume
        );
    }

    let node = &inventory.nodes()[picked.node];
    let volume = &inventory.volumes()[picked.volume];
    let mut fields = Fields::new();
    fields.insert("event".to_string(), definition.name.clone().into());
    fields.insert("cluster".to_string(), node.cluster.clone().into());
    fields.insert("node_id".to_string(), node.id.clone().into());
    fields.insert("node_ip".to_string(), node.ip.clone().into());
    fields.insert("region".to_string(), node.region.clone().into());
    fields.insert("volume_id".to_string(), volume.id.clone().into());
    fields.insert("volume_cluster".to_string(), volume.cluster.clone().into());
    fields.insert("capacity_gb".to_string(), volume.capacity_gb().into());
    fields.insert("pid".to_string(), pid.into());
    fields.extend(materialized.fields);
    enrich(&mut fields, rng);

    GeneratedEvent {
        name: definition.name.clone(),
        severity: definition.severity,
        message: materialized.message,
        fields,
        selected_by_fallback: false,
    }
}
