//! The simstor event synthesizer
//!
//! This library invents the events a simulated storage cluster would log. It
//! owns the node and volume [`Inventory`], picks an event kind from a weighted
//! [`Catalog`] and materializes a message plus a structured field map for it.
//! Every random draw flows through a caller supplied [`rand::Rng`] so that a
//! seeded source yields a reproducible stream.

#![deny(clippy::cargo)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

pub mod catalog;
pub mod common;
pub mod enrich;
pub mod inventory;
pub mod kind;
pub mod materialize;
pub mod severity;
pub mod synthesizer;

pub use catalog::{Catalog, EventDefinition, Pick};
pub use inventory::{Expansion, Inventory, Node, Volume};
pub use kind::EventKind;
pub use severity::Severity;
pub use synthesizer::{GeneratedEvent, Synthesizer};

/// Structured metadata attached to a generated event.
///
/// Keys are kept sorted, which keeps serialized output stable for a given
/// seed.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Errors related to building the synthesizer
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The event catalog holds no definitions
    #[error("event catalog is empty")]
    EmptyCatalog,
    /// An event weight is zero, negative or not finite
    #[error("event {name} has weight {weight}, weights must be finite and positive")]
    InvalidWeight {
        /// Name of the offending event
        name: String,
        /// The rejected weight
        weight: f64,
    },
    /// The sum of all weights is not finite
    #[error("total catalog weight is not finite")]
    WeightOverflow,
    /// Two definitions share a name
    #[error("event {0} is defined more than once")]
    DuplicateEvent(String),
    /// A weight override names an event absent from the catalog
    #[error("weight override names unknown event {0}")]
    UnknownOverride(String),
    /// Severity string is not one of the five levels
    #[error("unknown severity {0}")]
    UnknownSeverity(String),
    /// A resource catalog is empty
    #[error("{0} inventory is empty")]
    EmptyInventory(&'static str),
    /// Two resources of the same kind share an id
    #[error("duplicate {kind} id {id}")]
    DuplicateResource {
        /// Resource kind, node or volume
        kind: &'static str,
        /// The repeated id
        id: String,
    },
    /// A configured range is not well-formed
    #[error("invalid range for {field}: {reason}")]
    InvalidRange {
        /// The configuration field holding the range
        field: &'static str,
        /// Why the range was rejected
        reason: &'static str,
    },
}
