//! This module controls configuration parsing from the end user, providing a
//! convenience mechanism for the rest of the program. Crashes are most likely
//! to originate from this code, intentionally.

use std::{collections::BTreeMap, fs, path::Path};

use serde::Deserialize;
use simstor_events::{
    Catalog, EventDefinition, EventKind, Inventory, Node, Synthesizer, Volume,
    common::config::ConfRange,
};
use tracing::warn;

use crate::{host, sink, telemetry::Telemetry};

/// Environment variable holding the full configuration, preferred over the
/// configuration file when set.
pub const CONFIG_ENV: &str = "SIMSTOR_CONFIG";

/// Errors produced by [`Config`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// Error reading the configuration file
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        /// File path
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
    /// Catalog, inventory or range rejected by the synthesizer
    #[error(transparent)]
    Events(#[from] simstor_events::Error),
    /// Sink configuration is unusable
    #[error(transparent)]
    Sink(#[from] sink::Error),
    /// A period that must be positive is zero
    #[error("{0} must be greater than zero")]
    ZeroPeriod(&'static str),
}

fn default_delay_millis() -> ConfRange<u64> {
    ConfRange::Inclusive { min: 10, max: 50 }
}

fn default_inventory_report_seconds() -> u64 {
    15
}

/// Main configuration struct for this program
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Seed for the event stream, random when absent
    #[serde(default)]
    pub seed: Option<[u8; 32]>,
    /// Process id stamped on events, this process's id when absent
    #[serde(default)]
    pub pid: Option<u32>,
    /// Event generation
    #[serde(default)]
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub generator: Generator,
    /// Simulated cluster contents
    #[serde(default)]
    pub inventory: InventoryConfig,
    /// Where generated events go
    #[serde(default)]
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub sink: sink::Config,
    /// The method by which to express telemetry
    #[serde(default)]
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub telemetry: Telemetry,
    /// Host metrics sampling, disabled when absent
    #[serde(default)]
    pub host_sampler: Option<host::Config>,
}

/// Event generation settings
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Generator {
    /// Pause between events, in milliseconds
    #[serde(default = "default_delay_millis")]
    pub delay_millis: ConfRange<u64>,
    /// Period on which inventory gauges are published
    #[serde(default = "default_inventory_report_seconds")]
    pub inventory_report_seconds: u64,
    /// Replacement event catalog, the built-in catalog when absent
    #[serde(default)]
    pub events: Option<Vec<EventDefinition>>,
    /// Per-event weight overrides applied to the catalog
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
}

impl Default for Generator {
    fn default() -> Self {
        Self {
            delay_millis: default_delay_millis(),
            inventory_report_seconds: default_inventory_report_seconds(),
            events: None,
            weights: BTreeMap::new(),
        }
    }
}

/// Replacement node and volume catalogs. Either defaults to the built-in set.
#[derive(Debug, Default, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct InventoryConfig {
    /// Replacement nodes
    #[serde(default)]
    pub nodes: Option<Vec<Node>>,
    /// Replacement volumes
    #[serde(default)]
    pub volumes: Option<Vec<Volume>>,
}

impl Config {
    /// Check every section, warning about event names the materializer does
    /// not know.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), Error> {
        self.generator.delay_millis.validate("delay_millis")?;
        if self.generator.inventory_report_seconds == 0 {
            return Err(Error::ZeroPeriod("inventory_report_seconds"));
        }
        if let Some(host) = &self.host_sampler
            && host.period_seconds == 0
        {
            return Err(Error::ZeroPeriod("host_sampler.period_seconds"));
        }
        if let sink::Config::Http(http) = &self.sink {
            http.validate().map_err(sink::Error::from)?;
        }
        let catalog = self.catalog()?;
        for def in catalog.definitions() {
            if EventKind::from_name(&def.name).is_none() {
                warn!(
                    "event {} has no handler and will be logged as UNKNOWN EVENT",
                    def.name
                );
            }
        }
        self.inventory()?;
        Ok(())
    }

    /// The event catalog with weight overrides applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog or overrides are invalid.
    pub fn catalog(&self) -> Result<Catalog, Error> {
        let base = match &self.generator.events {
            Some(events) => Catalog::new(events.clone())?,
            None => Catalog::default(),
        };
        if self.generator.weights.is_empty() {
            Ok(base)
        } else {
            Ok(base.reweighted(&self.generator.weights)?)
        }
    }

    /// The inventory, built-in catalogs filling in for absent ones.
    ///
    /// # Errors
    ///
    /// Returns an error if a catalog is empty or repeats an id.
    pub fn inventory(&self) -> Result<Inventory, Error> {
        let builtin = Inventory::default();
        let nodes = self
            .inventory
            .nodes
            .clone()
            .unwrap_or_else(|| builtin.nodes().to_vec());
        let volumes = self
            .inventory
            .volumes
            .clone()
            .unwrap_or_else(|| builtin.volumes().to_vec());
        Ok(Inventory::new(nodes, volumes)?)
    }

    /// A synthesizer over this configuration's catalog and inventory.
    ///
    /// # Errors
    ///
    /// See [`Config::catalog`] and [`Config::inventory`].
    pub fn synthesizer(&self) -> Result<Synthesizer, Error> {
        let pid = self.pid.unwrap_or_else(std::process::id);
        Ok(Synthesizer::new(self.catalog()?, self.inventory()?, pid))
    }
}

/// Parse and validate configuration text.
///
/// # Errors
///
/// Returns an error if the YAML is malformed or fails validation.
pub fn parse(contents: &str) -> Result<Config, Error> {
    let config: Config = serde_yaml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

/// Read, parse and validate the configuration file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse.
pub fn load(path: &Path) -> Result<Config, Error> {
    let contents = fs::read_to_string(path).map_err(|source| Error::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    parse(&contents)
}
