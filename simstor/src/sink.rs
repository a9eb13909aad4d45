//! Log sinks.
//!
//! A sink accepts each generated event synchronously and never blocks the
//! generation loop. Delivery, where there is any, happens elsewhere and its
//! failures stay there.

use serde::Deserialize;
use serde_json::Value;
use simstor_events::GeneratedEvent;

pub mod http;
pub mod logger;

pub use http::Http;
pub use logger::Logger;

/// Errors produced by sink construction
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Wrapper for [`http::Error`]
    #[error(transparent)]
    Http(#[from] http::Error),
}

#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
#[serde(rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
/// Where generated events go.
pub enum Config {
    /// Emit each event as a `tracing` event.
    #[default]
    Tracing,
    /// Batch events to a remote HTTP log ingest.
    Http(http::Config),
}

/// Accepts generated events.
pub trait Sink {
    /// Take one event. Must not block.
    fn emit(&mut self, event: &GeneratedEvent);
}

/// Record keys owned by the sink. No event field may use them.
pub(crate) const RESERVED_KEYS: [&str; 3] = ["dt", "level", "message"];

/// The flat record shape shipped to remote ingest: `dt`, `level`, `message`
/// and `event` followed by every event field.
pub(crate) fn record(event: &GeneratedEvent, dt: String) -> Value {
    debug_assert!(
        RESERVED_KEYS.iter().all(|k| !event.fields.contains_key(*k)),
        "event {} carries a reserved field",
        event.name
    );
    let mut record = serde_json::Map::with_capacity(event.fields.len() + 4);
    record.insert("dt".to_string(), Value::String(dt));
    record.insert("level".to_string(), event.severity.as_str().into());
    record.insert("message".to_string(), event.message.clone().into());
    record.insert("event".to_string(), event.name.clone().into());
    for (k, v) in &event.fields {
        record.entry(k.clone()).or_insert_with(|| v.clone());
    }
    Value::Object(record)
}

#[cfg(test)]
pub(crate) mod test {
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::SmallRng};
    use simstor_events::{
        Catalog, EventDefinition, EventKind, GeneratedEvent, Inventory, Synthesizer,
    };

    use super::{Config, RESERVED_KEYS, Sink, record};

    /// Keeps every event it is handed.
    #[derive(Debug, Default)]
    pub(crate) struct Recording {
        pub(crate) events: Vec<GeneratedEvent>,
    }

    impl Sink for Recording {
        fn emit(&mut self, event: &GeneratedEvent) {
            self.events.push(event.clone());
        }
    }

    pub(crate) fn events(count: usize) -> Vec<GeneratedEvent> {
        let mut rng = SmallRng::seed_from_u64(99);
        let mut syn = Synthesizer::new(Catalog::default(), Inventory::default(), 1);
        (0..count).map(|_| syn.generate(&mut rng)).collect()
    }

    #[test]
    fn record_flattens_fields() {
        let event = events(1).remove(0);
        let record = record(&event, "2026-01-01T00:00:00Z".to_string());
        let map = record.as_object().expect("record is a map");
        assert_eq!(map["dt"], "2026-01-01T00:00:00Z");
        assert_eq!(map["level"], event.severity.as_str());
        assert_eq!(map["message"], event.message.as_str());
        assert_eq!(map["event"], event.name.as_str());
        for (k, v) in &event.fields {
            assert_eq!(&map[k], v);
        }
    }

    proptest! {
        #[test]
        fn record_carries_every_field(seed: u64) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut syn = Synthesizer::new(Catalog::default(), Inventory::default(), 1);
            let event = syn.generate(&mut rng);
            let record = record(&event, String::new());
            let map = record.as_object().expect("record is a map");
            prop_assert_eq!(map.len(), event.fields.len() + 3);
            for key in event.fields.keys() {
                prop_assert!(map.contains_key(key));
            }
        }
    }

    #[test]
    fn no_kind_uses_a_reserved_key() {
        let mut syn = Synthesizer::new(Catalog::default(), Inventory::default(), 1);
        let mut rng = SmallRng::seed_from_u64(5);
        for &kind in EventKind::ALL {
            let definition = EventDefinition::builtin(kind);
            for _ in 0..32 {
                let event = syn.generate_definition(&definition, &mut rng);
                for key in RESERVED_KEYS {
                    assert!(
                        !event.fields.contains_key(key),
                        "{} uses {key}",
                        event.name
                    );
                }
            }
        }
    }

    #[test]
    fn sink_config_defaults_to_tracing() {
        assert_eq!(Config::default(), Config::Tracing);
    }
}
