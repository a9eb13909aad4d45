//! The `tracing` sink.
//!
//! Each generated event becomes a `tracing` event under the `simstor::events`
//! target. `tracing` has no critical level, so CRITICAL events are emitted at
//! error with the original severity kept in the `severity` field.

use std::fmt;

use simstor_events::{Fields, GeneratedEvent, Severity};
use tracing::{debug, error, info, warn};

use super::Sink;

/// Renders a field map as compact JSON.
struct Json<'a>(&'a Fields);

impl fmt::Display for Json<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = serde_json::to_string(self.0).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

#[derive(Debug, Default, Clone, Copy)]
/// Emits events through the process `tracing` subscriber.
pub struct Logger;

impl Sink for Logger {
    fn emit(&mut self, event: &GeneratedEvent) {
        let name = event.name.as_str();
        let severity = event.severity.as_str();
        let fields = Json(&event.fields);
        let message = event.message.as_str();
        // `tracing` macros need the level as a constant, one arm per level
        match event.severity {
            Severity::Debug => {
                debug!(target: "simstor::events", event = name, severity, %fields, "{message}");
            }
            Severity::Info => {
                info!(target: "simstor::events", event = name, severity, %fields, "{message}");
            }
            Severity::Warning => {
                warn!(target: "simstor::events", event = name, severity, %fields, "{message}");
            }
            Severity::Error | Severity::Critical => {
                error!(target: "simstor::events", event = name, severity, %fields, "{message}");
            }
        }
    }
}
