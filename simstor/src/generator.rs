//! The event generation loop.
//!
//! A single [`Server`] owns the synthesizer and with it the inventory. Each
//! pass synthesizes one event, records metrics about it, hands it to the sink
//! and then sleeps for a delay drawn from the configured range. Inventory
//! gauges are published from the same loop on their own interval, so nothing
//! else ever touches the inventory.

use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use rand::{Rng, SeedableRng, rngs::StdRng};
use simstor_events::{GeneratedEvent, Inventory, Synthesizer, common::config::ConfRange};
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use crate::{config, signal::Watcher, sink::Sink, telemetry};

/// Errors produced by [`Server`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Delay range or catalog rejected by the synthesizer
    #[error(transparent)]
    Events(#[from] simstor_events::Error),
    /// The inventory report period is zero
    #[error("inventory report period must be greater than zero")]
    ZeroReportPeriod,
}

/// Build the event stream's random source. A `u64` seed takes precedence over
/// a full seed, and with neither the source is seeded from the operating
/// system.
#[must_use]
pub fn rng(seed_u64: Option<u64>, seed: Option<[u8; 32]>) -> StdRng {
    match (seed_u64, seed) {
        (Some(seed), _) => StdRng::seed_from_u64(seed),
        (None, Some(seed)) => StdRng::from_seed(seed),
        (None, None) => StdRng::from_rng(&mut rand::rng()),
    }
}

#[derive(Debug)]
/// The event generator.
pub struct Server<S, R = StdRng> {
    synthesizer: Synthesizer,
    delay_millis: ConfRange<u64>,
    report_period: Duration,
    rng: R,
    sink: S,
    shutdown: Watcher,
}

impl<S, R> Server<S, R>
where
    S: Sink,
    R: Rng,
{
    /// Create a new [`Server`] instance
    ///
    /// # Errors
    ///
    /// Returns an error if the delay range is inverted or the report period
    /// is zero.
    pub fn new(
        config: &config::Generator,
        synthesizer: Synthesizer,
        rng: R,
        sink: S,
        shutdown: Watcher,
    ) -> Result<Self, Error> {
        config.delay_millis.validate("delay_millis")?;
        if config.inventory_report_seconds == 0 {
            return Err(Error::ZeroReportPeriod);
        }
        Ok(Self {
            synthesizer,
            delay_millis: config.delay_millis,
            report_period: Duration::from_secs(config.inventory_report_seconds),
            rng,
            sink,
            shutdown,
        })
    }

    /// Synthesize one event, record it and hand it to the sink.
    pub fn step(&mut self) {
        let event = synthesize(&mut self.synthesizer, &mut self.rng);
        self.sink.emit(&event);
    }

    /// Run this [`Server`] until the shutdown signal fires. The sink is dropped
    /// on return, which lets a buffering sink flush.
    ///
    /// # Errors
    ///
    /// None are known.
    pub async fn spin(mut self) -> Result<(), Error> {
        info!(
            "generating events with {}ms delay over {} definitions",
            self.delay_millis,
            self.synthesizer.catalog().definitions().len()
        );
        let mut report = time::interval(self.report_period);
        report.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let pacing = time::sleep(Duration::ZERO);
        tokio::pin!(pacing);

        let shutdown_wait = self.shutdown.recv();
        tokio::pin!(shutdown_wait);
        loop {
            tokio::select! {
                () = &mut pacing => {
                    let event = synthesize(&mut self.synthesizer, &mut self.rng);
                    self.sink.emit(&event);
                    let delay = Duration::from_millis(self.delay_millis.sample(&mut self.rng));
                    pacing.as_mut().reset(time::Instant::now() + delay);
                }
                _ = report.tick() => report_inventory(self.synthesizer.inventory()),
                () = &mut shutdown_wait => {
                    info!("shutdown signal received");
                    return Ok(());
                }
            }
        }
    }
}

/// Synthesize one event and record metrics about it.
pub fn synthesize<R>(synthesizer: &mut Synthesizer, rng: &mut R) -> GeneratedEvent
where
    R: Rng + ?Sized,
{
    let start = Instant::now();
    let event = synthesizer.generate(rng);
    histogram!(telemetry::SYNTHESIS_DURATION).record(start.elapsed().as_secs_f64());

    if event.selected_by_fallback {
        warn!(
            "weighted draw matched no definition, fell back to {}",
            event.name
        );
        counter!(telemetry::SELECTOR_FALLBACK).increment(1);
    }
    counter!(telemetry::EVENTS_GENERATED, "event" => event.name.clone()).increment(1);
    counter!(telemetry::EVENTS_BY_SEVERITY, "severity" => event.severity.as_str()).increment(1);
    event
}

/// Publish inventory gauges.
pub fn report_inventory(inventory: &Inventory) {
    gauge!(telemetry::INVENTORY_NODES).set(inventory.nodes().len() as f64);
    gauge!(telemetry::INVENTORY_VOLUMES).set(inventory.volumes().len() as f64);
    gauge!(telemetry::INVENTORY_CAPACITY).set(inventory.total_capacity_gb() as f64);
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use rand::{SeedableRng, rngs::SmallRng};
    use simstor_events::{Catalog, Inventory, Synthesizer, common::config::ConfRange};

    use super::{Error, Server, report_inventory, rng};
    use crate::{config, signal, sink::test::Recording, telemetry};

    fn generator(delay_millis: ConfRange<u64>) -> config::Generator {
        config::Generator {
            delay_millis,
            ..config::Generator::default()
        }
    }

    fn synthesizer() -> Synthesizer {
        Synthesizer::new(Catalog::default(), Inventory::default(), 7)
    }

    #[test]
    fn step_records_metrics_and_emits() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let (watcher, _broadcaster) = signal::signal();
        let mut server = Server::new(
            &config::Generator::default(),
            synthesizer(),
            SmallRng::seed_from_u64(3),
            Recording::default(),
            watcher,
        )
        .expect("server builds");

        metrics::with_local_recorder(&recorder, || {
            for _ in 0..25 {
                server.step();
            }
        });
        assert_eq!(server.sink.events.len(), 25);

        let mut generated = 0;
        let mut by_severity = 0;
        let mut timed = 0;
        for (key, _, _, value) in snapshotter.snapshot().into_vec() {
            match (key.key().name(), value) {
                (telemetry::EVENTS_GENERATED, DebugValue::Counter(n)) => generated += n,
                (telemetry::EVENTS_BY_SEVERITY, DebugValue::Counter(n)) => by_severity += n,
                (telemetry::SYNTHESIS_DURATION, DebugValue::Histogram(samples)) => {
                    timed += samples.len();
                }
                _ => {}
            }
        }
        assert_eq!(generated, 25);
        assert_eq!(by_severity, 25);
        assert_eq!(timed, 25);
    }

    #[test]
    fn inventory_gauges() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let inventory = Inventory::default();
        metrics::with_local_recorder(&recorder, || report_inventory(&inventory));
        for (key, _, _, value) in snapshotter.snapshot().into_vec() {
            let DebugValue::Gauge(v) = value else {
                continue;
            };
            match key.key().name() {
                telemetry::INVENTORY_NODES => {
                    assert_eq!(v.into_inner(), inventory.nodes().len() as f64);
                }
                telemetry::INVENTORY_VOLUMES => {
                    assert_eq!(v.into_inner(), inventory.volumes().len() as f64);
                }
                telemetry::INVENTORY_CAPACITY => {
                    assert_eq!(v.into_inner(), inventory.total_capacity_gb() as f64);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn inverted_delay_is_rejected() {
        let (watcher, _broadcaster) = signal::signal();
        let res = Server::new(
            &generator(ConfRange::Inclusive { min: 50, max: 10 }),
            synthesizer(),
            SmallRng::seed_from_u64(3),
            Recording::default(),
            watcher,
        );
        assert!(matches!(res, Err(Error::Events(_))));
    }

    #[test]
    fn zero_report_period_is_rejected() {
        let (watcher, _broadcaster) = signal::signal();
        let res = Server::new(
            &config::Generator {
                inventory_report_seconds: 0,
                ..config::Generator::default()
            },
            synthesizer(),
            SmallRng::seed_from_u64(3),
            Recording::default(),
            watcher,
        );
        assert!(matches!(res, Err(Error::ZeroReportPeriod)));
    }

    #[test]
    fn seeded_rngs_agree() {
        use rand::Rng;

        let a: u64 = rng(Some(11), None).random();
        let b: u64 = rng(Some(11), Some([0; 32])).random();
        assert_eq!(a, b);
        let c: u64 = rng(None, Some([5; 32])).random();
        let d: u64 = rng(None, Some([5; 32])).random();
        assert_eq!(c, d);
    }

    #[tokio::test]
    async fn spin_stops_on_shutdown() {
        let (watcher, broadcaster) = signal::signal();
        let server = Server::new(
            &generator(ConfRange::Constant(1)),
            synthesizer(),
            SmallRng::seed_from_u64(3),
            Recording::default(),
            watcher.register().expect("registered"),
        )
        .expect("server builds");
        drop(watcher);
        let handle = tokio::spawn(server.spin());
        tokio::time::sleep(Duration::from_millis(50)).await;
        tokio::time::timeout(Duration::from_secs(2), broadcaster.signal_and_wait())
            .await
            .expect("generator released its registration");
        handle
            .await
            .expect("task joined")
            .expect("spin returned cleanly");
    }
}
