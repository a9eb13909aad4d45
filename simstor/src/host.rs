//! Host metrics sampling
//!
//! On Linux the sampler reads load average, memory and CPU counters for the
//! machine simstor runs on out of procfs and publishes them as gauges. On
//! non-Linux systems the sampler, if enabled, will emit a warning and exit.

use std::time::Duration;

use serde::Deserialize;

use crate::signal::Watcher;

#[cfg(target_os = "linux")]
mod linux;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
/// Configuration for [`Server`]
pub struct Config {
    /// Seconds between samples
    pub period_seconds: u64,
}

#[derive(Debug)]
/// The host metrics sampler.
pub struct Server {
    period: Duration,
    #[allow(dead_code)] // unused when target_os is not "linux"
    shutdown: Watcher,
}

impl Server {
    /// Create a new [`Server`] instance
    #[must_use]
    pub fn new(config: Config, shutdown: Watcher) -> Self {
        Self {
            period: Duration::from_secs(config.period_seconds.max(1)),
            shutdown,
        }
    }

    /// Sample until the shutdown signal fires. A failed sample is logged and
    /// sampling carries on.
    #[cfg(target_os = "linux")]
    pub async fn run(self) {
        let mut sample_delay = tokio::time::interval(self.period);
        let shutdown_wait = self.shutdown.recv();
        tokio::pin!(shutdown_wait);
        loop {
            tokio::select! {
                _ = sample_delay.tick() => {
                    if let Err(err) = linux::sample() {
                        tracing::warn!("host sample failed: {err}");
                    }
                }
                () = &mut shutdown_wait => {
                    tracing::info!("shutdown signal received");
                    return;
                }
            }
        }
    }

    /// "Run" this [`Server`]
    ///
    /// On non-Linux systems, this function is a no-op that logs a warning
    /// indicating host sampling is unavailable on these systems.
    #[allow(clippy::unused_async)]
    #[cfg(not(target_os = "linux"))]
    pub async fn run(self) {
        tracing::warn!("host sampler unavailable on non-Linux system");
    }
}
