//! The HTTP sink.
//!
//! Events are queued without blocking into a bounded channel. A background
//! task drains the channel, batching records and POSTing each batch as a JSON
//! array with a bearer token. A full queue drops the event. A failed POST is
//! logged and counted, the batch is not retried. A POST that outlasts
//! `timeout_millis` has failed. When the sink is dropped the
//! task ships whatever remains and exits.

use std::{env, num::NonZeroUsize, time::Duration};

use metrics::counter;
use serde::Deserialize;
use serde_json::Value;
use simstor_events::GeneratedEvent;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    time::{self as ttime, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use super::{Sink, record};
use crate::{
    signal::{self, Watcher},
    telemetry,
};

/// Environment variable consulted when the configuration carries no token.
pub const TOKEN_ENV: &str = "SIMSTOR_SINK_TOKEN";

/// Errors produced by [`Http`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Neither the configuration nor the environment supplied a token
    #[error("no sink token configured and {TOKEN_ENV} is unset")]
    MissingToken,
    /// The ingest URL does not parse
    #[error("invalid sink url {0}")]
    Url(String),
    /// Wrapper for [`reqwest::Error`]
    #[error("Failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
    /// Wrapper for [`signal::RegisterError`]
    #[error(transparent)]
    Registration(#[from] signal::RegisterError),
}

fn default_batch_size() -> NonZeroUsize {
    NonZeroUsize::new(100).expect("100 is non-zero")
}

fn default_flush_millis() -> u64 {
    1_000
}

fn default_timeout_millis() -> u64 {
    5_000
}

fn default_queue_capacity() -> NonZeroUsize {
    NonZeroUsize::new(10_000).expect("10_000 is non-zero")
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
/// Configuration for [`Http`]
pub struct Config {
    /// Ingest endpoint
    pub url: String,
    /// Bearer token, falls back to `SIMSTOR_SINK_TOKEN`
    #[serde(default)]
    pub token: Option<String>,
    /// Maximum records per POST
    #[serde(default = "default_batch_size")]
    pub batch_size: NonZeroUsize,
    /// Longest a queued record waits before a partial batch ships
    #[serde(default = "default_flush_millis")]
    pub flush_millis: u64,
    /// Longest one POST may take, connection and response included
    #[serde(default = "default_timeout_millis")]
    pub timeout_millis: u64,
    /// Records buffered between the generator and the delivery task
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: NonZeroUsize,
}

impl Config {
    /// The configured token, or the value of `SIMSTOR_SINK_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingToken`] if neither is set.
    pub fn token(&self) -> Result<String, Error> {
        match &self.token {
            Some(token) => Ok(token.clone()),
            None => env::var(TOKEN_ENV).map_err(|_| Error::MissingToken),
        }
    }

    /// Check the URL parses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if it does not.
    pub fn validate(&self) -> Result<(), Error> {
        reqwest::Url::parse(&self.url)
            .map(|_| ())
            .map_err(|_| Error::Url(self.url.clone()))
    }
}

#[derive(Debug)]
/// Queues events for batched delivery to a remote ingest.
pub struct Http {
    records: mpsc::Sender<Value>,
}

impl Http {
    /// Create the sink and spawn its delivery task. The task holds a
    /// registered watcher derived from `shutdown` so that shutdown waits for
    /// the final batch. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or token are unusable, the client cannot be
    /// built or the shutdown signal has already fired.
    pub fn new(config: &Config, shutdown: &Watcher) -> Result<Self, Error> {
        config.validate()?;
        let delivery = Delivery {
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(config.timeout_millis.max(1)))
                .build()?,
            url: config.url.clone(),
            token: config.token()?,
            batch_size: config.batch_size.get(),
            flush: Duration::from_millis(config.flush_millis.max(1)),
            _shutdown: shutdown.register()?,
        };
        let (records, receiver) = mpsc::channel(config.queue_capacity.get());
        tokio::spawn(delivery.run(receiver));
        Ok(Self { records })
    }
}

impl Sink for Http {
    fn emit(&mut self, event: &GeneratedEvent) {
        let dt = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        // A closed channel means the delivery task is gone. Either way the
        // record is dropped.
        if let Err(TrySendError::Full(_) | TrySendError::Closed(_)) =
            self.records.try_send(record(event, dt))
        {
            counter!(telemetry::SINK_DROPPED).increment(1);
        }
    }
}

#[derive(Debug)]
struct Delivery {
    client: reqwest::Client,
    url: String,
    token: String,
    batch_size: usize,
    flush: Duration,
    _shutdown: Watcher,
}

impl Delivery {
    async fn run(self, mut records: mpsc::Receiver<Value>) {
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut flush = ttime::interval_at(ttime::Instant::now() + self.flush, self.flush);
        flush.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                record = records.recv() => match record {
                    Some(record) => {
                        batch.push(record);
                        if batch.len() >= self.batch_size {
                            self.post(&mut batch).await;
                        }
                    }
                    None => {
                        self.post(&mut batch).await;
                        info!("log sink closed, delivery task exiting");
                        return;
                    }
                },
                _ = flush.tick() => self.post(&mut batch).await,
            }
        }
    }

    async fn post(&self, batch: &mut Vec<Value>) {
        if batch.is_empty() {
            return;
        }
        let body = Value::Array(std::mem::take(batch));
        let count = body.as_array().map_or(0, Vec::len);
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);
        match response {
            Ok(_) => {
                debug!("delivered {count} records");
                counter!(telemetry::SINK_DELIVERED).increment(count as u64);
            }
            Err(err) => {
                warn!("failed to deliver {count} records: {err}");
                counter!(telemetry::SINK_DELIVERY_FAILURE).increment(1);
            }
        }
    }
}
