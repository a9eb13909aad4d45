//! Shutdown signalling.
//!
//! A single [`Broadcaster`] fires once. Any number of [`Watcher`] instances
//! observe that firing. Watchers come in two flavors: a clone only observes,
//! while a watcher obtained from [`Watcher::register`] also holds the
//! broadcaster open in [`Broadcaster::signal_and_wait`] until it is dropped.
//! Tasks that must finish work after the signal, flushing a sink for
//! instance, hold a registered watcher.

use tokio::sync::{mpsc, watch};
use tracing::info;

/// Construct a `Watcher` and `Broadcaster` pair. The returned watcher is
/// registered.
#[must_use]
pub fn signal() -> (Watcher, Broadcaster) {
    let (fire, observe) = watch::channel(());
    let (registration, registrations) = mpsc::channel(1);

    let w = Watcher {
        observe,
        registry: registration.downgrade(),
        registration: Some(registration),
    };
    let b = Broadcaster {
        fire,
        registrations,
    };
    (w, b)
}

/// Errors for [`Watcher::register`].
#[derive(thiserror::Error, Debug, Clone, Copy)]
pub enum RegisterError {
    /// The signal has fired or every registered watcher is gone.
    #[error("signal has fired, registration closed")]
    Closed,
}

/// The firing half of a shutdown signal.
#[derive(Debug)]
pub struct Broadcaster {
    fire: watch::Sender<()>,
    // Never receives a value. `recv` yields `None` once every registered
    // watcher has dropped its sender.
    registrations: mpsc::Receiver<()>,
}

impl Broadcaster {
    /// Fire the signal without waiting on anyone.
    pub fn signal(self) {
        drop(self.fire);
    }

    /// Fire the signal and wait until every registered watcher has dropped.
    pub async fn signal_and_wait(self) {
        let Broadcaster {
            fire,
            mut registrations,
        } = self;
        drop(fire);

        let peers = registrations.sender_strong_count();
        if peers > 0 {
            info!("Waiting for {peers} peers");
        }
        while registrations.recv().await.is_some() {}
    }
}

/// The observing half of a shutdown signal.
#[derive(Debug)]
pub struct Watcher {
    observe: watch::Receiver<()>,
    registry: mpsc::WeakSender<()>,
    registration: Option<mpsc::Sender<()>>,
}

impl Watcher {
    /// Wait for the signal, returning immediately if it has already fired.
    /// A registered watcher releases its registration on return. Tasks with
    /// work to finish after the signal wait on a clone instead.
    pub async fn recv(mut self) {
        // The broadcaster never sends, so `changed` only resolves when the
        // sender is dropped.
        while self.observe.changed().await.is_ok() {}
    }

    /// Whether the signal has fired, without blocking.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.observe.has_changed().is_err()
    }

    /// Derive a new registered watcher. The broadcaster will wait in
    /// `signal_and_wait` for it to drop.
    ///
    /// # Errors
    ///
    /// Returns [`RegisterError::Closed`] if the signal has already fired or
    /// no registered watcher remains to derive from.
    pub fn register(&self) -> Result<Self, RegisterError> {
        if self.has_fired() {
            return Err(RegisterError::Closed);
        }
        let registration = self.registry.upgrade().ok_or(RegisterError::Closed)?;
        Ok(Self {
            observe: self.observe.clone(),
            registry: self.registry.clone(),
            registration: Some(registration),
        })
    }
}

impl Clone for Watcher {
    /// Clones observe only, they are never registered.
    fn clone(&self) -> Self {
        Self {
            observe: self.observe.clone(),
            registry: self.registry.clone(),
            registration: None,
        }
    }
}
