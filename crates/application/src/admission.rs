//! Admission control for in-flight request executions
//!
//! A counting semaphore bounds how many requests run at once. A caller that
//! finds every slot taken waits up to the configured window
//! ([`AdmissionSettings::wait_window`]) and is then rejected.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use courier_domain::AdmissionSettings;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// Admission failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdmissionError {
    /// No slot freed up within the wait window.
    #[error("request queue is full: {in_flight} requests in flight, waited {waited_ms} ms")]
    Rejected {
        /// Requests in flight when the caller gave up.
        in_flight: usize,
        /// How long the caller waited.
        waited_ms: u64,
    },
}

#[derive(Debug, Default)]
struct Counters {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Bounds the number of concurrently executing requests.
///
/// Cloning is cheap; clones share the same slots.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    semaphore: Arc<Semaphore>,
    counters: Arc<Counters>,
    settings: AdmissionSettings,
}

impl AdmissionController {
    /// Creates a controller with `settings.max_in_flight` slots, capped at
    /// [`Semaphore::MAX_PERMITS`].
    #[must_use]
    pub fn new(mut settings: AdmissionSettings) -> Self {
        if settings.max_in_flight > Semaphore::MAX_PERMITS {
            warn!(
                requested = settings.max_in_flight,
                limit = Semaphore::MAX_PERMITS,
                "max_in_flight capped"
            );
            settings.max_in_flight = Semaphore::MAX_PERMITS;
        }
        Self {
            semaphore: Arc::new(Semaphore::new(settings.max_in_flight)),
            counters: Arc::new(Counters::default()),
            settings,
        }
    }

    /// Waits for a slot, up to the configured wait window.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::Rejected`] if no slot frees up in time.
    pub async fn acquire(&self) -> Result<AdmissionPermit, AdmissionError> {
        let window = self.settings.wait_window();
        match tokio::time::timeout(window, Arc::clone(&self.semaphore).acquire_owned()).await {
            Ok(Ok(permit)) => Ok(self.admit(permit)),
            Ok(Err(_)) | Err(_) => {
                let in_flight = self.in_flight();
                warn!(in_flight, wait_ms = window.as_millis(), "admission rejected");
                Err(AdmissionError::Rejected {
                    in_flight,
                    waited_ms: u64::try_from(window.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }

    /// Takes a slot only if one is free right now.
    #[must_use]
    pub fn try_acquire(&self) -> Option<AdmissionPermit> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .ok()
            .map(|permit| self.admit(permit))
    }

    fn admit(&self, permit: OwnedSemaphorePermit) -> AdmissionPermit {
        let in_flight = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(in_flight, Ordering::SeqCst);
        debug!(in_flight, "admission slot acquired");
        AdmissionPermit {
            _permit: permit,
            counters: Arc::clone(&self.counters),
        }
    }

    /// Requests currently holding a slot.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of requests ever observed in flight at once.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    /// Total number of slots.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.settings.max_in_flight
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new(AdmissionSettings::default())
    }
}

/// A held admission slot; released on drop.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
    counters: Arc<Counters>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        let in_flight = self.counters.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        debug!(in_flight, "admission slot released");
    }
}
