//! Request gate for rate limiting the listing source
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - A fixed delay before every request
//! - Counting requests and the peak number in flight

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Default)]
struct GateCounters {
    issued: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Bounds in-flight requests and spaces them out
///
/// Permits are held only for the duration of a single HTTP request, never
/// while a task waits on its children, so nested traversal cannot starve
/// itself of permits.
#[derive(Debug)]
pub struct RequestGate {
    semaphore: Arc<Semaphore>,
    delay: Duration,
    counters: Arc<GateCounters>,
}

/// Permission to issue one request; released on drop
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    counters: Arc<GateCounters>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RequestGate {
    /// Creates a gate admitting `max_in_flight` requests at once
    ///
    /// # Arguments
    ///
    /// * `max_in_flight` - Concurrent request limit (at least 1)
    /// * `delay` - Pause after acquiring a permit, before the request goes out
    pub fn new(max_in_flight: usize, delay: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_in_flight.max(1))),
            delay,
            counters: Arc::new(GateCounters::default()),
        }
    }

    /// Waits for a permit, then for the request delay
    ///
    /// Returns `None` only if the gate has been closed.
    pub async fn acquire(&self) -> Option<GatePermit> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;

        let in_flight = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(in_flight, Ordering::SeqCst);
        self.counters.issued.fetch_add(1, Ordering::SeqCst);

        let permit = GatePermit {
            _permit: permit,
            counters: Arc::clone(&self.counters),
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        Some(permit)
    }

    /// Refuses all future permits
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Total permits handed out
    pub fn requests_issued(&self) -> usize {
        self.counters.issued.load(Ordering::SeqCst)
    }

    /// Highest number of permits held at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}
