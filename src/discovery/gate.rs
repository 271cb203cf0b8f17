//! Admission gate bounding the number of module reads in flight
//!
//! A counting semaphore over a pool of permits held in a bounded crossbeam
//! channel. Callers beyond the bound wait for a permit, they are not rejected.

use super::cancel::CancellationToken;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// How often a waiting caller re-checks its cancellation token
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug)]
pub struct AdmissionGate {
    capacity: usize,
    release: Sender<()>,
    permits: Receiver<()>,
}

/// Held while a read is in flight; returns its permit on drop
#[derive(Debug)]
pub struct Permit<'a> {
    gate: &'a AdmissionGate,
}

impl AdmissionGate {
    /// Create a gate admitting at most `capacity` holders (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (release, permits) = channel::bounded(capacity);
        for _ in 0..capacity {
            // Cannot fail: the channel has room for every permit and we own
            // the receiver
            let _ = release.try_send(());
        }

        Self {
            capacity,
            release,
            permits,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of permits currently handed out
    pub fn in_flight(&self) -> usize {
        self.capacity - self.permits.len()
    }

    /// Take a permit without waiting
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        self.permits.try_recv().ok().map(|()| Permit { gate: self })
    }

    /// Wait for a permit
    ///
    /// Returns `None` once `cancel` is observed.
    pub fn acquire(&self, cancel: &CancellationToken) -> Option<Permit<'_>> {
        loop {
            if cancel.is_cancelled() {
                return None;
            }
            match self.permits.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(()) => return Some(Permit { gate: self }),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let _ = self.gate.release.try_send(());
    }
}
