//! Admission control for graph updates.
//!
//! A fixed number of permits is shared by every update endpoint. Acquisition
//! never waits: when no permit is free the request is shed immediately.

use std::sync::Arc;

use tokio::sync::{Semaphore, TryAcquireError};

/// A non-blocking, bounded pool of update permits.
///
/// `release` must be called exactly once per successful `try_acquire`; use
/// [`Permit`] rather than calling these directly.
pub trait AdmissionControl: Send + Sync {
    /// Take one permit if one is immediately available.
    fn try_acquire(&self) -> bool;

    /// Return a permit taken by `try_acquire`.
    fn release(&self);

    /// Total number of permits.
    fn capacity(&self) -> usize;

    /// Permits currently held.
    fn in_flight(&self) -> usize;
}

/// Admission backed by a tokio semaphore.
#[derive(Debug)]
pub struct SemaphoreAdmission {
    semaphore: Semaphore,
    capacity: usize,
}

impl SemaphoreAdmission {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Semaphore::new(capacity),
            capacity,
        }
    }
}

impl AdmissionControl for SemaphoreAdmission {
    fn try_acquire(&self) -> bool {
        match self.semaphore.try_acquire() {
            Ok(permit) => {
                // Returned by `release` through `add_permits`.
                permit.forget();
                true
            }
            Err(TryAcquireError::NoPermits) => false,
            Err(TryAcquireError::Closed) => {
                tracing::error!("Admission semaphore closed");
                false
            }
        }
    }

    fn release(&self) {
        self.semaphore.add_permits(1);
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn in_flight(&self) -> usize {
        self.capacity
            .saturating_sub(self.semaphore.available_permits())
    }
}

/// A held admission permit, released when dropped.
///
/// Drop runs on every exit path of the scope holding it: normal return,
/// early `?` return, panic unwinding, and cancellation of the owning future.
#[must_use = "the permit is released as soon as it is dropped"]
pub struct Permit {
    controller: Arc<dyn AdmissionControl>,
}

impl Permit {
    /// Try to take a permit from `controller` without waiting.
    pub fn try_acquire(controller: &Arc<dyn AdmissionControl>) -> Option<Self> {
        if controller.try_acquire() {
            Some(Self {
                controller: Arc::clone(controller),
            })
        } else {
            None
        }
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.controller.release();
    }
}

impl std::fmt::Debug for Permit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Permit")
            .field("in_flight", &self.controller.in_flight())
            .field("capacity", &self.controller.capacity())
            .finish()
    }
}
