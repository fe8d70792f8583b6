//! Admission queue
//!
//! Bounds how many sandboxes run at once. Admission is strict FIFO: a
//! fair semaphore hands out slots in arrival order, and waiters past the
//! configured bound are rejected without ever touching a sandbox.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument};

/// Error returned when a request waited too long for admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timed out waiting for an execution slot")]
pub struct QueueTimeout;

/// One admitted execution slot.
///
/// Carries the box id assigned to this execution. The id is exclusively
/// held for the lifetime of the slot; dropping the slot returns the id
/// to the free pool and releases the slot, exactly once (RAII; the
/// semaphore permit is the slot).
#[derive(Debug)]
pub struct ExecutionSlot {
    box_id: u32,
    free_ids: Arc<Mutex<VecDeque<u32>>>,
    _permit: OwnedSemaphorePermit,
}

impl ExecutionSlot {
    /// Isolate box id to use for this execution
    pub fn box_id(&self) -> u32 {
        self.box_id
    }
}

impl Drop for ExecutionSlot {
    fn drop(&mut self) {
        // The id goes back before the permit field drops, so a waiter
        // admitted by the freed permit always finds an id to pop
        self.free_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(self.box_id);
    }
}

/// FIFO admission queue over a fixed pool of execution slots.
#[derive(Debug)]
pub struct AdmissionQueue {
    /// Number of concurrent slots
    capacity: u32,

    /// Slot accounting; only this queue touches it
    semaphore: Arc<Semaphore>,

    /// Box ids not held by any live slot
    free_ids: Arc<Mutex<VecDeque<u32>>>,

    /// Bound on admission wait
    max_wait: Duration,
}

impl AdmissionQueue {
    pub fn new(start_id: u32, capacity: u32, max_wait: Duration) -> Self {
        Self {
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity as usize)),
            free_ids: Arc::new(Mutex::new((start_id..start_id + capacity).collect())),
            max_wait,
        }
    }

    /// Wait for an execution slot.
    ///
    /// Suspends the caller until a slot frees, in arrival order. Fails
    /// with [`QueueTimeout`] if `max_wait` elapses first.
    #[instrument(skip(self))]
    pub async fn admit(&self) -> Result<ExecutionSlot, QueueTimeout> {
        let acquire = self.semaphore.clone().acquire_owned();
        let permit = match tokio::time::timeout(self.max_wait, acquire).await {
            Ok(Ok(permit)) => permit,
            // The semaphore is never closed while the queue is alive
            Ok(Err(_)) | Err(_) => return Err(QueueTimeout),
        };

        let box_id = self
            .free_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .expect("every held permit pairs with exactly one free box id");

        debug!(box_id, "admitted execution");

        Ok(ExecutionSlot {
            box_id,
            free_ids: Arc::clone(&self.free_ids),
            _permit: permit,
        })
    }

    /// Number of slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Total number of slots
    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}
