//! Movement registry: which vehicle currently has a live flight task.
//!
//! Every entry binds a vehicle id to the handle of its one live task.
//! Mutations for a given id run under that id's DashMap shard lock, so a
//! replace cancels the old handle and installs the new one as a single step.
//!
//! A stopped task still owes its `stopped` write, so `cancel` parks its
//! handle in a draining slot until the task exits. The next `register` for
//! that vehicle hands the parked handle to the new task as its predecessor.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

use fleet_core::VehicleId;

/// Cancellation and completion signals for one flight task.
#[derive(Debug, Clone)]
pub struct MovementHandle {
    generation: u64,
    cancel: CancellationToken,
    done: CancellationToken,
}

impl MovementHandle {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            cancel: CancellationToken::new(),
            done: CancellationToken::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Called by the task on exit, after its last write.
    pub fn mark_finished(&self) {
        self.done.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Resolves once the task has made its final write and exited.
    pub async fn finished(&self) {
        self.done.cancelled().await
    }
}

#[derive(Debug, Default)]
pub struct MovementRegistry {
    entries: DashMap<VehicleId, MovementHandle>,
    /// Cancelled tasks that have not yet made their final write
    draining: DashMap<VehicleId, MovementHandle>,
    next_generation: AtomicU64,
}

impl MovementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a handle with a generation no other handle shares.
    pub fn new_handle(&self) -> MovementHandle {
        MovementHandle::new(self.next_generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Install `handle` for `vehicle_id`, cancelling whatever was there.
    ///
    /// Returns the displaced handle (already cancelled), or the parked handle
    /// of a stopped task still draining, so the new task can wait for its
    /// predecessor's final write before issuing its own.
    pub fn register(&self, vehicle_id: VehicleId, handle: MovementHandle) -> Option<MovementHandle> {
        // Lock order: `entries` shard, then `draining`.
        match self.entries.entry(vehicle_id) {
            Entry::Occupied(mut entry) => {
                let previous = entry.insert(handle);
                previous.cancel();
                tracing::debug!(
                    "Vehicle {} flight {} superseded by {}",
                    vehicle_id,
                    previous.generation,
                    entry.get().generation
                );
                Some(previous)
            }
            Entry::Vacant(entry) => {
                let parked = self
                    .draining
                    .remove(&vehicle_id)
                    .map(|(_, parked)| parked)
                    .filter(|parked| !parked.is_finished());
                if let Some(parked) = &parked {
                    tracing::debug!(
                        "Vehicle {} flight waits for stopped flight {}",
                        vehicle_id,
                        parked.generation
                    );
                }
                entry.insert(handle);
                parked
            }
        }
    }

    /// Cancel and remove the live task for `vehicle_id`. No-op when absent.
    ///
    /// The handle stays parked until the task clears itself.
    pub fn cancel(&self, vehicle_id: VehicleId) -> Option<MovementHandle> {
        match self.entries.entry(vehicle_id) {
            Entry::Occupied(entry) => {
                self.draining.insert(vehicle_id, entry.get().clone());
                let handle = entry.remove();
                handle.cancel();
                Some(handle)
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Remove the task's entry (live or parked) without cancelling, but only
    /// if it still belongs to `generation`. Returns whether an entry was
    /// removed.
    pub fn clear(&self, vehicle_id: VehicleId, generation: u64) -> bool {
        let live = self
            .entries
            .remove_if(&vehicle_id, |_, handle| handle.generation == generation)
            .is_some();
        let parked = self
            .draining
            .remove_if(&vehicle_id, |_, handle| handle.generation == generation)
            .is_some();
        live || parked
    }

    /// Cancel every live task, returning their handles.
    pub fn cancel_all(&self) -> Vec<MovementHandle> {
        let ids: Vec<VehicleId> = self.entries.iter().map(|e| *e.key()).collect();
        ids.into_iter().filter_map(|id| self.cancel(id)).collect()
    }

    pub fn handle(&self, vehicle_id: VehicleId) -> Option<MovementHandle> {
        self.entries.get(&vehicle_id).map(|r| r.value().clone())
    }

    pub fn is_moving(&self, vehicle_id: VehicleId) -> bool {
        self.entries.contains_key(&vehicle_id)
    }

    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether a stopped task for `vehicle_id` has yet to make its final write.
    pub fn is_draining(&self, vehicle_id: VehicleId) -> bool {
        self.draining.contains_key(&vehicle_id)
    }
}
