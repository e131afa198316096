//! Vehicle store contract consumed by the movement engine.
//!
//! The store owns vehicle records; the engine only reads them by id and
//! issues upsert-style writes. Implementations must accept concurrent
//! writes for different vehicles and resolve same-row writes as
//! last-write-wins.

pub mod memory;

use std::future::Future;

use fleet_core::{NewVehicle, Position, StoreError, UserId, Vehicle, VehicleId, VehicleStatus};

pub use memory::MemoryStore;

pub trait VehicleStore: Send + Sync + 'static {
    fn get_vehicle(&self, id: VehicleId)
        -> impl Future<Output = Result<Vehicle, StoreError>> + Send;

    /// Set the initial position, full battery and `active` status.
    fn set_activated(
        &self,
        id: VehicleId,
        position: Position,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn set_position(
        &self,
        id: VehicleId,
        position: Position,
        battery: i32,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn set_status(
        &self,
        id: VehicleId,
        status: VehicleStatus,
        battery: i32,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Final position plus `active` status in a single write.
    fn set_arrived(
        &self,
        id: VehicleId,
        position: Position,
        battery: i32,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Every vehicle whose status is not `offline`.
    fn list_active(&self) -> impl Future<Output = Result<Vec<Vehicle>, StoreError>> + Send;

    fn list_by_owner(
        &self,
        owner_id: UserId,
    ) -> impl Future<Output = Result<Vec<Vehicle>, StoreError>> + Send;

    /// Seed a new `offline` vehicle with a full battery.
    fn insert_vehicle(
        &self,
        vehicle: NewVehicle,
    ) -> impl Future<Output = Result<Vehicle, StoreError>> + Send;
}
