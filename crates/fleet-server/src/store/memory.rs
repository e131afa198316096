//! In-memory vehicle store using DashMap.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use fleet_core::{NewVehicle, Position, StoreError, UserId, Vehicle, VehicleId, VehicleStatus};

use super::VehicleStore;

/// Thread-safe store for vehicles, used for tests and `FLEET_STORE=memory`.
pub struct MemoryStore {
    vehicles: DashMap<VehicleId, Vehicle>,
    vehicle_counter: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            vehicles: DashMap::new(),
            vehicle_counter: AtomicI64::new(1),
        }
    }

    /// Snapshot of a vehicle without going through the async contract.
    pub fn snapshot(&self, id: VehicleId) -> Option<Vehicle> {
        self.vehicles.get(&id).map(|r| r.value().clone())
    }

    fn update<F>(&self, id: VehicleId, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Vehicle),
    {
        let mut entry = self.vehicles.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let vehicle = entry.value_mut();
        apply(vehicle);
        vehicle.updated_at = Utc::now();
        Ok(())
    }

    fn collect<P>(&self, predicate: P) -> Vec<Vehicle>
    where
        P: Fn(&Vehicle) -> bool,
    {
        let mut vehicles: Vec<Vehicle> = self
            .vehicles
            .iter()
            .filter(|r| predicate(r.value()))
            .map(|r| r.value().clone())
            .collect();
        vehicles.sort_by_key(|v| v.id);
        vehicles
    }
}

impl VehicleStore for MemoryStore {
    async fn get_vehicle(&self, id: VehicleId) -> Result<Vehicle, StoreError> {
        self.snapshot(id).ok_or(StoreError::NotFound(id))
    }

    async fn set_activated(&self, id: VehicleId, position: Position) -> Result<(), StoreError> {
        self.update(id, |v| {
            v.position = Some(position);
            v.battery_level = 100;
            v.status = VehicleStatus::Active;
        })
    }

    async fn set_position(
        &self,
        id: VehicleId,
        position: Position,
        battery: i32,
    ) -> Result<(), StoreError> {
        self.update(id, |v| {
            v.position = Some(position);
            v.battery_level = battery;
        })
    }

    async fn set_status(
        &self,
        id: VehicleId,
        status: VehicleStatus,
        battery: i32,
    ) -> Result<(), StoreError> {
        self.update(id, |v| {
            v.status = status;
            v.battery_level = battery;
        })
    }

    async fn set_arrived(
        &self,
        id: VehicleId,
        position: Position,
        battery: i32,
    ) -> Result<(), StoreError> {
        self.update(id, |v| {
            v.position = Some(position);
            v.status = VehicleStatus::Active;
            v.battery_level = battery;
        })
    }

    async fn list_active(&self) -> Result<Vec<Vehicle>, StoreError> {
        Ok(self.collect(|v| v.status != VehicleStatus::Offline))
    }

    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<Vehicle>, StoreError> {
        Ok(self.collect(|v| v.owner_id == owner_id))
    }

    async fn insert_vehicle(&self, vehicle: NewVehicle) -> Result<Vehicle, StoreError> {
        let id = self.vehicle_counter.fetch_add(1, Ordering::SeqCst);
        let record = Vehicle {
            id,
            name: vehicle.name,
            owner_id: vehicle.owner_id,
            position: None,
            status: VehicleStatus::Offline,
            battery_level: 100,
            max_speed: vehicle.max_speed,
            updated_at: Utc::now(),
        };
        self.vehicles.insert(id, record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_vehicle(owner_id: UserId) -> NewVehicle {
        NewVehicle {
            name: "scout".to_string(),
            owner_id,
            max_speed: 60.0,
        }
    }

    #[tokio::test]
    async fn insert_starts_offline_without_position() {
        let store = MemoryStore::new();
        let vehicle = store.insert_vehicle(new_vehicle(1)).await.unwrap();

        assert_eq!(vehicle.status, VehicleStatus::Offline);
        assert_eq!(vehicle.battery_level, 100);
        assert!(vehicle.position.is_none());
        assert_eq!(store.get_vehicle(vehicle.id).await.unwrap(), vehicle);
    }

    #[tokio::test]
    async fn writes_to_unknown_vehicle_fail_not_found() {
        let store = MemoryStore::new();
        let err = store
            .set_status(42, VehicleStatus::Stopped, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(42)));
        assert!(matches!(
            store.get_vehicle(42).await,
            Err(StoreError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn lists_filter_by_status_and_owner() {
        let store = MemoryStore::new();
        let a = store.insert_vehicle(new_vehicle(1)).await.unwrap();
        let b = store.insert_vehicle(new_vehicle(1)).await.unwrap();
        let c = store.insert_vehicle(new_vehicle(2)).await.unwrap();

        store
            .set_activated(b.id, Position::new(55.0, 37.0, 50.0))
            .await
            .unwrap();
        store
            .set_activated(c.id, Position::new(55.0, 37.0, 50.0))
            .await
            .unwrap();

        let active: Vec<VehicleId> = store.list_active().await.unwrap().iter().map(|v| v.id).collect();
        assert_eq!(active, vec![b.id, c.id]);

        let owned: Vec<VehicleId> = store.list_by_owner(1).await.unwrap().iter().map(|v| v.id).collect();
        assert_eq!(owned, vec![a.id, b.id]);
    }
}
