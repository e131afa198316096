//! Vehicle persistence operations.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteQueryResult;

use fleet_core::{NewVehicle, Position, StoreError, UserId, Vehicle, VehicleId, VehicleStatus};

use super::db::Database;
use crate::store::VehicleStore;

const SELECT_VEHICLE: &str = "SELECT id, name, owner_id, current_lat, current_lng, current_altitude, current_status, battery_level, max_speed, updated_at FROM vehicles";

/// SQLite-backed vehicle store.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn require_row(id: VehicleId, result: SqliteQueryResult) -> Result<(), StoreError> {
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(id));
    }
    Ok(())
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

impl VehicleStore for SqliteStore {
    async fn get_vehicle(&self, id: VehicleId) -> Result<Vehicle, StoreError> {
        let row = sqlx::query_as::<_, VehicleRow>(&format!("{SELECT_VEHICLE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await
            .map_err(backend)?;

        row.map(Vehicle::from).ok_or(StoreError::NotFound(id))
    }

    async fn set_activated(&self, id: VehicleId, position: Position) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE vehicles
            SET current_lat = ?1, current_lng = ?2, current_altitude = ?3,
                current_status = 'active', battery_level = 100, updated_at = ?4
            WHERE id = ?5
            "#,
        )
        .bind(position.lat)
        .bind(position.lng)
        .bind(position.altitude_m)
        .bind(now())
        .bind(id)
        .execute(self.db.pool())
        .await
        .map_err(backend)?;

        require_row(id, result)
    }

    async fn set_position(
        &self,
        id: VehicleId,
        position: Position,
        battery: i32,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE vehicles
            SET current_lat = ?1, current_lng = ?2, current_altitude = ?3,
                battery_level = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(position.lat)
        .bind(position.lng)
        .bind(position.altitude_m)
        .bind(battery)
        .bind(now())
        .bind(id)
        .execute(self.db.pool())
        .await
        .map_err(backend)?;

        require_row(id, result)
    }

    async fn set_status(
        &self,
        id: VehicleId,
        status: VehicleStatus,
        battery: i32,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE vehicles SET current_status = ?1, battery_level = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(status.as_str())
        .bind(battery)
        .bind(now())
        .bind(id)
        .execute(self.db.pool())
        .await
        .map_err(backend)?;

        require_row(id, result)
    }

    async fn set_arrived(
        &self,
        id: VehicleId,
        position: Position,
        battery: i32,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE vehicles
            SET current_lat = ?1, current_lng = ?2, current_altitude = ?3,
                current_status = 'active', battery_level = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(position.lat)
        .bind(position.lng)
        .bind(position.altitude_m)
        .bind(battery)
        .bind(now())
        .bind(id)
        .execute(self.db.pool())
        .await
        .map_err(backend)?;

        require_row(id, result)
    }

    async fn list_active(&self) -> Result<Vec<Vehicle>, StoreError> {
        let rows = sqlx::query_as::<_, VehicleRow>(&format!(
            "{SELECT_VEHICLE} WHERE current_status != 'offline' ORDER BY id"
        ))
        .fetch_all(self.db.pool())
        .await
        .map_err(backend)?;

        Ok(rows.into_iter().map(Vehicle::from).collect())
    }

    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<Vehicle>, StoreError> {
        let rows = sqlx::query_as::<_, VehicleRow>(&format!(
            "{SELECT_VEHICLE} WHERE owner_id = ?1 ORDER BY id"
        ))
        .bind(owner_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(backend)?;

        Ok(rows.into_iter().map(Vehicle::from).collect())
    }

    async fn insert_vehicle(&self, vehicle: NewVehicle) -> Result<Vehicle, StoreError> {
        let timestamp = now();
        let result = sqlx::query(
            r#"
            INSERT INTO vehicles (name, owner_id, max_speed, current_status, battery_level, created_at, updated_at)
            VALUES (?1, ?2, ?3, 'offline', 100, ?4, ?4)
            "#,
        )
        .bind(&vehicle.name)
        .bind(vehicle.owner_id)
        .bind(vehicle.max_speed)
        .bind(&timestamp)
        .execute(self.db.pool())
        .await
        .map_err(backend)?;

        self.get_vehicle(result.last_insert_rowid()).await
    }
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct VehicleRow {
    id: i64,
    name: String,
    owner_id: i64,
    current_lat: Option<f64>,
    current_lng: Option<f64>,
    current_altitude: Option<f64>,
    current_status: String,
    battery_level: i32,
    max_speed: f64,
    updated_at: String,
}

impl From<VehicleRow> for Vehicle {
    fn from(row: VehicleRow) -> Self {
        let status = row.current_status.parse::<VehicleStatus>().unwrap_or_else(|err| {
            tracing::warn!("Vehicle {}: {}; treating as offline", row.id, err);
            VehicleStatus::Offline
        });

        let position = match (row.current_lat, row.current_lng, row.current_altitude) {
            (Some(lat), Some(lng), Some(altitude_m)) => Some(Position::new(lat, lng, altitude_m)),
            _ => None,
        };

        let updated_at = DateTime::parse_from_rfc3339(&row.updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Vehicle {
            id: row.id,
            name: row.name,
            owner_id: row.owner_id,
            position,
            status,
            battery_level: row.battery_level,
            max_speed: row.max_speed,
            updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;

    async fn store() -> SqliteStore {
        SqliteStore::new(init_database(":memory:", 1).await.unwrap())
    }

    fn scout(owner_id: UserId) -> NewVehicle {
        NewVehicle {
            name: "scout".to_string(),
            owner_id,
            max_speed: 72.0,
        }
    }

    #[tokio::test]
    async fn insert_and_activate_round_trip() {
        let store = store().await;
        let vehicle = store.insert_vehicle(scout(5)).await.unwrap();
        assert_eq!(vehicle.status, VehicleStatus::Offline);
        assert!(vehicle.position.is_none());

        let position = Position::new(55.7558, 37.6173, 100.0);
        store.set_activated(vehicle.id, position).await.unwrap();

        let loaded = store.get_vehicle(vehicle.id).await.unwrap();
        assert_eq!(loaded.position, Some(position));
        assert_eq!(loaded.status, VehicleStatus::Active);
        assert_eq!(loaded.battery_level, 100);
        assert_eq!(loaded.owner_id, 5);
    }

    #[tokio::test]
    async fn flight_writes_update_expected_columns() {
        let store = store().await;
        let vehicle = store.insert_vehicle(scout(1)).await.unwrap();
        store
            .set_activated(vehicle.id, Position::new(55.0, 37.0, 50.0))
            .await
            .unwrap();

        store
            .set_status(vehicle.id, VehicleStatus::Flying, 90)
            .await
            .unwrap();
        let moved = Position::new(55.001, 37.001, 55.0);
        store.set_position(vehicle.id, moved, 89).await.unwrap();

        let loaded = store.get_vehicle(vehicle.id).await.unwrap();
        assert_eq!(loaded.status, VehicleStatus::Flying);
        assert_eq!(loaded.position, Some(moved));
        assert_eq!(loaded.battery_level, 89);

        let target = Position::new(55.002, 37.002, 60.0);
        store.set_arrived(vehicle.id, target, 88).await.unwrap();
        let loaded = store.get_vehicle(vehicle.id).await.unwrap();
        assert_eq!(loaded.status, VehicleStatus::Active);
        assert_eq!(loaded.position, Some(target));
        assert_eq!(loaded.battery_level, 88);
    }

    #[tokio::test]
    async fn missing_vehicle_is_not_found() {
        let store = store().await;
        assert!(matches!(
            store.get_vehicle(99).await,
            Err(StoreError::NotFound(99))
        ));
        assert!(matches!(
            store.set_status(99, VehicleStatus::Stopped, 1).await,
            Err(StoreError::NotFound(99))
        ));
    }

    #[tokio::test]
    async fn legacy_status_text_is_read() {
        let store = store().await;
        let vehicle = store.insert_vehicle(scout(1)).await.unwrap();
        sqlx::query("UPDATE vehicles SET current_status = 'nullbattery', battery_level = 0 WHERE id = ?1")
            .bind(vehicle.id)
            .execute(store.db.pool())
            .await
            .unwrap();

        let loaded = store.get_vehicle(vehicle.id).await.unwrap();
        assert_eq!(loaded.status, VehicleStatus::BatteryDepleted);
    }

    #[tokio::test]
    async fn lists_exclude_offline_and_filter_owner() {
        let store = store().await;
        let a = store.insert_vehicle(scout(1)).await.unwrap();
        let b = store.insert_vehicle(scout(2)).await.unwrap();
        store
            .set_activated(b.id, Position::new(10.0, 10.0, 10.0))
            .await
            .unwrap();

        let active = store.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, b.id);

        let owned = store.list_by_owner(1).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id, a.id);
    }
}
