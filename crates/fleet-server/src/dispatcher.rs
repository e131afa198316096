//! Command dispatcher.
//!
//! Validates ownership and activation against the store, then starts,
//! replaces or cancels flight tasks through the movement registry. Commands
//! return as soon as validation passes; flights run on their own tasks.

use std::sync::Arc;
use tokio::task::JoinHandle;

use fleet_core::{
    Caller, CommandError, Position, SimulationRules, Vehicle, VehicleId, POLICE_ROLE,
};

use crate::loops::{run_flight_loop, FlightContext, FlightPlan, FlightSummary};
use crate::state::{MovementHandle, MovementRegistry};
use crate::store::VehicleStore;

/// Handle to a launched flight. Dropping it leaves the flight running.
#[derive(Debug)]
pub struct FlightHandle {
    vehicle_id: VehicleId,
    movement: MovementHandle,
    join: JoinHandle<FlightSummary>,
}

impl FlightHandle {
    pub fn vehicle_id(&self) -> VehicleId {
        self.vehicle_id
    }

    pub fn generation(&self) -> u64 {
        self.movement.generation()
    }

    /// Resolves once the flight has made its final write.
    pub async fn finished(&self) {
        self.movement.finished().await
    }

    /// Wait for the flight task and return its summary.
    pub async fn join(self) -> Result<FlightSummary, tokio::task::JoinError> {
        self.join.await
    }
}

pub struct Dispatcher<S> {
    store: Arc<S>,
    registry: Arc<MovementRegistry>,
    rules: Arc<SimulationRules>,
    privileged_role: i32,
}

impl<S: VehicleStore> Dispatcher<S> {
    pub fn new(store: Arc<S>, rules: SimulationRules) -> Self {
        Self {
            store,
            registry: Arc::new(MovementRegistry::new()),
            rules: Arc::new(rules),
            privileged_role: POLICE_ROLE,
        }
    }

    /// Role allowed to stop vehicles it does not own.
    pub fn with_privileged_role(mut self, role: i32) -> Self {
        self.privileged_role = role;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<MovementRegistry> {
        &self.registry
    }

    pub fn rules(&self) -> &SimulationRules {
        &self.rules
    }

    async fn owned_vehicle(&self, caller: Caller, id: VehicleId) -> Result<Vehicle, CommandError> {
        let vehicle = self.store.get_vehicle(id).await?;
        if vehicle.owner_id != caller.user_id {
            tracing::warn!(
                "User {} denied access to vehicle {} (owner {})",
                caller.user_id,
                id,
                vehicle.owner_id
            );
            return Err(CommandError::AccessDenied);
        }
        Ok(vehicle)
    }

    /// Place a vehicle at `position` with a full battery.
    pub async fn activate(
        &self,
        caller: Caller,
        id: VehicleId,
        position: Position,
    ) -> Result<(), CommandError> {
        validate_position(&position)?;
        self.owned_vehicle(caller, id).await?;
        self.store.set_activated(id, position).await?;
        tracing::info!(
            "Vehicle {} activated at ({:.6}, {:.6}, {:.1}m)",
            id,
            position.lat,
            position.lng,
            position.altitude_m
        );
        Ok(())
    }

    /// Start flying a vehicle toward `target`, replacing any flight in progress.
    pub async fn move_vehicle(
        &self,
        caller: Caller,
        id: VehicleId,
        target: Position,
        battery: i32,
        speed_kmh: f64,
    ) -> Result<FlightHandle, CommandError> {
        validate_position(&target)?;
        if !(0..=100).contains(&battery) {
            return Err(CommandError::InvalidState(format!(
                "battery level {battery} outside 0-100"
            )));
        }
        if !speed_kmh.is_finite() || speed_kmh < 0.0 {
            return Err(CommandError::InvalidState(format!(
                "speed {speed_kmh} must be a non-negative number"
            )));
        }

        let vehicle = self.owned_vehicle(caller, id).await?;
        let origin = vehicle.position.ok_or(CommandError::NotActivated)?;

        let handle = self.registry.new_handle();
        let predecessor = self.registry.register(id, handle.clone());
        let ctx = FlightContext {
            vehicle_id: id,
            store: self.store.clone(),
            registry: self.registry.clone(),
            rules: self.rules.clone(),
            handle: handle.clone(),
            predecessor,
        };
        let plan = FlightPlan {
            origin,
            target,
            battery,
            speed_kmh,
        };
        let join = tokio::spawn(run_flight_loop(ctx, plan));

        tracing::info!(
            "User {} launched flight {} for vehicle {}",
            caller.user_id,
            handle.generation(),
            id
        );

        Ok(FlightHandle {
            vehicle_id: id,
            movement: handle,
            join,
        })
    }

    /// Cancel a vehicle's flight. Returns whether a flight was running.
    ///
    /// The flight task writes the `stopped` status itself.
    pub async fn stop(&self, caller: Caller, id: VehicleId) -> Result<bool, CommandError> {
        let vehicle = self.store.get_vehicle(id).await?;
        if vehicle.owner_id != caller.user_id && caller.role != self.privileged_role {
            tracing::warn!("User {} denied stop of vehicle {}", caller.user_id, id);
            return Err(CommandError::AccessDenied);
        }

        let stopped = self.registry.cancel(id).is_some();
        if stopped {
            tracing::info!("User {} stopped vehicle {}", caller.user_id, id);
        } else {
            tracing::debug!("Stop for vehicle {} with no flight in progress", id);
        }
        Ok(stopped)
    }

    pub async fn info(&self, caller: Caller, id: VehicleId) -> Result<Vehicle, CommandError> {
        self.owned_vehicle(caller, id).await
    }

    pub async fn list_active(&self) -> Result<Vec<Vehicle>, CommandError> {
        Ok(self.store.list_active().await?)
    }

    pub async fn list_owned(&self, caller: Caller) -> Result<Vec<Vehicle>, CommandError> {
        Ok(self.store.list_by_owner(caller.user_id).await?)
    }

    /// Cancel every live flight; each writes its own `stopped` status.
    pub fn shutdown(&self) -> Vec<MovementHandle> {
        let handles = self.registry.cancel_all();
        if !handles.is_empty() {
            tracing::info!("Stopping {} flight(s) for shutdown", handles.len());
        }
        handles
    }
}

fn validate_position(position: &Position) -> Result<(), CommandError> {
    if !position.lat.is_finite() || position.lat.abs() > 90.0 {
        return Err(CommandError::InvalidState(format!(
            "latitude {} out of range",
            position.lat
        )));
    }
    if !position.lng.is_finite() || position.lng.abs() > 180.0 {
        return Err(CommandError::InvalidState(format!(
            "longitude {} out of range",
            position.lng
        )));
    }
    if !position.altitude_m.is_finite() {
        return Err(CommandError::InvalidState("altitude must be finite".into()));
    }
    Ok(())
}
