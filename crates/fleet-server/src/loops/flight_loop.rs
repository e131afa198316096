//! Flight simulation loop.
//!
//! One task per moving vehicle. Each tick the task steps its flight and
//! persists the outcome, until the vehicle arrives, runs out of battery or
//! is cancelled through the movement registry.

use serde::Serialize;
use std::sync::Arc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use fleet_core::{
    FlightSim, Position, SimulationRules, StoreError, TickOutcome, VehicleId, VehicleStatus,
};

use crate::state::{MovementHandle, MovementRegistry};
use crate::store::VehicleStore;

/// How a flight task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightEnd {
    Arrived,
    Stopped,
    BatteryDepleted,
    /// Gave up after too many consecutive failed writes
    Abandoned,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlightSummary {
    pub vehicle_id: VehicleId,
    pub end: FlightEnd,
    pub ticks: u64,
    pub travelled_m: f64,
    pub battery: i32,
    pub position: Position,
}

/// Where a flight starts and where it is headed.
#[derive(Debug, Clone, Copy)]
pub struct FlightPlan {
    pub origin: Position,
    pub target: Position,
    pub battery: i32,
    /// Cruise speed in km/h
    pub speed_kmh: f64,
}

/// Everything a flight task needs besides its plan.
pub struct FlightContext<S> {
    pub vehicle_id: VehicleId,
    pub store: Arc<S>,
    pub registry: Arc<MovementRegistry>,
    pub rules: Arc<SimulationRules>,
    pub handle: MovementHandle,
    /// Task this one replaced, if it was still live at registration
    pub predecessor: Option<MovementHandle>,
}

/// Deregisters the task and signals completion on every exit path.
struct Deregister {
    registry: Arc<MovementRegistry>,
    vehicle_id: VehicleId,
    handle: MovementHandle,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        self.registry.clear(self.vehicle_id, self.handle.generation());
        self.handle.mark_finished();
    }
}

struct WriteFailures {
    vehicle_id: VehicleId,
    consecutive: u32,
    limit: Option<u32>,
}

impl WriteFailures {
    /// Record a write result; true means the task should give up.
    fn record(&mut self, result: Result<(), StoreError>, what: &str) -> bool {
        match result {
            Ok(()) => {
                self.consecutive = 0;
                false
            }
            Err(err) => {
                self.consecutive += 1;
                tracing::warn!(
                    "Vehicle {} {} write failed ({} in a row): {}",
                    self.vehicle_id,
                    what,
                    self.consecutive,
                    err
                );
                self.limit.is_some_and(|limit| self.consecutive >= limit)
            }
        }
    }
}

fn summarize(vehicle_id: VehicleId, sim: &FlightSim, end: FlightEnd) -> FlightSummary {
    FlightSummary {
        vehicle_id,
        end,
        ticks: sim.ticks(),
        travelled_m: sim.travelled_m(),
        battery: sim.battery_level(),
        position: sim.position(),
    }
}

async fn land_stopped<S: VehicleStore>(
    store: &S,
    vehicle_id: VehicleId,
    sim: &FlightSim,
    failures: &mut WriteFailures,
) -> FlightSummary {
    let battery = sim.battery_level();
    let result = store
        .set_status(vehicle_id, VehicleStatus::Stopped, battery)
        .await;
    failures.record(result, "stop");
    tracing::info!(
        "Vehicle {} stopped after {} ticks with battery {}",
        vehicle_id,
        sim.ticks(),
        battery
    );
    summarize(vehicle_id, sim, FlightEnd::Stopped)
}

/// Run one vehicle's flight to completion.
pub async fn run_flight_loop<S: VehicleStore>(
    ctx: FlightContext<S>,
    plan: FlightPlan,
) -> FlightSummary {
    let FlightContext {
        vehicle_id,
        store,
        registry,
        rules,
        handle,
        predecessor,
    } = ctx;
    let _deregister = Deregister {
        registry,
        vehicle_id,
        handle: handle.clone(),
    };
    let mut sim = FlightSim::new(plan.origin, plan.target, plan.battery, plan.speed_kmh);

    let mut failures = WriteFailures {
        vehicle_id,
        consecutive: 0,
        limit: rules.max_consecutive_write_failures,
    };

    // The replaced task still owes its `stopped` write; let it land first.
    if let Some(previous) = predecessor {
        previous.finished().await;
    }
    if handle.is_cancelled() {
        return land_stopped(store.as_ref(), vehicle_id, &sim, &mut failures).await;
    }

    let result = store
        .set_status(vehicle_id, VehicleStatus::Flying, sim.battery_level())
        .await;
    if failures.record(result, "takeoff") {
        tracing::error!("Vehicle {} abandoned flight: store unavailable", vehicle_id);
        return summarize(vehicle_id, &sim, FlightEnd::Abandoned);
    }
    tracing::info!(
        "Vehicle {} flying to ({:.6}, {:.6}, {:.1}m) at {} km/h, {:.0}m to go",
        vehicle_id,
        plan.target.lat,
        plan.target.lng,
        plan.target.altitude_m,
        plan.speed_kmh,
        sim.total_distance_m()
    );

    let mut ticker = interval_at(Instant::now() + rules.tick, rules.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = handle.cancelled() => {}
            _ = ticker.tick() => {}
        }

        if handle.is_cancelled() {
            return land_stopped(store.as_ref(), vehicle_id, &sim, &mut failures).await;
        }

        match sim.step(&rules) {
            TickOutcome::Moved { position, battery } => {
                let result = store.set_position(vehicle_id, position, battery).await;
                if failures.record(result, "position") {
                    tracing::error!(
                        "Vehicle {} abandoned flight after {} failed writes",
                        vehicle_id,
                        failures.consecutive
                    );
                    return summarize(vehicle_id, &sim, FlightEnd::Abandoned);
                }
                tracing::debug!(
                    "Vehicle {} at ({:.6}, {:.6}, {:.1}m) battery {} remaining {:.1}m",
                    vehicle_id,
                    position.lat,
                    position.lng,
                    position.altitude_m,
                    battery,
                    sim.distance_to_target_m()
                );
            }
            TickOutcome::Arrived { position, battery } => {
                let result = store.set_arrived(vehicle_id, position, battery).await;
                failures.record(result, "arrival");
                tracing::info!(
                    "Vehicle {} arrived after {} ticks ({:.0}m), battery {}",
                    vehicle_id,
                    sim.ticks(),
                    sim.travelled_m(),
                    battery
                );
                return summarize(vehicle_id, &sim, FlightEnd::Arrived);
            }
            TickOutcome::Depleted { .. } => {
                let result = store
                    .set_status(vehicle_id, VehicleStatus::BatteryDepleted, 0)
                    .await;
                failures.record(result, "battery depletion");
                tracing::warn!(
                    "Vehicle {} battery depleted after {} ticks",
                    vehicle_id,
                    sim.ticks()
                );
                return summarize(vehicle_id, &sim, FlightEnd::BatteryDepleted);
            }
        }
    }
}
