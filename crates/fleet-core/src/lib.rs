//! Fleet Core - domain model and flight stepping for simulated aerial vehicles.

pub mod error;
pub mod flight;
pub mod models;
pub mod rules;
pub mod spatial;

pub use error::{CommandError, StoreError};
pub use flight::{FlightSim, TickOutcome};
pub use models::{
    ActivateRequest, ApiResponse, Caller, InfoRequest, MoveRequest, NewVehicle,
    OwnedVehiclesRequest, Position, StopRequest, UserId, Vehicle, VehicleId, VehicleStatus,
    POLICE_ROLE,
};
pub use rules::{DrainMode, SimulationRules};
pub use spatial::haversine_distance;
