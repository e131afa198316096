//! Vehicle command endpoints.
//!
//! The gateway authenticates callers and injects `user_id` (and for stop,
//! `user_role`) into each JSON body before forwarding here.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use fleet_core::{
    ActivateRequest, ApiResponse, Caller, InfoRequest, MoveRequest, OwnedVehiclesRequest,
    Position, StopRequest, Vehicle,
};

use crate::api::error::ApiError;
use crate::dispatcher::Dispatcher;
use crate::store::VehicleStore;

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Data returned when a flight is launched.
#[derive(Debug, Serialize)]
pub struct MoveAccepted {
    pub drone_id: i64,
    pub flight: u64,
}

/// Data returned by a stop request.
#[derive(Debug, Serialize)]
pub struct StopResult {
    pub drone_id: i64,
    pub was_moving: bool,
}

/// POST /api/drone/activate
pub async fn activate_drone<S: VehicleStore>(
    State(dispatcher): State<Arc<Dispatcher<S>>>,
    payload: Result<Json<ActivateRequest>, JsonRejection>,
) -> ApiResult<()> {
    let Json(req) = payload?;
    let caller = Caller::new(req.user_id, 0);
    let position = Position::new(req.lat, req.lng, req.altitude);

    dispatcher.activate(caller, req.drone_id, position).await?;
    Ok(Json(ApiResponse::ok("Drone activated", None)))
}

/// POST /api/drone/move
pub async fn move_drone<S: VehicleStore>(
    State(dispatcher): State<Arc<Dispatcher<S>>>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> ApiResult<MoveAccepted> {
    let Json(req) = payload?;
    let caller = Caller::new(req.user_id, 0);

    let flight = dispatcher
        .move_vehicle(caller, req.drone_id, req.target(), req.battery_level, req.speed)
        .await?;

    Ok(Json(ApiResponse::ok(
        "Drone started moving",
        Some(MoveAccepted {
            drone_id: flight.vehicle_id(),
            flight: flight.generation(),
        }),
    )))
}

/// POST /api/drone/stop
pub async fn stop_drone<S: VehicleStore>(
    State(dispatcher): State<Arc<Dispatcher<S>>>,
    payload: Result<Json<StopRequest>, JsonRejection>,
) -> ApiResult<StopResult> {
    let Json(req) = payload?;
    let caller = Caller::new(req.user_id, req.user_role);

    let was_moving = dispatcher.stop(caller, req.drone_id).await?;
    Ok(Json(ApiResponse::ok(
        "Drone stopped",
        Some(StopResult {
            drone_id: req.drone_id,
            was_moving,
        }),
    )))
}

/// POST /api/drone/info
pub async fn drone_info<S: VehicleStore>(
    State(dispatcher): State<Arc<Dispatcher<S>>>,
    payload: Result<Json<InfoRequest>, JsonRejection>,
) -> ApiResult<Vehicle> {
    let Json(req) = payload?;
    let vehicle = dispatcher
        .info(Caller::new(req.user_id, 0), req.drone_id)
        .await?;
    Ok(Json(ApiResponse::ok("Drone info retrieved", Some(vehicle))))
}

/// POST /api/drone/getlist
pub async fn owned_drones<S: VehicleStore>(
    State(dispatcher): State<Arc<Dispatcher<S>>>,
    payload: Result<Json<OwnedVehiclesRequest>, JsonRejection>,
) -> ApiResult<Vec<Vehicle>> {
    let Json(req) = payload?;
    let vehicles = dispatcher.list_owned(Caller::new(req.user_id, 0)).await?;
    Ok(Json(ApiResponse::ok("User drones retrieved", Some(vehicles))))
}

/// GET /api/drones
pub async fn active_drones<S: VehicleStore>(
    State(dispatcher): State<Arc<Dispatcher<S>>>,
) -> ApiResult<Vec<Vehicle>> {
    let vehicles = dispatcher.list_active().await?;
    Ok(Json(ApiResponse::ok("Active drones retrieved", Some(vehicles))))
}
