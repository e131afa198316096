//! REST API routes.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::vehicles;
use crate::dispatcher::Dispatcher;
use crate::store::VehicleStore;

/// Create the API router.
pub fn create_router<S: VehicleStore>() -> Router<Arc<Dispatcher<S>>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/drone/activate", post(vehicles::activate_drone::<S>))
        .route("/api/drone/move", post(vehicles::move_drone::<S>))
        .route("/api/drone/stop", post(vehicles::stop_drone::<S>))
        .route("/api/drone/info", post(vehicles::drone_info::<S>))
        .route("/api/drone/getlist", post(vehicles::owned_drones::<S>))
        .route("/api/drones", get(vehicles::active_drones::<S>))
        .layer(TraceLayer::new_for_http())
}
