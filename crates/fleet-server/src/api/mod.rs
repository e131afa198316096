//! API routes for the fleet server.

pub mod error;
mod routes;
pub mod vehicles;

use axum::Router;
use std::sync::Arc;

use crate::dispatcher::Dispatcher;
use crate::store::VehicleStore;

pub fn routes<S: VehicleStore>() -> Router<Arc<Dispatcher<S>>> {
    routes::create_router::<S>()
}
