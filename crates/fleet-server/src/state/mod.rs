//! Process-wide in-memory state.

pub mod registry;

pub use registry::{MovementHandle, MovementRegistry};
