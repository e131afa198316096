//! Persistence layer for the fleet server.
//!
//! Provides the SQLite-backed implementation of the vehicle store.

pub mod db;
pub mod vehicles;

pub use db::{init_database, Database};
pub use vehicles::SqliteStore;
