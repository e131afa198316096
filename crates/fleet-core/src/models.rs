//! Core data models for the fleet movement engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type VehicleId = i64;
pub type UserId = i64;

/// Role id the gateway assigns to police operators.
pub const POLICE_ROLE: i32 = 2;

/// Geographic position of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
    pub altitude_m: f64,
}

impl Position {
    pub fn new(lat: f64, lng: f64, altitude_m: f64) -> Self {
        Self { lat, lng, altitude_m }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    /// Registered but never activated
    #[default]
    Offline,
    /// Activated and hovering in place
    Active,
    /// Simulation task in progress
    Flying,
    /// Movement cancelled mid-flight
    Stopped,
    /// Battery ran out mid-flight
    #[serde(alias = "nullbattery")]
    BatteryDepleted,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Offline => "offline",
            VehicleStatus::Active => "active",
            VehicleStatus::Flying => "flying",
            VehicleStatus::Stopped => "stopped",
            VehicleStatus::BatteryDepleted => "battery_depleted",
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown vehicle status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for VehicleStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offline" => Ok(VehicleStatus::Offline),
            "active" => Ok(VehicleStatus::Active),
            "flying" => Ok(VehicleStatus::Flying),
            "stopped" => Ok(VehicleStatus::Stopped),
            "battery_depleted" | "nullbattery" => Ok(VehicleStatus::BatteryDepleted),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A vehicle record as held by the persistent store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub name: String,
    pub owner_id: UserId,
    /// `None` until the vehicle has been activated
    pub position: Option<Position>,
    pub status: VehicleStatus,
    pub battery_level: i32,
    /// Maximum speed in km/h
    pub max_speed: f64,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to seed a vehicle into a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVehicle {
    pub name: String,
    pub owner_id: UserId,
    pub max_speed: f64,
}

/// Identity and role resolved by the gateway for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: UserId,
    pub role: i32,
}

impl Caller {
    pub fn new(user_id: UserId, role: i32) -> Self {
        Self { user_id, role }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateRequest {
    pub user_id: UserId,
    pub drone_id: VehicleId,
    pub lat: f64,
    pub lng: f64,
    pub altitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRequest {
    pub user_id: UserId,
    pub drone_id: VehicleId,
    pub target_lat: f64,
    pub target_lng: f64,
    pub target_altitude: f64,
    pub battery_level: i32,
    /// Cruise speed in km/h
    pub speed: f64,
}

impl MoveRequest {
    pub fn target(&self) -> Position {
        Position::new(self.target_lat, self.target_lng, self.target_altitude)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopRequest {
    pub user_id: UserId,
    pub drone_id: VehicleId,
    #[serde(default)]
    pub user_role: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoRequest {
    pub user_id: UserId,
    pub drone_id: VehicleId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnedVehiclesRequest {
    pub user_id: UserId,
}

/// Response envelope shared by every command endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}
