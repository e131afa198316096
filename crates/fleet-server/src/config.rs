//! Server configuration from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use fleet_core::{DrainMode, SimulationRules, POLICE_ROLE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub store_backend: StoreBackend,
    pub database_path: String,
    pub database_max_connections: u32,
    pub log_json: bool,
    pub tick_ms: u64,
    pub battery_drain_per_tick: f64,
    pub battery_drain_mode: DrainMode,
    pub max_consecutive_write_failures: Option<u32>,
    pub privileged_role: i32,
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring unparseable {}={:?}", key, raw);
            None
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let rules = SimulationRules::default();
        Self {
            server_port: 8083,
            store_backend: StoreBackend::Sqlite,
            database_path: "data/fleet.db".to_string(),
            database_max_connections: 5,
            log_json: false,
            tick_ms: rules.tick.as_millis() as u64,
            battery_drain_per_tick: rules.battery_drain_per_tick,
            battery_drain_mode: rules.drain_mode,
            max_consecutive_write_failures: rules.max_consecutive_write_failures,
            privileged_role: POLICE_ROLE,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_env("FLEET_PORT").unwrap_or(defaults.server_port),
            store_backend: parse_env("FLEET_STORE").unwrap_or(defaults.store_backend),
            database_path: env::var("FLEET_DATABASE_PATH").unwrap_or(defaults.database_path),
            database_max_connections: parse_env("FLEET_DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            log_json: Self::log_json_from_env(),
            tick_ms: parse_env::<u64>("FLEET_TICK_MS")
                .filter(|ms| *ms > 0)
                .unwrap_or(defaults.tick_ms),
            battery_drain_per_tick: parse_env::<f64>("FLEET_BATTERY_DRAIN_PER_TICK")
                .filter(|d| d.is_finite() && *d >= 0.0)
                .unwrap_or(defaults.battery_drain_per_tick),
            battery_drain_mode: parse_env("FLEET_BATTERY_DRAIN_MODE")
                .unwrap_or(defaults.battery_drain_mode),
            max_consecutive_write_failures: parse_env::<u32>("FLEET_MAX_WRITE_FAILURES")
                .filter(|n| *n > 0)
                .or(defaults.max_consecutive_write_failures),
            privileged_role: parse_env("FLEET_PRIVILEGED_ROLE").unwrap_or(defaults.privileged_role),
        }
    }

    /// Read separately so logging can be set up before the rest of the config.
    pub fn log_json_from_env() -> bool {
        env::var("FLEET_LOG_JSON")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
    }

    pub fn simulation_rules(&self) -> SimulationRules {
        SimulationRules {
            tick: Duration::from_millis(self.tick_ms),
            battery_drain_per_tick: self.battery_drain_per_tick,
            drain_mode: self.battery_drain_mode,
            max_consecutive_write_failures: self.max_consecutive_write_failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let rules = Config::default().simulation_rules();
        assert_eq!(rules.tick, Duration::from_secs(1));
        assert_eq!(rules.battery_drain_per_tick, 0.02);
        assert_eq!(rules.drain_mode, DrainMode::Truncating);
        assert_eq!(rules.max_consecutive_write_failures, None);
    }

    #[test]
    fn store_backend_parses() {
        assert_eq!("Memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert_eq!("sqlite".parse::<StoreBackend>(), Ok(StoreBackend::Sqlite));
        assert!("postgres".parse::<StoreBackend>().is_err());
    }
}
