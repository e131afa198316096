//! Simulation rules and thresholds for the movement engine.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// How per-tick battery drain is applied to the integer battery level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrainMode {
    /// Drain then truncate to an integer every tick. With a sub-unit drain
    /// this removes one whole unit per tick (100 - 0.02 truncates to 99).
    #[default]
    Truncating,
    /// Accumulate the drain precisely; the persisted level is rounded up.
    Fractional,
}

impl FromStr for DrainMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "truncating" | "truncate" => Ok(DrainMode::Truncating),
            "fractional" => Ok(DrainMode::Fractional),
            other => Err(format!("unknown battery drain mode '{other}'")),
        }
    }
}

/// Configuration for the per-vehicle simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRules {
    /// Interval between simulation ticks
    pub tick: Duration,
    /// Battery units drained per tick
    pub battery_drain_per_tick: f64,
    pub drain_mode: DrainMode,
    /// Consecutive failed writes before a task gives up (None = never)
    pub max_consecutive_write_failures: Option<u32>,
}

impl Default for SimulationRules {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            battery_drain_per_tick: 0.02,
            drain_mode: DrainMode::Truncating,
            max_consecutive_write_failures: None,
        }
    }
}

impl SimulationRules {
    pub fn tick_secs(&self) -> f64 {
        self.tick.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_mode_parses_case_insensitively() {
        assert_eq!("Fractional".parse::<DrainMode>(), Ok(DrainMode::Fractional));
        assert_eq!("truncating".parse::<DrainMode>(), Ok(DrainMode::Truncating));
        assert!("linear".parse::<DrainMode>().is_err());
    }
}
