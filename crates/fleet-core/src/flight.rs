//! Per-tick flight stepping for a single vehicle.
//!
//! `FlightSim` holds the task-local state of one movement (interpolated
//! position, battery, distance flown) and advances it one tick at a time.
//! It performs no I/O and knows nothing about timing or cancellation; the
//! server's flight loop drives it and persists each outcome.

use serde::{Deserialize, Serialize};

use crate::models::Position;
use crate::rules::{DrainMode, SimulationRules};
use crate::spatial::{haversine_distance, travel_per_tick_m};

/// Result of advancing a flight by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// Still en route; persist the new position and battery.
    Moved { position: Position, battery: i32 },
    /// Reached the target this tick.
    Arrived { position: Position, battery: i32 },
    /// Battery hit zero before moving this tick.
    Depleted { position: Position },
}

impl TickOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TickOutcome::Moved { .. })
    }
}

#[derive(Debug, Clone)]
pub struct FlightSim {
    target: Position,
    speed_kmh: f64,
    current: Position,
    battery: f64,
    total_distance_m: f64,
    altitude_delta_m: f64,
    travelled_m: f64,
    ticks: u64,
}

impl FlightSim {
    pub fn new(origin: Position, target: Position, battery: i32, speed_kmh: f64) -> Self {
        Self {
            target,
            speed_kmh,
            current: origin,
            battery: f64::from(battery),
            total_distance_m: haversine_distance(origin.lat, origin.lng, target.lat, target.lng),
            altitude_delta_m: target.altitude_m - origin.altitude_m,
            travelled_m: 0.0,
            ticks: 0,
        }
    }

    pub fn position(&self) -> Position {
        self.current
    }

    /// Battery level as stored on the vehicle record.
    pub fn battery_level(&self) -> i32 {
        // Truncating mode keeps the value integral; fractional mode reports
        // the charge rounded up so a partially drained unit still counts.
        self.battery.ceil().clamp(0.0, 100.0) as i32
    }

    pub fn total_distance_m(&self) -> f64 {
        self.total_distance_m
    }

    pub fn travelled_m(&self) -> f64 {
        self.travelled_m
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn distance_to_target_m(&self) -> f64 {
        haversine_distance(
            self.current.lat,
            self.current.lng,
            self.target.lat,
            self.target.lng,
        )
    }

    /// Advance one tick: drain battery, then either arrive or interpolate.
    pub fn step(&mut self, rules: &SimulationRules) -> TickOutcome {
        self.ticks += 1;

        self.battery = match rules.drain_mode {
            DrainMode::Truncating => (self.battery - rules.battery_drain_per_tick).trunc(),
            DrainMode::Fractional => self.battery - rules.battery_drain_per_tick,
        };
        if self.battery <= 0.0 {
            self.battery = 0.0;
            return TickOutcome::Depleted {
                position: self.current,
            };
        }

        let per_tick_m = travel_per_tick_m(self.speed_kmh, rules.tick_secs());
        let remaining_m = self.distance_to_target_m();

        if remaining_m <= per_tick_m {
            self.current = self.target;
            self.travelled_m += remaining_m;
            return TickOutcome::Arrived {
                position: self.current,
                battery: self.battery_level(),
            };
        }

        // Lat/lng close a fraction of the remaining gap, while altitude is
        // paced against the whole path.
        let ratio = per_tick_m / remaining_m;
        self.current.lat += (self.target.lat - self.current.lat) * ratio;
        self.current.lng += (self.target.lng - self.current.lng) * ratio;
        if self.total_distance_m > 0.0 {
            self.current.altitude_m += self.altitude_delta_m * (per_tick_m / self.total_distance_m);
        }
        self.travelled_m += per_tick_m;

        TickOutcome::Moved {
            position: self.current,
            battery: self.battery_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moscow() -> Position {
        Position::new(55.7558, 37.6173, 100.0)
    }

    fn moscow_target() -> Position {
        Position::new(55.7568, 37.6183, 120.0)
    }

    fn run_to_end(sim: &mut FlightSim, rules: &SimulationRules) -> Vec<TickOutcome> {
        let mut outcomes = Vec::new();
        for _ in 0..10_000 {
            let outcome = sim.step(rules);
            outcomes.push(outcome);
            if outcome.is_terminal() {
                break;
            }
        }
        outcomes
    }

    #[test]
    fn short_hop_interpolates_then_snaps_to_target() {
        let rules = SimulationRules::default();
        let mut sim = FlightSim::new(moscow(), moscow_target(), 100, 36.0);
        let outcomes = run_to_end(&mut sim, &rules);

        assert!(outcomes.len() > 5, "expected several ticks, got {}", outcomes.len());
        match outcomes.last() {
            Some(TickOutcome::Arrived { position, .. }) => assert_eq!(*position, moscow_target()),
            other => panic!("expected arrival, got {other:?}"),
        }
        assert!(outcomes[..outcomes.len() - 1]
            .iter()
            .all(|o| matches!(o, TickOutcome::Moved { .. })));
    }

    #[test]
    fn distance_to_target_never_increases() {
        let rules = SimulationRules::default();
        let mut sim = FlightSim::new(moscow(), moscow_target(), 100, 36.0);
        let mut last = sim.distance_to_target_m();
        loop {
            let outcome = sim.step(&rules);
            let now = sim.distance_to_target_m();
            assert!(now <= last + 1e-9, "distance grew from {last} to {now}");
            last = now;
            if outcome.is_terminal() {
                break;
            }
        }
        assert_eq!(last, 0.0);
    }

    #[test]
    fn fast_vehicle_arrives_on_first_tick() {
        let rules = SimulationRules::default();
        let mut sim = FlightSim::new(moscow(), moscow_target(), 100, 3_600.0);
        let outcome = sim.step(&rules);
        assert_eq!(
            outcome,
            TickOutcome::Arrived {
                position: moscow_target(),
                battery: 99
            }
        );
        assert_eq!(sim.ticks(), 1);
    }

    #[test]
    fn truncating_drain_removes_a_unit_per_tick() {
        let rules = SimulationRules::default();
        let mut sim = FlightSim::new(moscow(), Position::new(56.7558, 37.6173, 100.0), 3, 36.0);

        assert!(matches!(sim.step(&rules), TickOutcome::Moved { battery: 2, .. }));
        assert!(matches!(sim.step(&rules), TickOutcome::Moved { battery: 1, .. }));
        assert!(matches!(sim.step(&rules), TickOutcome::Depleted { .. }));
        assert_eq!(sim.battery_level(), 0);
    }

    #[test]
    fn fractional_drain_accumulates() {
        let rules = SimulationRules {
            drain_mode: DrainMode::Fractional,
            battery_drain_per_tick: 0.25,
            ..SimulationRules::default()
        };
        let mut sim = FlightSim::new(moscow(), Position::new(56.7558, 37.6173, 100.0), 1, 36.0);

        for _ in 0..3 {
            assert!(matches!(sim.step(&rules), TickOutcome::Moved { battery: 1, .. }));
        }
        assert!(matches!(sim.step(&rules), TickOutcome::Depleted { .. }));
        assert_eq!(sim.battery_level(), 0);
    }

    #[test]
    fn battery_never_increases() {
        let rules = SimulationRules::default();
        let mut sim = FlightSim::new(moscow(), Position::new(55.8558, 37.6173, 100.0), 50, 36.0);
        let mut last = sim.battery_level();
        for outcome in run_to_end(&mut sim, &rules) {
            let battery = match outcome {
                TickOutcome::Moved { battery, .. } | TickOutcome::Arrived { battery, .. } => battery,
                TickOutcome::Depleted { .. } => 0,
            };
            assert!(battery <= last);
            last = battery;
        }
        assert_eq!(last, 0);
    }

    #[test]
    fn near_antipodal_flight_moves_to_finite_coordinates() {
        let rules = SimulationRules::default();
        let mut sim = FlightSim::new(
            Position::new(0.015, 0.0, 10.0),
            Position::new(-0.015, 180.0, 10.0),
            100,
            36.0,
        );
        assert!(sim.total_distance_m().is_finite());

        match sim.step(&rules) {
            TickOutcome::Moved { position, battery } => {
                assert!(position.lat.is_finite() && position.lng.is_finite());
                assert_eq!(battery, 99);
            }
            other => panic!("expected a move, got {other:?}"),
        }
        assert!(sim.distance_to_target_m() < sim.total_distance_m());
    }

    #[test]
    fn altitude_is_paced_by_total_path() {
        let rules = SimulationRules::default();
        let mut sim = FlightSim::new(moscow(), moscow_target(), 100, 36.0);
        let total = sim.total_distance_m();

        sim.step(&rules);
        sim.step(&rules);

        let expected = 100.0 + 20.0 * (2.0 * 10.0 / total);
        assert!((sim.position().altitude_m - expected).abs() < 1e-9);
    }

    #[test]
    fn zero_length_flight_arrives_immediately() {
        let rules = SimulationRules::default();
        let origin = Position::new(55.7558, 37.6173, 100.0);
        let target = Position::new(55.7558, 37.6173, 140.0);
        let mut sim = FlightSim::new(origin, target, 100, 0.0);
        assert_eq!(
            sim.step(&rules),
            TickOutcome::Arrived {
                position: target,
                battery: 99
            }
        );
    }
}
