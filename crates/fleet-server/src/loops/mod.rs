//! Background loops for continuous processing.

pub mod flight_loop;

pub use flight_loop::{run_flight_loop, FlightContext, FlightEnd, FlightPlan, FlightSummary};
