//! Scenario setup: seeded drivers, rides and coordination requests.
//!
//! Rides are created up front; requests arrive over a time window as
//! scheduled events, and batch runs fire on a fixed interval.

mod build;
mod params;

pub use build::{build_scenario, generate_requests, passenger_id, random_route};
pub use params::{BatchScheduleConfig, CoordinationRequest, PendingRequests, ScenarioParams};
