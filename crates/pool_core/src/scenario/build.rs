use bevy_ecs::prelude::World;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use super::params::{CoordinationRequest, PendingRequests, ScenarioParams};
use crate::clock::{EventKind, SimulationClock};
use crate::coordinator::Coordinator;
use crate::error::CoordinationResult;
use crate::route::{Location, RouteKey};
use crate::telemetry::CoordinationTelemetry;
use crate::types::ParticipantId;

/// Passenger ids start here so they never collide with driver ids.
const PASSENGER_ID_BASE: u64 = 1_000_000;

/// Seed offsets keep the ride and request streams independent.
const RIDE_SEED_OFFSET: u64 = 0x0051_de5e;
const REQUEST_SEED_OFFSET: u64 = 0x00de_9051;

/// Pick a directed route between two distinct locations (or a loop when
/// only one location exists).
pub fn random_route<R: Rng>(rng: &mut R, locations: u32) -> RouteKey {
    let locations = locations.max(1);
    let origin = rng.gen_range(0..locations);
    let destination = if locations == 1 {
        origin
    } else {
        let d = rng.gen_range(0..locations - 1);
        if d >= origin {
            d + 1
        } else {
            d
        }
    };
    RouteKey::new(Location(origin), Location(destination))
}

pub fn passenger_id(n: usize) -> ParticipantId {
    ParticipantId(PASSENGER_ID_BASE + n as u64)
}

/// Deterministic request stream for `params`, ordered by arrival.
pub fn generate_requests(params: &ScenarioParams) -> Vec<CoordinationRequest> {
    let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(REQUEST_SEED_OFFSET));
    let mut requests: Vec<CoordinationRequest> = (0..params.requests)
        .map(|_| CoordinationRequest {
            passenger: passenger_id(rng.gen_range(0..params.passengers.max(1))),
            route: random_route(&mut rng, params.locations),
            requested: rng.gen_range(0..params.time_slots.max(1)),
            deposit: rng.gen_range(1..=params.max_deposit.max(1)),
            arrival: rng.gen_range(0..params.request_window.max(1)),
        })
        .collect();
    requests.sort_by_key(|r| r.arrival);
    requests
}

/// Populate `world` with a coordinator holding the scenario's rides, the
/// request stream as scheduled events, and the batch schedule.
pub fn build_scenario(world: &mut World, params: ScenarioParams) -> CoordinationResult<()> {
    let mut coordinator = Coordinator::new(params.coordinator);
    let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(RIDE_SEED_OFFSET));
    let min_price = params.min_price.max(1);
    let max_price = params.max_price.max(min_price);

    for n in 0..params.rides {
        let driver = ParticipantId(1 + n as u64);
        coordinator.register_driver(driver)?;
        let route = random_route(&mut rng, params.locations);
        let departure = rng.gen_range(0..params.time_slots.max(1));
        let seats = rng.gen_range(1..=params.max_seats.max(1));
        let price = rng.gen_range(min_price..=max_price);
        coordinator.create_ride(driver, departure, seats, price, route)?;
    }
    for n in 0..params.passengers.max(1) {
        coordinator.register_passenger(passenger_id(n))?;
    }

    let requests = generate_requests(&params);
    let mut clock = SimulationClock::default();
    for (id, request) in requests.iter().enumerate() {
        clock.schedule_at(request.arrival, EventKind::RequestInbound, Some(id));
    }
    if params.batch.enabled {
        clock.schedule_at(params.batch.interval, EventKind::BatchAssignmentRun, None);
    }

    info!(
        seed = params.seed,
        rides = params.rides,
        requests = requests.len(),
        "scenario built"
    );
    world.insert_resource(clock);
    world.insert_resource(coordinator);
    world.insert_resource(PendingRequests::new(requests));
    world.insert_resource(params.batch);
    world.insert_resource(CoordinationTelemetry::default());
    Ok(())
}
