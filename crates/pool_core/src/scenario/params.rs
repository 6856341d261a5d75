use bevy_ecs::prelude::Resource;

use crate::config::CoordinatorConfig;
use crate::route::RouteKey;
use crate::types::{Amount, ParticipantId, TimeSlot};

/// Batch assignment: run a coordinated batch every `interval` time units.
#[derive(Debug, Clone, Copy, Resource)]
pub struct BatchScheduleConfig {
    /// When false, no batch runs are scheduled and requests stay pending.
    pub enabled: bool,
    pub interval: u64,
}

impl Default for BatchScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: 10,
        }
    }
}

/// One coordination request waiting for its arrival event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinationRequest {
    pub passenger: ParticipantId,
    pub route: RouteKey,
    pub requested: TimeSlot,
    pub deposit: Amount,
    pub arrival: u64,
}

/// Requests addressed by the `subject` of their `RequestInbound` event.
#[derive(Debug, Default, Resource)]
pub struct PendingRequests {
    requests: Vec<Option<CoordinationRequest>>,
}

impl PendingRequests {
    pub fn new(requests: Vec<CoordinationRequest>) -> Self {
        Self {
            requests: requests.into_iter().map(Some).collect(),
        }
    }

    /// Hand out request `id`; a second call for the same id yields `None`.
    pub fn take(&mut self, id: usize) -> Option<CoordinationRequest> {
        self.requests.get_mut(id).and_then(Option::take)
    }

    pub fn remaining(&self) -> usize {
        self.requests.iter().filter(|r| r.is_some()).count()
    }
}

/// Parameters for building a coordination scenario.
#[derive(Debug, Clone)]
pub struct ScenarioParams {
    pub seed: u64,
    /// Locations are `0..locations`; routes connect two distinct ones when possible.
    pub locations: u32,
    /// One driver per ride.
    pub rides: usize,
    pub passengers: usize,
    pub requests: usize,
    pub max_seats: u32,
    pub min_price: Amount,
    pub max_price: Amount,
    /// Departures and requested slots fall in `0..time_slots`.
    pub time_slots: TimeSlot,
    /// Requests arrive uniformly in `[0, request_window)`.
    pub request_window: u64,
    pub max_deposit: Amount,
    pub batch: BatchScheduleConfig,
    pub coordinator: CoordinatorConfig,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            seed: 0,
            locations: 4,
            rides: 12,
            passengers: 40,
            requests: 60,
            max_seats: 4,
            min_price: 5,
            max_price: 20,
            time_slots: 24,
            request_window: 100,
            max_deposit: 30,
            batch: BatchScheduleConfig::default(),
            coordinator: CoordinatorConfig::default(),
        }
    }
}

impl ScenarioParams {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of distinct locations routes are drawn from.
    pub fn with_locations(mut self, locations: u32) -> Self {
        self.locations = locations;
        self
    }

    pub fn with_rides(mut self, rides: usize) -> Self {
        self.rides = rides;
        self
    }

    /// Set the passenger pool and how many requests they file between them.
    pub fn with_demand(mut self, passengers: usize, requests: usize) -> Self {
        self.passengers = passengers;
        self.requests = requests;
        self
    }

    /// Seat price range, inclusive.
    pub fn with_price_range(mut self, min_price: Amount, max_price: Amount) -> Self {
        self.min_price = min_price;
        self.max_price = max_price;
        self
    }

    pub fn with_max_deposit(mut self, max_deposit: Amount) -> Self {
        self.max_deposit = max_deposit;
        self
    }

    pub fn with_request_window(mut self, window: u64) -> Self {
        self.request_window = window;
        self
    }

    pub fn with_batch_interval(mut self, interval: u64) -> Self {
        self.batch.interval = interval;
        self
    }

    pub fn with_batch_enabled(mut self, enabled: bool) -> Self {
        self.batch.enabled = enabled;
        self
    }

    pub fn with_coordinator_config(mut self, config: CoordinatorConfig) -> Self {
        self.coordinator = config;
        self
    }
}
