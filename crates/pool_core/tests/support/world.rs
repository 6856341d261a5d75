#![allow(dead_code)]

use bevy_ecs::prelude::World;
use pool_core::config::CoordinatorConfig;
use pool_core::scenario::{build_scenario, ScenarioParams};

/// Builder configuration for reproducible test worlds.
#[derive(Clone, Debug)]
pub struct TestWorldConfig {
    pub seed: u64,
    pub locations: u32,
    pub rides: usize,
    pub passengers: usize,
    pub requests: usize,
    pub batch_interval: u64,
    pub coordinator: CoordinatorConfig,
}

impl Default for TestWorldConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            locations: 3,
            rides: 8,
            passengers: 20,
            requests: 30,
            batch_interval: 10,
            coordinator: CoordinatorConfig::default(),
        }
    }
}

impl TestWorldConfig {
    pub fn params(&self) -> ScenarioParams {
        ScenarioParams::default()
            .with_seed(self.seed)
            .with_locations(self.locations)
            .with_rides(self.rides)
            .with_demand(self.passengers, self.requests)
            .with_batch_interval(self.batch_interval)
            .with_coordinator_config(self.coordinator)
    }
}

/// Build a world holding the scenario described by `config`.
pub fn build_world(config: &TestWorldConfig) -> World {
    let mut world = World::new();
    build_scenario(&mut world, config.params()).expect("scenario builds");
    world
}
