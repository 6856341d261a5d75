//! Run a seeded coordination scenario and print batch outcomes.
//!
//! Run with: cargo run -p pool_core --example scenario_run [OUT_DIR]
//!
//! With `OUT_DIR`, resolved entries are written to `entries.parquet` and the
//! event log to `events.json` in that directory.

use std::path::PathBuf;

use bevy_ecs::prelude::World;
use pool_core::clock::SimulationClock;
use pool_core::export::{write_events_json, write_resolved_entries_parquet};
use pool_core::runner::{coordination_schedule, run_until_empty};
use pool_core::scenario::{build_scenario, ScenarioParams};
use pool_core::telemetry::CoordinationTelemetry;
use pool_core::Coordinator;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    const RIDES: usize = 40;
    const REQUESTS: usize = 300;
    const SEED: u64 = 123;

    let mut world = World::new();
    build_scenario(
        &mut world,
        ScenarioParams::default()
            .with_seed(SEED)
            .with_locations(5)
            .with_rides(RIDES)
            .with_demand(120, REQUESTS)
            .with_batch_interval(15),
    )?;

    let mut schedule = coordination_schedule();
    let steps = run_until_empty(&mut world, &mut schedule, 1_000_000);

    let telemetry = world.resource::<CoordinationTelemetry>();
    let clock = world.resource::<SimulationClock>();
    println!("--- Scenario run ({RIDES} rides, {REQUESTS} requests, seed {SEED}) ---");
    println!("Steps executed: {steps}");
    println!("Final time slot: {}", clock.now());
    println!(
        "Requests: {} submitted, {} rejected",
        telemetry.submitted_requests, telemetry.rejected_requests
    );
    println!(
        "Seated: {}  unseated: {}  recovered races: {}",
        telemetry.total_assigned(),
        telemetry.total_unassigned(),
        telemetry.total_recovered()
    );
    println!("Total deviation: {}", telemetry.total_cost());
    println!("Refunded: {}", telemetry.total_refunded());
    if let Some(rate) = telemetry.fill_rate() {
        println!("Fill rate: {:.1}%", rate * 100.0);
    }

    println!("\nBatches:");
    for record in &telemetry.batches {
        let r = &record.report;
        println!(
            "  #{:<3} t={:<4} buckets={:<3} seated={:<3} unseated={:<3} cost={}",
            r.batch, record.timestamp, r.buckets, r.assigned, r.unassigned, r.total_cost
        );
    }
    for (timestamp, err) in &telemetry.failed_batches {
        println!("  failed at t={timestamp}: {err}");
    }

    if let Some(dir) = std::env::args().nth(1).map(PathBuf::from) {
        let coordinator = world.resource::<Coordinator>();
        write_resolved_entries_parquet(dir.join("entries.parquet"), coordinator.waitlist())?;
        write_events_json(dir.join("events.json"), coordinator.events())?;
        println!("\nWrote entries.parquet and events.json to {}", dir.display());
    }
    Ok(())
}
