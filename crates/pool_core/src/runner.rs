//! Event runner: advances the clock and routes events into the ECS.
//!
//! Clock progression and event routing happen here, outside systems. Each step
//! pops the next event from [SimulationClock], inserts it as [CurrentEvent],
//! then runs the schedule.

use bevy_ecs::prelude::{Res, Schedule, World};
use bevy_ecs::schedule::IntoSystemConfigs;

use crate::clock::{CurrentEvent, Event, EventKind, SimulationClock};
use crate::systems::{
    batch_assignment::batch_assignment_system, request_inbound::request_inbound_system,
};

fn is_request_inbound(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::RequestInbound)
        .unwrap_or(false)
}

fn is_batch_assignment_run(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::BatchAssignmentRun)
        .unwrap_or(false)
}

/// Runs one step: pops the next event, inserts it as [CurrentEvent], then runs the schedule.
/// Returns `false` once the clock is empty.
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    run_next_event_with_hook(world, schedule, |_, _| {})
}

/// Runs one step and invokes `hook` after the schedule completes.
pub fn run_next_event_with_hook<F>(world: &mut World, schedule: &mut Schedule, mut hook: F) -> bool
where
    F: FnMut(&World, &Event),
{
    let event = match world.resource_mut::<SimulationClock>().pop_next() {
        Some(e) => e,
        None => return false,
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    hook(world, &event);
    true
}

/// Runs steps until the event queue is empty or `max_steps` is reached.
/// Returns the number of steps executed.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    steps
}

/// Builds the coordination schedule. Systems only run for their own event kind.
pub fn coordination_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems((
        request_inbound_system.run_if(is_request_inbound),
        batch_assignment_system
            .run_if(is_batch_assignment_run)
            .after(request_inbound_system),
    ));
    schedule
}
