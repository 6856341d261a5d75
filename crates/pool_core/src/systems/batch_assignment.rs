//! Batch assignment system: settle every pending bucket when BatchAssignmentRun fires,
//! then schedule the next run while requests are still due to arrive.

use bevy_ecs::prelude::{Res, ResMut};
use tracing::error;

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::coordinator::Coordinator;
use crate::scenario::BatchScheduleConfig;
use crate::telemetry::{BatchRecord, CoordinationTelemetry};

pub fn batch_assignment_system(
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    batch_config: Option<Res<BatchScheduleConfig>>,
    mut coordinator: ResMut<Coordinator>,
    mut telemetry: ResMut<CoordinationTelemetry>,
) {
    if event.0.kind != EventKind::BatchAssignmentRun {
        return;
    }
    let Some(config) = batch_config.as_deref() else {
        return;
    };
    if !config.enabled {
        return;
    }

    let timestamp = clock.now();
    match coordinator.run_assignment_batch() {
        Ok(report) if report.is_empty() => {}
        Ok(report) => telemetry.batches.push(BatchRecord { timestamp, report }),
        Err(err) => {
            error!(timestamp, %err, "assignment batch aborted");
            telemetry.failed_batches.push((timestamp, err.to_string()));
        }
    }

    if clock.has_pending(EventKind::RequestInbound) && !clock.has_pending(EventKind::BatchAssignmentRun) {
        clock.schedule_in(config.interval.max(1), EventKind::BatchAssignmentRun, None);
    }
}
