use bevy_ecs::prelude::{Res, ResMut};
use tracing::warn;

use crate::clock::{CurrentEvent, EventKind};
use crate::coordinator::Coordinator;
use crate::scenario::PendingRequests;
use crate::telemetry::CoordinationTelemetry;

/// Files the arriving request on the coordinator's waitlist.
pub fn request_inbound_system(
    event: Res<CurrentEvent>,
    mut pending: ResMut<PendingRequests>,
    mut coordinator: ResMut<Coordinator>,
    mut telemetry: ResMut<CoordinationTelemetry>,
) {
    if event.0.kind != EventKind::RequestInbound {
        return;
    }
    let Some(request) = event.0.subject.and_then(|id| pending.take(id)) else {
        return;
    };

    match coordinator.submit_coordination_request(
        request.passenger,
        request.route,
        request.requested,
        request.deposit,
    ) {
        Ok(_) => telemetry.submitted_requests += 1,
        Err(err) => {
            warn!(passenger = %request.passenger, %err, "coordination request rejected");
            telemetry.rejected_requests += 1;
        }
    }
}
