//! Notifications emitted by the coordinator, for observability and external
//! bookkeeping. The log is append-only; a failed operation appends nothing.

use serde::{Deserialize, Serialize};

use crate::route::RouteKey;
use crate::types::{Amount, ParticipantId, RideId, TimeSlot, WaitlistIndex};
use crate::waitlist::UnassignedReason;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum CoordinationEvent {
    RideCreated {
        ride: RideId,
        driver: ParticipantId,
        route: RouteKey,
        departure: TimeSlot,
        seats: u32,
        price: Amount,
    },
    PassengerJoined {
        ride: RideId,
        passenger: ParticipantId,
        paid: Amount,
    },
    CoordinationRequested {
        index: WaitlistIndex,
        passenger: ParticipantId,
        route: RouteKey,
        requested: TimeSlot,
        deposit: Amount,
    },
    PassengerAssigned {
        index: WaitlistIndex,
        passenger: ParticipantId,
        ride: RideId,
        cost: u64,
    },
    PassengerUnassigned {
        index: WaitlistIndex,
        passenger: ParticipantId,
        reason: UnassignedReason,
    },
    RefundSettled {
        index: WaitlistIndex,
        passenger: ParticipantId,
        refund: Amount,
    },
    RideStarted {
        ride: RideId,
    },
    RideCompleted {
        ride: RideId,
        driver: ParticipantId,
        revenue: Amount,
    },
    FundsWithdrawn {
        participant: ParticipantId,
        amount: Amount,
    },
    BatchCompleted {
        batch: u64,
        assigned: usize,
        unassigned: usize,
        total_cost: u64,
    },
}

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<CoordinationEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: CoordinationEvent) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = CoordinationEvent>) {
        self.events.extend(events);
    }

    pub fn as_slice(&self) -> &[CoordinationEvent] {
        &self.events
    }

    /// Events appended at or after position `from`.
    pub fn since(&self, from: usize) -> &[CoordinationEvent] {
        self.events.get(from..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
