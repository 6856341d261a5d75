use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::Resource;

/// Event kinds, in the order they are processed when timestamps tie: a
/// request arriving at the same instant as a batch run makes that batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    RequestInbound,
    BatchAssignmentRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u64,
    pub kind: EventKind,
    /// Request id for `RequestInbound`.
    pub subject: Option<usize>,
    seq: u64,
}

impl Event {
    pub fn new(timestamp: u64, kind: EventKind, subject: Option<usize>) -> Self {
        Self {
            timestamp,
            kind,
            subject,
            seq: 0,
        }
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap by (timestamp, kind, seq).
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.kind.cmp(&self.kind))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The event being processed by the current schedule run.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

#[derive(Debug, Default, Resource)]
pub struct SimulationClock {
    now: u64,
    next_seq: u64,
    events: BinaryHeap<Event>,
}

impl SimulationClock {
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn schedule(&mut self, mut event: Event) {
        debug_assert!(
            event.timestamp >= self.now,
            "event timestamp must be >= current time"
        );
        event.seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(event);
    }

    pub fn schedule_at(&mut self, timestamp: u64, kind: EventKind, subject: Option<usize>) {
        self.schedule(Event::new(timestamp, kind, subject));
    }

    pub fn schedule_in(&mut self, delay: u64, kind: EventKind, subject: Option<usize>) {
        self.schedule_at(self.now.saturating_add(delay), kind, subject);
    }

    pub fn pop_next(&mut self) -> Option<Event> {
        let event = self.events.pop()?;
        self.now = event.timestamp;
        Some(event)
    }

    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|e| e.timestamp)
    }

    /// Whether any event of `kind` is still queued.
    pub fn has_pending(&self, kind: EventKind) -> bool {
        self.events.iter().any(|e| e.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
