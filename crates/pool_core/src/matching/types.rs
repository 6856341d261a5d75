use serde::{Deserialize, Serialize};

use crate::route::RouteKey;
use crate::types::{Amount, RideId, TimeSlot, WaitlistIndex};
use crate::waitlist::UnassignedReason;

/// One open ride as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSupply {
    pub ride: RideId,
    pub departure: TimeSlot,
    pub remaining: u32,
    pub price: Amount,
}

/// One pending waitlist entry as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatDemand {
    pub index: WaitlistIndex,
    pub requested: TimeSlot,
    pub deposit: Amount,
}

/// Snapshot of one route bucket: its open rides and unresolved entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSnapshot {
    pub route: RouteKey,
    /// Ordered by ride id.
    pub rides: Vec<SeatSupply>,
    /// Ordered by waitlist index.
    pub demand: Vec<SeatDemand>,
}

impl BucketSnapshot {
    /// Build a snapshot, normalising both sides into id order and dropping
    /// rides without remaining seats.
    pub fn new(route: RouteKey, mut rides: Vec<SeatSupply>, mut demand: Vec<SeatDemand>) -> Self {
        rides.retain(|r| r.remaining > 0);
        rides.sort_by_key(|r| r.ride);
        demand.sort_by_key(|d| d.index);
        Self {
            route,
            rides,
            demand,
        }
    }

    pub fn total_seats(&self) -> u64 {
        self.rides.iter().map(|r| u64::from(r.remaining)).sum()
    }
}

/// Engine decision for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    Assigned { ride: RideId, cost: u64 },
    Unassigned(UnassignedReason),
}

/// Engine output for one bucket. Placements follow the snapshot's demand order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketAssignment {
    pub route: RouteKey,
    pub placements: Vec<(WaitlistIndex, Placement)>,
    pub total_cost: u64,
    pub assigned: usize,
}

impl BucketAssignment {
    pub fn placement(&self, index: WaitlistIndex) -> Option<Placement> {
        self.placements
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, p)| *p)
    }

    pub fn unassigned(&self) -> usize {
        self.placements.len() - self.assigned
    }
}
