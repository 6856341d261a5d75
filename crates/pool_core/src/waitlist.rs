//! Waitlist of coordination requests.
//!
//! An entry's index is its position in submission order and doubles as its
//! identity. Entries are resolved exactly once and never removed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::route::RouteKey;
use crate::types::{Amount, ParticipantId, RideId, TimeSlot, WaitlistIndex};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WaitlistError {
    #[error("deposit must be positive")]
    InvalidDeposit,

    #[error("unknown {0}")]
    UnknownEntry(WaitlistIndex),

    #[error("{0} is already resolved")]
    AlreadyResolved(WaitlistIndex),

    #[error("refund {refund} exceeds deposit {deposit} on {index}")]
    RefundExceedsDeposit {
        index: WaitlistIndex,
        refund: Amount,
        deposit: Amount,
    },
}

/// Why an entry ended up without a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnassignedReason {
    /// No open ride shares the entry's route.
    NoRideOnRoute,
    /// Every open ride on the route costs more than the deposit.
    NoAffordableRide,
    /// The route had rides, but not enough seats for every entry.
    CapacityExhausted,
    /// The chosen seat was taken between planning and settlement.
    CapacityRace,
    /// The deposit did not cover the chosen ride at settlement time.
    InsufficientDeposit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assignment {
    Assigned(RideId),
    Unassigned(UnassignedReason),
}

/// Final outcome of an entry, written once by settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub assignment: Assignment,
    pub refund: Amount,
    /// Deviation between requested and actual departure, for assigned entries.
    pub cost: Option<u64>,
    /// Batch that resolved the entry.
    pub batch: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub index: WaitlistIndex,
    pub passenger: ParticipantId,
    pub route: RouteKey,
    pub requested: TimeSlot,
    pub deposit: Amount,
    pub resolution: Option<Resolution>,
}

impl WaitlistEntry {
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// Ride the entry was seated on; `None` while pending or when unassigned.
    pub fn assigned_ride(&self) -> Option<RideId> {
        match self.resolution?.assignment {
            Assignment::Assigned(ride) => Some(ride),
            Assignment::Unassigned(_) => None,
        }
    }

    /// Refund owed to the passenger; `None` until resolved.
    pub fn refund(&self) -> Option<Amount> {
        self.resolution.map(|r| r.refund)
    }
}

#[derive(Debug, Clone, Default)]
pub struct WaitlistStore {
    entries: Vec<WaitlistEntry>,
    pending: usize,
}

impl WaitlistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request and return its stable index.
    pub fn submit(
        &mut self,
        passenger: ParticipantId,
        route: RouteKey,
        requested: TimeSlot,
        deposit: Amount,
    ) -> Result<WaitlistIndex, WaitlistError> {
        if deposit == 0 {
            return Err(WaitlistError::InvalidDeposit);
        }
        let index = WaitlistIndex(self.entries.len() as u64);
        self.entries.push(WaitlistEntry {
            index,
            passenger,
            route,
            requested,
            deposit,
            resolution: None,
        });
        self.pending += 1;
        Ok(index)
    }

    /// Record the outcome of `index`. Allowed exactly once per entry.
    pub fn resolve(
        &mut self,
        index: WaitlistIndex,
        resolution: Resolution,
    ) -> Result<(), WaitlistError> {
        let entry = self.get_mut(index)?;
        if entry.resolution.is_some() {
            return Err(WaitlistError::AlreadyResolved(index));
        }
        if resolution.refund > entry.deposit {
            return Err(WaitlistError::RefundExceedsDeposit {
                index,
                refund: resolution.refund,
                deposit: entry.deposit,
            });
        }
        entry.resolution = Some(resolution);
        self.pending -= 1;
        Ok(())
    }

    pub fn get(&self, index: WaitlistIndex) -> Result<&WaitlistEntry, WaitlistError> {
        usize::try_from(index.0)
            .ok()
            .and_then(|idx| self.entries.get(idx))
            .ok_or(WaitlistError::UnknownEntry(index))
    }

    fn get_mut(&mut self, index: WaitlistIndex) -> Result<&mut WaitlistEntry, WaitlistError> {
        usize::try_from(index.0)
            .ok()
            .and_then(|idx| self.entries.get_mut(idx))
            .ok_or(WaitlistError::UnknownEntry(index))
    }

    /// Unresolved entries grouped by route, each group in index order.
    pub fn pending_by_route(&self) -> BTreeMap<RouteKey, Vec<&WaitlistEntry>> {
        let mut buckets: BTreeMap<RouteKey, Vec<&WaitlistEntry>> = BTreeMap::new();
        for entry in self.entries.iter().filter(|e| !e.is_resolved()) {
            buckets.entry(entry.route).or_default().push(entry);
        }
        buckets
    }

    pub fn iter(&self) -> impl Iterator<Item = &WaitlistEntry> {
        self.entries.iter()
    }

    pub fn pending_count(&self) -> usize {
        self.pending
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
