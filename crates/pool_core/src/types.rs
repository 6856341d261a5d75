//! Identifiers and scalar units shared by every component.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Money in the smallest currency unit. All balances, prices and deposits use it.
pub type Amount = u64;

/// Departure or requested time slot (e.g. hour of day).
pub type TimeSlot = u32;

/// Identity of a driver and/or passenger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub u64);

/// Stable ride identifier, assigned at creation in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RideId(pub u64);

/// Position of a coordination request in the waitlist. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WaitlistIndex(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "participant#{}", self.0)
    }
}

impl fmt::Display for RideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ride#{}", self.0)
    }
}

impl fmt::Display for WaitlistIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "waitlist#{}", self.0)
    }
}

/// Absolute deviation between a requested slot and a departure slot.
pub fn deviation(requested: TimeSlot, departure: TimeSlot) -> u64 {
    u64::from(requested.abs_diff(departure))
}
