//! Test helpers for common test setup and utilities.
//!
//! This module provides shared test utilities to reduce duplication across test files.

use crate::config::CoordinatorConfig;
use crate::coordinator::Coordinator;
use crate::route::RouteKey;
use crate::types::{Amount, ParticipantId, RideId, TimeSlot, WaitlistIndex};

/// The route most tests book on.
pub fn route_ab() -> RouteKey {
    RouteKey::from((0, 1))
}

/// Coordinator plus fresh participant ids: every ride gets its own driver
/// and every request its own passenger.
pub struct Fixture {
    pub coordinator: Coordinator,
    next_participant: u64,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}

impl Fixture {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            coordinator: Coordinator::new(config),
            next_participant: 1,
        }
    }

    fn fresh_id(&mut self) -> ParticipantId {
        let id = ParticipantId(self.next_participant);
        self.next_participant += 1;
        id
    }

    /// A registered driver with no rides yet.
    ///
    /// # Panics
    ///
    /// Panics if registration fails (should never happen for a fresh id).
    pub fn driver(&mut self) -> ParticipantId {
        let id = self.fresh_id();
        self.coordinator
            .register_driver(id)
            .expect("fresh driver registers");
        id
    }

    /// A registered passenger.
    ///
    /// # Panics
    ///
    /// Panics if registration fails (should never happen for a fresh id).
    pub fn passenger(&mut self) -> ParticipantId {
        let id = self.fresh_id();
        self.coordinator
            .register_passenger(id)
            .expect("fresh passenger registers");
        id
    }

    /// Create a ride with a new driver; returns `(driver, ride)`.
    ///
    /// # Panics
    ///
    /// Panics if the ride parameters are invalid.
    pub fn ride(
        &mut self,
        route: RouteKey,
        departure: TimeSlot,
        seats: u32,
        price: Amount,
    ) -> (ParticipantId, RideId) {
        let driver = self.driver();
        let ride = self
            .coordinator
            .create_ride(driver, departure, seats, price, route)
            .expect("valid ride");
        (driver, ride)
    }

    /// File a coordination request for a new passenger; returns `(passenger, index)`.
    ///
    /// # Panics
    ///
    /// Panics if the request is rejected.
    pub fn request(
        &mut self,
        route: RouteKey,
        requested: TimeSlot,
        deposit: Amount,
    ) -> (ParticipantId, WaitlistIndex) {
        let passenger = self.passenger();
        let index = self
            .coordinator
            .submit_coordination_request(passenger, route, requested, deposit)
            .expect("valid request");
        (passenger, index)
    }

    /// Assigned ride and refund of a resolved entry.
    ///
    /// # Panics
    ///
    /// Panics if the index is unknown.
    pub fn outcome(&self, index: WaitlistIndex) -> (Option<RideId>, Option<Amount>) {
        let entry = self
            .coordinator
            .get_waitlist_entry(index)
            .expect("known entry");
        (entry.assigned_ride(), entry.refund())
    }
}
