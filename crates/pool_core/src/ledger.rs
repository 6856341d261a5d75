//! Ride capacity ledger: the arena of rides, addressed by [`RideId`].
//!
//! Rides are never deleted; they only consume seats and advance status
//! `BookingOpen → FullyBooked → Started → Completed` (a ride may also be
//! started straight from `BookingOpen`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::route::RouteKey;
use crate::types::{Amount, ParticipantId, RideId, TimeSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RideStatus {
    BookingOpen,
    FullyBooked,
    Started,
    Completed,
}

impl RideStatus {
    /// Numeric status code as exposed to external bookkeeping (0..=3).
    pub fn code(self) -> u8 {
        match self {
            RideStatus::BookingOpen => 0,
            RideStatus::FullyBooked => 1,
            RideStatus::Started => 2,
            RideStatus::Completed => 3,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid ride parameters: seats {seats}, price {price}")]
    InvalidRideParameters { seats: u32, price: Amount },

    #[error("unknown {0}")]
    UnknownRide(RideId),

    #[error("capacity exceeded on {ride}: requested {requested}, remaining {remaining}")]
    CapacityExceeded {
        ride: RideId,
        requested: u32,
        remaining: u32,
    },

    #[error("{ride} is {status:?}")]
    InvalidRideStatus { ride: RideId, status: RideStatus },

    #[error("{participant} does not own {ride}")]
    NotRideOwner {
        ride: RideId,
        participant: ParticipantId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ride {
    pub id: RideId,
    pub driver: ParticipantId,
    pub departure: TimeSlot,
    pub seats: u32,
    pub consumed: u32,
    pub price: Amount,
    pub route: RouteKey,
    pub status: RideStatus,
    /// Passengers seated so far, direct and coordinated, in booking order.
    pub passengers: Vec<ParticipantId>,
}

impl Ride {
    pub fn remaining_seats(&self) -> u32 {
        self.seats - self.consumed
    }

    /// Open for booking: status `BookingOpen` with at least one free seat.
    pub fn is_open(&self) -> bool {
        self.status == RideStatus::BookingOpen && self.remaining_seats() > 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct RideLedger {
    rides: Vec<Ride>,
}

impl RideLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new ride. Seats and price must both be positive.
    pub fn create_ride(
        &mut self,
        driver: ParticipantId,
        departure: TimeSlot,
        seats: u32,
        price: Amount,
        route: RouteKey,
    ) -> Result<RideId, LedgerError> {
        if seats == 0 || price == 0 {
            return Err(LedgerError::InvalidRideParameters { seats, price });
        }
        let id = RideId(self.rides.len() as u64);
        self.rides.push(Ride {
            id,
            driver,
            departure,
            seats,
            consumed: 0,
            price,
            route,
            status: RideStatus::BookingOpen,
            passengers: Vec::new(),
        });
        Ok(id)
    }

    pub fn get(&self, id: RideId) -> Result<&Ride, LedgerError> {
        usize::try_from(id.0)
            .ok()
            .and_then(|idx| self.rides.get(idx))
            .ok_or(LedgerError::UnknownRide(id))
    }

    fn get_mut(&mut self, id: RideId) -> Result<&mut Ride, LedgerError> {
        usize::try_from(id.0)
            .ok()
            .and_then(|idx| self.rides.get_mut(idx))
            .ok_or(LedgerError::UnknownRide(id))
    }

    pub fn remaining_seats(&self, id: RideId) -> Result<u32, LedgerError> {
        Ok(self.get(id)?.remaining_seats())
    }

    /// Consume `n` seats of an open ride. Either all `n` seats are taken or none.
    pub fn consume(&mut self, id: RideId, n: u32) -> Result<(), LedgerError> {
        let ride = self.get_mut(id)?;
        if !matches!(ride.status, RideStatus::BookingOpen | RideStatus::FullyBooked) {
            return Err(LedgerError::InvalidRideStatus {
                ride: id,
                status: ride.status,
            });
        }
        let remaining = ride.remaining_seats();
        if n > remaining {
            return Err(LedgerError::CapacityExceeded {
                ride: id,
                requested: n,
                remaining,
            });
        }
        ride.consumed += n;
        if ride.consumed == ride.seats {
            ride.status = RideStatus::FullyBooked;
        }
        Ok(())
    }

    /// Consume one seat and record `passenger` on the ride.
    pub fn seat_passenger(&mut self, id: RideId, passenger: ParticipantId) -> Result<(), LedgerError> {
        self.consume(id, 1)?;
        self.get_mut(id)?.passengers.push(passenger);
        Ok(())
    }

    pub fn start(&mut self, id: RideId, driver: ParticipantId) -> Result<&Ride, LedgerError> {
        let ride = self.owned_mut(id, driver)?;
        match ride.status {
            RideStatus::BookingOpen | RideStatus::FullyBooked => {
                ride.status = RideStatus::Started;
                Ok(&*ride)
            }
            status => Err(LedgerError::InvalidRideStatus { ride: id, status }),
        }
    }

    pub fn complete(&mut self, id: RideId, driver: ParticipantId) -> Result<&Ride, LedgerError> {
        let ride = self.owned_mut(id, driver)?;
        match ride.status {
            RideStatus::Started => {
                ride.status = RideStatus::Completed;
                Ok(&*ride)
            }
            status => Err(LedgerError::InvalidRideStatus { ride: id, status }),
        }
    }

    fn owned_mut(&mut self, id: RideId, driver: ParticipantId) -> Result<&mut Ride, LedgerError> {
        let ride = self.get_mut(id)?;
        if ride.driver != driver {
            return Err(LedgerError::NotRideOwner {
                ride: id,
                participant: driver,
            });
        }
        Ok(ride)
    }

    /// Ride ids on `route`, in creation order, regardless of status.
    pub fn find_rides(&self, route: RouteKey) -> Vec<RideId> {
        self.rides
            .iter()
            .filter(|ride| ride.route == route)
            .map(|ride| ride.id)
            .collect()
    }

    /// Rides that can still take coordinated passengers, in id order.
    pub fn open_rides(&self) -> impl Iterator<Item = &Ride> {
        self.rides.iter().filter(|ride| ride.is_open())
    }

    /// Open rides bucketed by route, each bucket in id order.
    pub fn open_rides_by_route(&self) -> BTreeMap<RouteKey, Vec<&Ride>> {
        let mut buckets: BTreeMap<RouteKey, Vec<&Ride>> = BTreeMap::new();
        for ride in self.open_rides() {
            buckets.entry(ride.route).or_default().push(ride);
        }
        buckets
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ride> {
        self.rides.iter()
    }

    pub fn len(&self) -> usize {
        self.rides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rides.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_with_ride(seats: u32) -> (RideLedger, RideId) {
        let mut ledger = RideLedger::new();
        let id = ledger
            .create_ride(ParticipantId(1), 10, seats, 10, RouteKey::from((0, 1)))
            .expect("ride");
        (ledger, id)
    }

    #[test]
    fn ids_increase_from_zero() {
        let mut ledger = RideLedger::new();
        let route = RouteKey::from((0, 1));
        let first = ledger
            .create_ride(ParticipantId(1), 10, 5, 10, route)
            .expect("first");
        let second = ledger
            .create_ride(ParticipantId(2), 11, 3, 10, route)
            .expect("second");
        assert_eq!(first, RideId(0));
        assert_eq!(second, RideId(1));
    }

    #[test]
    fn rejects_zero_seats_or_price() {
        let mut ledger = RideLedger::new();
        let route = RouteKey::from((0, 1));
        assert_eq!(
            ledger.create_ride(ParticipantId(1), 10, 0, 10, route),
            Err(LedgerError::InvalidRideParameters { seats: 0, price: 10 })
        );
        assert_eq!(
            ledger.create_ride(ParticipantId(1), 10, 2, 0, route),
            Err(LedgerError::InvalidRideParameters { seats: 2, price: 0 })
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn consume_is_all_or_nothing() {
        let (mut ledger, id) = ledger_with_ride(2);
        assert_eq!(
            ledger.consume(id, 3),
            Err(LedgerError::CapacityExceeded {
                ride: id,
                requested: 3,
                remaining: 2,
            })
        );
        assert_eq!(ledger.remaining_seats(id), Ok(2));

        ledger.consume(id, 1).expect("one seat");
        assert_eq!(ledger.remaining_seats(id), Ok(1));
        assert_eq!(ledger.get(id).expect("ride").status, RideStatus::BookingOpen);

        ledger.consume(id, 1).expect("last seat");
        let ride = ledger.get(id).expect("ride");
        assert_eq!(ride.status, RideStatus::FullyBooked);
        assert!(!ride.is_open());
        assert!(matches!(
            ledger.consume(id, 1),
            Err(LedgerError::CapacityExceeded { remaining: 0, .. })
        ));
    }

    #[test]
    fn lifecycle_requires_owner_and_order() {
        let (mut ledger, id) = ledger_with_ride(1);
        let stranger = ParticipantId(9);
        assert_eq!(
            ledger.start(id, stranger).map(|r| r.status),
            Err(LedgerError::NotRideOwner {
                ride: id,
                participant: stranger,
            })
        );
        assert_eq!(
            ledger.complete(id, ParticipantId(1)).map(|r| r.status),
            Err(LedgerError::InvalidRideStatus {
                ride: id,
                status: RideStatus::BookingOpen,
            })
        );

        ledger.start(id, ParticipantId(1)).expect("start");
        assert!(matches!(
            ledger.seat_passenger(id, ParticipantId(5)),
            Err(LedgerError::InvalidRideStatus { .. })
        ));
        let completed = ledger.complete(id, ParticipantId(1)).expect("complete");
        assert_eq!(completed.status, RideStatus::Completed);
        assert_eq!(completed.status.code(), 3);
    }

    #[test]
    fn find_rides_filters_by_direction() {
        let mut ledger = RideLedger::new();
        ledger
            .create_ride(ParticipantId(1), 10, 5, 10, RouteKey::from((0, 1)))
            .expect("ride 0");
        ledger
            .create_ride(ParticipantId(2), 11, 3, 10, RouteKey::from((0, 1)))
            .expect("ride 1");
        ledger
            .create_ride(ParticipantId(3), 12, 2, 10, RouteKey::from((1, 2)))
            .expect("ride 2");

        assert_eq!(
            ledger.find_rides(RouteKey::from((0, 1))),
            vec![RideId(0), RideId(1)]
        );
        assert!(ledger.find_rides(RouteKey::from((0, 2))).is_empty());
        assert_eq!(ledger.find_rides(RouteKey::from((1, 2))), vec![RideId(2)]);
    }

    #[test]
    fn open_buckets_skip_full_and_started_rides() {
        let mut ledger = RideLedger::new();
        let route = RouteKey::from((0, 1));
        let full = ledger.create_ride(ParticipantId(1), 8, 1, 10, route).expect("full");
        let started = ledger.create_ride(ParticipantId(2), 9, 2, 10, route).expect("started");
        let open = ledger.create_ride(ParticipantId(3), 10, 2, 10, route).expect("open");
        ledger.consume(full, 1).expect("fill");
        ledger.start(started, ParticipantId(2)).expect("start");

        let buckets = ledger.open_rides_by_route();
        let ids: Vec<_> = buckets[&route].iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![open]);
    }
}
