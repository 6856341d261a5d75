//! Applying a batch plan to the books.
//!
//! Planning is pure; settlement is where seats are consumed and deposits are
//! split. A seat that disappeared since the snapshot, or a deposit that no
//! longer covers the price, is recovered per entry as "unassigned, full
//! refund". Anything else is fatal and the caller discards the books it
//! handed in.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CoordinationResult;
use crate::escrow::{Escrow, SeatCharge};
use crate::events::CoordinationEvent;
use crate::ledger::{LedgerError, RideLedger};
use crate::matching::{BucketAssignment, BucketSnapshot, MatchingError, Placement, SeatDemand, SeatSupply};
use crate::registry::{MemberRegistry, Role};
use crate::types::{Amount, RideId};
use crate::waitlist::{Assignment, Resolution, UnassignedReason, WaitlistEntry, WaitlistError, WaitlistStore};

/// Every piece of mutable coordination state. Cloned per batch so a failed
/// settlement leaves the original untouched.
#[derive(Debug, Clone, Default)]
pub struct Books {
    pub registry: MemberRegistry,
    pub ledger: RideLedger,
    pub waitlist: WaitlistStore,
    pub escrow: Escrow,
}

impl Books {
    /// One snapshot per route with pending entries, in route order. Routes
    /// without open rides get an empty ride list.
    pub fn snapshot_buckets(&self) -> Vec<BucketSnapshot> {
        let mut open = self.ledger.open_rides_by_route();
        self.waitlist
            .pending_by_route()
            .into_iter()
            .map(|(route, entries)| {
                let rides = open
                    .remove(&route)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|ride| SeatSupply {
                        ride: ride.id,
                        departure: ride.departure,
                        remaining: ride.remaining_seats(),
                        price: ride.price,
                    })
                    .collect();
                let demand = entries
                    .into_iter()
                    .map(|entry| SeatDemand {
                        index: entry.index,
                        requested: entry.requested,
                        deposit: entry.deposit,
                    })
                    .collect();
                BucketSnapshot::new(route, rides, demand)
            })
            .collect()
    }
}

/// Engine output for one batch, bucket by bucket in route order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPlan {
    pub buckets: Vec<BucketAssignment>,
}

impl BatchPlan {
    pub fn entries(&self) -> usize {
        self.buckets.iter().map(|b| b.placements.len()).sum()
    }
}

/// Summary of one settled batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch: u64,
    pub buckets: usize,
    pub assigned: usize,
    pub unassigned: usize,
    /// Entries the plan seated but settlement had to unseat.
    pub recovered: usize,
    pub total_cost: u64,
    pub refunded: Amount,
    /// Seat revenue moved out of deposits and into ride escrow.
    pub collected: Amount,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.buckets == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settlement {
    pub report: BatchReport,
    pub events: Vec<CoordinationEvent>,
}

/// Settle `plan` into `books`. On error `books` is left half-written and must
/// be dropped.
pub fn apply_plan(books: &mut Books, plan: &BatchPlan, batch: u64) -> CoordinationResult<Settlement> {
    let mut settlement = Settlement {
        report: BatchReport {
            batch,
            buckets: plan.buckets.len(),
            ..BatchReport::default()
        },
        events: Vec::with_capacity(plan.entries() * 2 + 1),
    };

    for bucket in &plan.buckets {
        for &(index, placement) in &bucket.placements {
            let entry = books.waitlist.get(index)?.clone();
            if entry.is_resolved() {
                return Err(WaitlistError::AlreadyResolved(index).into());
            }
            if entry.route != bucket.route {
                return Err(MatchingError::SolverInconsistent(format!(
                    "{index} planned in bucket {} but belongs to {}",
                    bucket.route, entry.route
                ))
                .into());
            }

            let (assignment, charge, cost) = match placement {
                Placement::Assigned { ride, cost } => match take_seat(&mut books.ledger, &entry, ride)? {
                    Ok(price) => (Assignment::Assigned(ride), Some(SeatCharge { ride, price }), Some(cost)),
                    Err(reason) => {
                        warn!(%index, %ride, ?reason, "planned seat lost at settlement");
                        settlement.report.recovered += 1;
                        (Assignment::Unassigned(reason), None, None)
                    }
                },
                Placement::Unassigned(reason) => (Assignment::Unassigned(reason), None, None),
            };

            let refund = books.escrow.settle_deposit(entry.passenger, entry.deposit, charge)?;
            books.waitlist.resolve(
                index,
                Resolution {
                    assignment,
                    refund,
                    cost,
                    batch,
                },
            )?;
            record(&mut settlement, books, &entry, assignment, refund, cost)?;
        }
    }

    let report = &settlement.report;
    settlement.events.push(CoordinationEvent::BatchCompleted {
        batch,
        assigned: report.assigned,
        unassigned: report.unassigned,
        total_cost: report.total_cost,
    });
    Ok(settlement)
}

/// Seat the entry on `ride`. The inner error is a recoverable reason; the
/// outer one is fatal.
fn take_seat(
    ledger: &mut RideLedger,
    entry: &WaitlistEntry,
    ride: RideId,
) -> CoordinationResult<Result<Amount, UnassignedReason>> {
    let current = ledger.get(ride)?;
    if current.route != entry.route {
        return Err(MatchingError::SolverInconsistent(format!(
            "{ride} on {} offered to {} on {}",
            current.route, entry.index, entry.route
        ))
        .into());
    }
    let price = current.price;
    if entry.deposit < price {
        return Ok(Err(UnassignedReason::InsufficientDeposit));
    }
    match ledger.seat_passenger(ride, entry.passenger) {
        Ok(()) => Ok(Ok(price)),
        Err(LedgerError::CapacityExceeded { .. } | LedgerError::InvalidRideStatus { .. }) => {
            Ok(Err(UnassignedReason::CapacityRace))
        }
        Err(err) => Err(err.into()),
    }
}

fn record(
    settlement: &mut Settlement,
    books: &mut Books,
    entry: &WaitlistEntry,
    assignment: Assignment,
    refund: Amount,
    cost: Option<u64>,
) -> CoordinationResult<()> {
    let report = &mut settlement.report;
    let (index, passenger) = (entry.index, entry.passenger);
    match assignment {
        Assignment::Assigned(ride) => {
            let cost = cost.unwrap_or_default();
            report.assigned += 1;
            report.total_cost = report
                .total_cost
                .checked_add(cost)
                .ok_or(MatchingError::ComputationOverflow { route: entry.route })?;
            report.collected += entry.deposit - refund;
            books.registry.set_has_ride(passenger, Role::Passenger, true);
            debug!(%index, %ride, cost, refund, "entry seated");
            settlement.events.push(CoordinationEvent::PassengerAssigned {
                index,
                passenger,
                ride,
                cost,
            });
        }
        Assignment::Unassigned(reason) => {
            report.unassigned += 1;
            debug!(%index, ?reason, refund, "entry left unseated");
            settlement.events.push(CoordinationEvent::PassengerUnassigned {
                index,
                passenger,
                reason,
            });
        }
    }
    report.refunded += refund;
    settlement.events.push(CoordinationEvent::RefundSettled {
        index,
        passenger,
        refund,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoordinationError;
    use crate::route::RouteKey;
    use crate::types::{ParticipantId, WaitlistIndex};

    const ROUTE: (u32, u32) = (0, 1);

    fn books_with(rides: &[(u32, u32, Amount)], requests: &[(u32, Amount)]) -> Books {
        let mut books = Books::default();
        let route = RouteKey::from(ROUTE);
        for (i, &(departure, seats, price)) in rides.iter().enumerate() {
            books
                .ledger
                .create_ride(ParticipantId(100 + i as u64), departure, seats, price, route)
                .expect("ride");
        }
        for (i, &(requested, deposit)) in requests.iter().enumerate() {
            let passenger = ParticipantId(i as u64);
            books.registry.register_passenger(passenger).expect("register");
            books
                .waitlist
                .submit(passenger, route, requested, deposit)
                .expect("submit");
            books.escrow.hold_deposit(deposit).expect("hold");
        }
        books
    }

    fn plan(placements: Vec<(u64, Placement)>) -> BatchPlan {
        BatchPlan {
            buckets: vec![BucketAssignment {
                route: RouteKey::from(ROUTE),
                assigned: placements
                    .iter()
                    .filter(|(_, p)| matches!(p, Placement::Assigned { .. }))
                    .count(),
                total_cost: 0,
                placements: placements
                    .into_iter()
                    .map(|(i, p)| (WaitlistIndex(i), p))
                    .collect(),
            }],
        }
    }

    #[test]
    fn snapshot_covers_routes_with_pending_entries_only() {
        let mut books = books_with(&[(4, 1, 10)], &[(5, 20)]);
        books
            .ledger
            .create_ride(ParticipantId(7), 3, 2, 10, RouteKey::from((5, 6)))
            .expect("other route");
        books
            .waitlist
            .submit(ParticipantId(8), RouteKey::from((2, 3)), 1, 5)
            .expect("orphan request");

        let buckets = books.snapshot_buckets();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].route, RouteKey::from(ROUTE));
        assert_eq!(buckets[0].rides.len(), 1);
        assert_eq!(buckets[1].route, RouteKey::from((2, 3)));
        assert!(buckets[1].rides.is_empty());
    }

    #[test]
    fn settles_assigned_and_unassigned_entries() {
        let mut books = books_with(&[(4, 1, 10)], &[(5, 20), (6, 15)]);
        let settlement = apply_plan(
            &mut books,
            &plan(vec![
                (0, Placement::Assigned { ride: RideId(0), cost: 1 }),
                (1, Placement::Unassigned(UnassignedReason::CapacityExhausted)),
            ]),
            1,
        )
        .expect("settle");

        let report = settlement.report;
        assert_eq!((report.assigned, report.unassigned, report.recovered), (1, 1, 0));
        assert_eq!(report.refunded, 25);
        assert_eq!(report.collected, 10);
        assert_eq!(books.waitlist.get(WaitlistIndex(0)).expect("0").refund(), Some(10));
        assert_eq!(books.waitlist.get(WaitlistIndex(1)).expect("1").refund(), Some(15));
        assert_eq!(books.escrow.revenue_of(RideId(0)), 10);
        assert!(books.escrow.is_balanced());
        assert!(books.registry.passenger(ParticipantId(0)).has_ride);
        assert!(matches!(
            settlement.events.last(),
            Some(CoordinationEvent::BatchCompleted { assigned: 1, .. })
        ));
    }

    #[test]
    fn lost_seat_is_recovered_with_full_refund() {
        let mut books = books_with(&[(4, 1, 10)], &[(5, 20)]);
        books
            .ledger
            .seat_passenger(RideId(0), ParticipantId(50))
            .expect("direct booking");

        let settlement = apply_plan(
            &mut books,
            &plan(vec![(0, Placement::Assigned { ride: RideId(0), cost: 1 })]),
            1,
        )
        .expect("settle");

        assert_eq!(settlement.report.recovered, 1);
        let entry = books.waitlist.get(WaitlistIndex(0)).expect("entry");
        assert_eq!(
            entry.resolution.map(|r| r.assignment),
            Some(Assignment::Unassigned(UnassignedReason::CapacityRace))
        );
        assert_eq!(entry.refund(), Some(20));
    }

    #[test]
    fn short_deposit_is_recovered_not_charged() {
        let mut books = books_with(&[(4, 1, 30)], &[(5, 20)]);
        let settlement = apply_plan(
            &mut books,
            &plan(vec![(0, Placement::Assigned { ride: RideId(0), cost: 1 })]),
            1,
        )
        .expect("settle");

        assert_eq!(settlement.report.recovered, 1);
        assert_eq!(books.ledger.remaining_seats(RideId(0)), Ok(1));
        assert_eq!(
            books
                .waitlist
                .get(WaitlistIndex(0))
                .expect("entry")
                .resolution
                .map(|r| r.assignment),
            Some(Assignment::Unassigned(UnassignedReason::InsufficientDeposit))
        );
    }

    #[test]
    fn resolving_twice_is_fatal() {
        let mut books = books_with(&[(4, 2, 10)], &[(5, 20)]);
        let plan = plan(vec![(0, Placement::Assigned { ride: RideId(0), cost: 1 })]);
        apply_plan(&mut books, &plan, 1).expect("first");
        assert_eq!(
            apply_plan(&mut books, &plan, 2).map(|s| s.report),
            Err(CoordinationError::Waitlist(WaitlistError::AlreadyResolved(WaitlistIndex(0))))
        );
    }
}
