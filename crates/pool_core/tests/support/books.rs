#![allow(dead_code)]

use std::collections::BTreeMap;

use pool_core::ledger::RideStatus;
use pool_core::waitlist::Assignment;
use pool_core::Coordinator;

/// Checks the bookkeeping identities that must hold after every operation:
/// deposit conservation per entry, route isolation, seat accounting and the
/// escrow custody balance.
pub fn assert_books_consistent(coordinator: &Coordinator) {
    let ledger = coordinator.ledger();
    let mut seated_by_ride: BTreeMap<_, u32> = BTreeMap::new();

    for entry in coordinator.waitlist().iter() {
        let Some(resolution) = entry.resolution else {
            continue;
        };
        match resolution.assignment {
            Assignment::Assigned(ride_id) => {
                let ride = ledger.get(ride_id).expect("assigned ride exists");
                assert_eq!(ride.route, entry.route, "{} left its route", entry.index);
                assert_eq!(
                    resolution.refund + ride.price,
                    entry.deposit,
                    "{} does not conserve its deposit",
                    entry.index
                );
                assert!(
                    ride.passengers.contains(&entry.passenger),
                    "{} is missing from {}",
                    entry.index,
                    ride_id
                );
                *seated_by_ride.entry(ride_id).or_default() += 1;
            }
            Assignment::Unassigned(_) => {
                assert_eq!(
                    resolution.refund, entry.deposit,
                    "{} must be fully refunded",
                    entry.index
                );
                assert_eq!(resolution.cost, None);
            }
        }
    }

    for ride in ledger.iter() {
        assert!(ride.consumed <= ride.seats, "{} oversold", ride.id);
        assert_eq!(ride.passengers.len(), ride.consumed as usize);
        assert!(seated_by_ride.get(&ride.id).copied().unwrap_or(0) <= ride.consumed);
        if ride.consumed == ride.seats {
            assert_ne!(ride.status, RideStatus::BookingOpen, "{} is full but open", ride.id);
        }
    }

    assert!(coordinator.escrow().is_balanced(), "escrow custody is unbalanced");
}
