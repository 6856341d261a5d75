mod support;

use pool_core::config::CoordinatorConfig;
use pool_core::route::RouteKey;
use pool_core::test_helpers::Fixture;
use pool_core::waitlist::WaitlistEntry;
use pool_core::AlgorithmKind;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use support::books::assert_books_consistent;

const ROUTES: [(u32, u32); 3] = [(0, 1), (1, 0), (1, 2)];

/// Fill `fixture` with a seeded mix of rides and requests across a few routes.
fn populate(fixture: &mut Fixture, seed: u64, rides: usize, requests: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..rides {
        let route = RouteKey::from(ROUTES[rng.gen_range(0..ROUTES.len())]);
        fixture.ride(
            route,
            rng.gen_range(0..24),
            rng.gen_range(1..=3),
            rng.gen_range(5..=20),
        );
    }
    for _ in 0..requests {
        let route = RouteKey::from(ROUTES[rng.gen_range(0..ROUTES.len())]);
        fixture.request(route, rng.gen_range(0..24), rng.gen_range(1..=30));
    }
}

fn entries(fixture: &Fixture) -> Vec<WaitlistEntry> {
    fixture.coordinator.waitlist().iter().cloned().collect()
}

#[test]
fn seeded_batches_keep_the_books_consistent() {
    for seed in 0..25 {
        let mut fixture = Fixture::default();
        populate(&mut fixture, seed, 10, 30);
        let custody = fixture.coordinator.escrow().custody();

        let report = fixture.coordinator.run_assignment_batch().expect("batch");

        assert_eq!(report.assigned + report.unassigned, 30, "seed {seed}");
        assert_eq!(report.recovered, 0, "seed {seed}");
        assert_eq!(fixture.coordinator.waitlist().pending_count(), 0);
        assert_eq!(fixture.coordinator.escrow().custody(), custody);
        assert_eq!(fixture.coordinator.escrow().held_deposits(), 0);
        assert_books_consistent(&fixture.coordinator);
    }
}

#[test]
fn deposits_split_exactly_into_revenue_and_refunds() {
    let mut fixture = Fixture::default();
    populate(&mut fixture, 7, 12, 40);
    let deposits: u64 = fixture.coordinator.waitlist().iter().map(|e| e.deposit).sum();

    let report = fixture.coordinator.run_assignment_batch().expect("batch");

    assert_eq!(report.refunded + report.collected, deposits);
    let revenue: u64 = fixture
        .coordinator
        .ledger()
        .iter()
        .map(|ride| fixture.coordinator.escrow().revenue_of(ride.id))
        .sum();
    assert_eq!(revenue, report.collected);
}

#[test]
fn identical_inputs_settle_identically() {
    let run = |seed| {
        let mut fixture = Fixture::default();
        populate(&mut fixture, seed, 10, 35);
        let report = fixture.coordinator.run_assignment_batch().expect("batch");
        (report, entries(&fixture), fixture.coordinator.events().to_vec())
    };
    for seed in [3, 19, 64] {
        assert_eq!(run(seed), run(seed), "seed {seed}");
    }
}

#[test]
fn parallel_and_serial_buckets_agree() {
    for seed in 0..10 {
        let mut serial = Fixture::new(CoordinatorConfig::default().with_parallel_buckets(false));
        let mut parallel = Fixture::new(CoordinatorConfig::default().with_parallel_buckets(true));
        populate(&mut serial, seed, 10, 30);
        populate(&mut parallel, seed, 10, 30);

        let a = serial.coordinator.run_assignment_batch().expect("serial");
        let b = parallel.coordinator.run_assignment_batch().expect("parallel");

        assert_eq!(a, b, "seed {seed}");
        assert_eq!(entries(&serial), entries(&parallel));
        assert_eq!(serial.coordinator.events(), parallel.coordinator.events());
    }
}

#[test]
fn both_engines_settle_small_buckets_identically() {
    for seed in 0..10 {
        let mut hungarian = Fixture::new(CoordinatorConfig::default());
        let mut exhaustive =
            Fixture::new(CoordinatorConfig::default().with_algorithm(AlgorithmKind::Exhaustive));
        // Few enough entries per bucket for the exhaustive search.
        populate(&mut hungarian, seed, 6, 12);
        populate(&mut exhaustive, seed, 6, 12);

        let a = hungarian.coordinator.run_assignment_batch();
        let b = exhaustive.coordinator.run_assignment_batch();
        let (Ok(a), Ok(b)) = (a, b) else {
            continue;
        };
        assert_eq!(a, b, "seed {seed}");
        assert_eq!(entries(&hungarian), entries(&exhaustive));
    }
}

#[test]
fn rerunning_after_settlement_is_idempotent() {
    let mut fixture = Fixture::default();
    populate(&mut fixture, 5, 8, 20);
    fixture.coordinator.run_assignment_batch().expect("batch");
    let settled = entries(&fixture);
    let events = fixture.coordinator.events().len();
    let escrow = fixture.coordinator.escrow().clone();

    for _ in 0..3 {
        let report = fixture.coordinator.run_assignment_batch().expect("rerun");
        assert!(report.is_empty());
        assert_eq!(report.batch, 1);
    }

    assert_eq!(entries(&fixture), settled);
    assert_eq!(fixture.coordinator.events().len(), events);
    assert_eq!(fixture.coordinator.escrow(), &escrow);
}

#[test]
fn successive_batches_only_touch_new_entries() {
    let mut fixture = Fixture::default();
    populate(&mut fixture, 11, 12, 10);
    fixture.coordinator.run_assignment_batch().expect("first batch");
    let first = entries(&fixture);

    populate(&mut fixture, 12, 4, 10);
    let report = fixture.coordinator.run_assignment_batch().expect("second batch");

    assert_eq!(report.batch, 2);
    assert_eq!(report.assigned + report.unassigned, 10);
    let now = entries(&fixture);
    assert_eq!(&now[..first.len()], first.as_slice());
    assert!(now[first.len()..]
        .iter()
        .all(|e| e.resolution.map(|r| r.batch) == Some(2)));
    assert_books_consistent(&fixture.coordinator);
}
