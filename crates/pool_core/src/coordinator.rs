//! The coordination façade: registration, direct booking, the ride
//! lifecycle, the waitlist and batch assignment over one set of books.
//!
//! A batch runs in three phases so that callers holding the coordinator
//! behind a lock can release it while the engine works:
//!
//! 1. [`Coordinator::snapshot`] copies every pending bucket,
//! 2. [`BatchSnapshot::plan`] solves the buckets (no access to the books),
//! 3. [`Coordinator::apply_plan`] settles the plan on a copy of the books
//!    and swaps it in only if every entry settles.

use std::sync::Arc;

use bevy_ecs::prelude::Resource;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::CoordinatorConfig;
use crate::error::{CoordinationError, CoordinationResult};
use crate::escrow::Escrow;
use crate::events::{CoordinationEvent, EventLog};
use crate::ledger::{LedgerError, Ride, RideLedger, RideStatus};
use crate::matching::{AssignmentAlgorithm, BucketSnapshot, MatchingError};
use crate::registry::{MemberRegistry, ParticipantRegistry, Role};
use crate::route::RouteKey;
use crate::settlement::{apply_plan, BatchPlan, BatchReport, Books};
use crate::types::{Amount, ParticipantId, RideId, TimeSlot, WaitlistIndex};
use crate::waitlist::{WaitlistEntry, WaitlistError, WaitlistStore};

/// Everything a batch needs to plan without touching the books.
#[derive(Clone)]
pub struct BatchSnapshot {
    pub batch: u64,
    pub buckets: Vec<BucketSnapshot>,
    algorithm: Arc<dyn AssignmentAlgorithm>,
    config: CoordinatorConfig,
}

impl BatchSnapshot {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn entries(&self) -> usize {
        self.buckets.iter().map(|b| b.demand.len()).sum()
    }

    /// Solve every bucket. Buckets are independent, so they may run on the
    /// rayon pool; the plan keeps route order either way.
    pub fn plan(&self) -> Result<BatchPlan, MatchingError> {
        let limits = self.config.limits;
        let solve = |bucket: &BucketSnapshot| self.algorithm.assign_bucket(bucket, &limits);
        let buckets = if self.config.parallel_buckets {
            self.buckets.par_iter().map(solve).collect::<Result<Vec<_>, _>>()?
        } else {
            self.buckets.iter().map(solve).collect::<Result<Vec<_>, _>>()?
        };
        Ok(BatchPlan { buckets })
    }
}

#[derive(Resource)]
pub struct Coordinator {
    books: Books,
    config: CoordinatorConfig,
    algorithm: Arc<dyn AssignmentAlgorithm>,
    events: EventLog,
    batches: u64,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            books: Books::default(),
            config,
            algorithm: Arc::from(config.algorithm.build()),
            events: EventLog::new(),
            batches: 0,
        }
    }

    /// Replace the configured engine, e.g. with an instrumented one.
    pub fn with_algorithm(mut self, algorithm: Arc<dyn AssignmentAlgorithm>) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    // --- registration ---

    pub fn register_driver(&mut self, participant: ParticipantId) -> CoordinationResult<()> {
        self.books.registry.register_driver(participant)?;
        debug!(%participant, "driver registered");
        Ok(())
    }

    pub fn register_passenger(&mut self, participant: ParticipantId) -> CoordinationResult<()> {
        self.books.registry.register_passenger(participant)?;
        debug!(%participant, "passenger registered");
        Ok(())
    }

    // --- rides ---

    pub fn create_ride(
        &mut self,
        driver: ParticipantId,
        departure: TimeSlot,
        seats: u32,
        price: Amount,
        route: RouteKey,
    ) -> CoordinationResult<RideId> {
        self.books.registry.require(driver, Role::Driver)?;
        let ride = self
            .books
            .ledger
            .create_ride(driver, departure, seats, price, route)?;
        self.books.registry.set_has_ride(driver, Role::Driver, true);
        info!(%ride, %driver, %route, departure, seats, price, "ride created");
        self.events.push(CoordinationEvent::RideCreated {
            ride,
            driver,
            route,
            departure,
            seats,
            price,
        });
        Ok(ride)
    }

    /// Book a seat directly, paying exactly the ride's price.
    pub fn join_ride(
        &mut self,
        passenger: ParticipantId,
        ride: RideId,
        payment: Amount,
    ) -> CoordinationResult<()> {
        self.books.registry.require(passenger, Role::Passenger)?;
        let current = self.books.ledger.get(ride)?;
        if current.status != RideStatus::BookingOpen {
            return Err(LedgerError::InvalidRideStatus {
                ride,
                status: current.status,
            }
            .into());
        }
        if payment != current.price {
            return Err(CoordinationError::IncorrectPayment {
                ride,
                expected: current.price,
                paid: payment,
            });
        }

        self.books.escrow.collect_fare(ride, payment)?;
        self.books.ledger.seat_passenger(ride, passenger)?;
        self.books
            .registry
            .set_has_ride(passenger, Role::Passenger, true);
        debug!(%ride, %passenger, payment, "passenger joined");
        self.events.push(CoordinationEvent::PassengerJoined {
            ride,
            passenger,
            paid: payment,
        });
        Ok(())
    }

    pub fn start_ride(&mut self, driver: ParticipantId, ride: RideId) -> CoordinationResult<()> {
        self.books.ledger.start(ride, driver)?;
        info!(%ride, "ride started");
        self.events.push(CoordinationEvent::RideStarted { ride });
        Ok(())
    }

    /// Complete a started ride and release its escrowed revenue to the driver.
    pub fn complete_ride(&mut self, driver: ParticipantId, ride: RideId) -> CoordinationResult<Amount> {
        let mut escrow = self.books.escrow.clone();
        let revenue = escrow.release_revenue(ride, driver)?;
        let completed = self.books.ledger.complete(ride, driver)?;
        let passengers = completed.passengers.clone();
        self.books.escrow = escrow;

        self.books.registry.set_has_ride(driver, Role::Driver, false);
        for passenger in passengers {
            self.books
                .registry
                .set_has_ride(passenger, Role::Passenger, false);
        }
        info!(%ride, %driver, revenue, "ride completed");
        self.events.push(CoordinationEvent::RideCompleted {
            ride,
            driver,
            revenue,
        });
        Ok(revenue)
    }

    pub fn get_ride(&self, ride: RideId) -> CoordinationResult<&Ride> {
        Ok(self.books.ledger.get(ride)?)
    }

    pub fn find_rides(&self, route: RouteKey) -> Vec<RideId> {
        self.books.ledger.find_rides(route)
    }

    // --- coordinated booking ---

    /// Deposit funds and join the waitlist for `route`.
    pub fn submit_coordination_request(
        &mut self,
        passenger: ParticipantId,
        route: RouteKey,
        requested: TimeSlot,
        deposit: Amount,
    ) -> CoordinationResult<WaitlistIndex> {
        self.books.registry.require(passenger, Role::Passenger)?;
        if deposit == 0 {
            return Err(WaitlistError::InvalidDeposit.into());
        }
        self.books.escrow.hold_deposit(deposit)?;
        let index = self
            .books
            .waitlist
            .submit(passenger, route, requested, deposit)?;
        debug!(%index, %passenger, %route, requested, deposit, "coordination requested");
        self.events.push(CoordinationEvent::CoordinationRequested {
            index,
            passenger,
            route,
            requested,
            deposit,
        });
        Ok(index)
    }

    pub fn get_waitlist_entry(&self, index: WaitlistIndex) -> CoordinationResult<&WaitlistEntry> {
        Ok(self.books.waitlist.get(index)?)
    }

    /// Copy every pending bucket for the next batch.
    pub fn snapshot(&self) -> BatchSnapshot {
        BatchSnapshot {
            batch: self.batches + 1,
            buckets: self.books.snapshot_buckets(),
            algorithm: Arc::clone(&self.algorithm),
            config: self.config,
        }
    }

    /// Settle a plan computed from [`Coordinator::snapshot`]. Either every
    /// entry of the plan is resolved or nothing changes.
    pub fn apply_plan(&mut self, plan: &BatchPlan, batch: u64) -> CoordinationResult<BatchReport> {
        let mut books = self.books.clone();
        let settlement = apply_plan(&mut books, plan, batch)?;
        self.books = books;
        self.batches = batch;
        self.events.extend(settlement.events);

        let report = settlement.report;
        info!(
            batch,
            buckets = report.buckets,
            assigned = report.assigned,
            unassigned = report.unassigned,
            recovered = report.recovered,
            total_cost = report.total_cost,
            "assignment batch settled"
        );
        Ok(report)
    }

    /// Run one full batch over every pending entry. With nothing pending this
    /// is a no-op and the batch counter does not move.
    pub fn run_assignment_batch(&mut self) -> CoordinationResult<BatchReport> {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return Ok(BatchReport {
                batch: self.batches,
                ..BatchReport::default()
            });
        }
        let plan = snapshot.plan()?;
        self.apply_plan(&plan, snapshot.batch)
    }

    // --- funds ---

    pub fn withdraw(&mut self, participant: ParticipantId) -> CoordinationResult<Amount> {
        let amount = self.books.escrow.withdraw(participant)?;
        info!(%participant, amount, "funds withdrawn");
        self.events
            .push(CoordinationEvent::FundsWithdrawn { participant, amount });
        Ok(amount)
    }

    pub fn balance_of(&self, participant: ParticipantId) -> Amount {
        self.books.escrow.balance_of(participant)
    }

    // --- read access ---

    pub fn events(&self) -> &[CoordinationEvent] {
        self.events.as_slice()
    }

    pub fn event_log(&self) -> &EventLog {
        &self.events
    }

    pub fn batches_run(&self) -> u64 {
        self.batches
    }

    pub fn registry(&self) -> &MemberRegistry {
        &self.books.registry
    }

    pub fn ledger(&self) -> &RideLedger {
        &self.books.ledger
    }

    pub fn waitlist(&self) -> &WaitlistStore {
        &self.books.waitlist
    }

    pub fn escrow(&self) -> &Escrow {
        &self.books.escrow
    }
}
