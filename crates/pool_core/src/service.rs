//! Thread-safe handle over a [`Coordinator`].
//!
//! Submissions and direct bookings take the write lock briefly. A batch
//! snapshots under the read lock, plans with no lock held and settles under
//! the write lock; anything that changed in between is caught by settlement's
//! capacity re-check. Batches are serialised by their own mutex.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::coordinator::Coordinator;
use crate::error::CoordinationResult;
use crate::ledger::Ride;
use crate::route::RouteKey;
use crate::settlement::BatchReport;
use crate::types::{Amount, ParticipantId, RideId, TimeSlot, WaitlistIndex};
use crate::waitlist::WaitlistEntry;

#[derive(Clone)]
pub struct SharedCoordinator {
    inner: Arc<RwLock<Coordinator>>,
    batch: Arc<Mutex<()>>,
}

impl SharedCoordinator {
    pub fn new(coordinator: Coordinator) -> Self {
        Self {
            inner: Arc::new(RwLock::new(coordinator)),
            batch: Arc::new(Mutex::new(())),
        }
    }

    // Settlement swaps in a finished copy, so a poisoned lock still guards consistent books.
    fn read(&self) -> RwLockReadGuard<'_, Coordinator> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Coordinator> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn batch_guard(&self) -> MutexGuard<'_, ()> {
        self.batch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with shared access to the coordinator.
    pub fn with<R>(&self, f: impl FnOnce(&Coordinator) -> R) -> R {
        f(&self.read())
    }

    /// Run `f` with exclusive access to the coordinator.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Coordinator) -> R) -> R {
        f(&mut self.write())
    }

    pub fn submit_coordination_request(
        &self,
        passenger: ParticipantId,
        route: RouteKey,
        requested: TimeSlot,
        deposit: Amount,
    ) -> CoordinationResult<WaitlistIndex> {
        self.write()
            .submit_coordination_request(passenger, route, requested, deposit)
    }

    pub fn join_ride(&self, passenger: ParticipantId, ride: RideId, payment: Amount) -> CoordinationResult<()> {
        self.write().join_ride(passenger, ride, payment)
    }

    pub fn withdraw(&self, participant: ParticipantId) -> CoordinationResult<Amount> {
        self.write().withdraw(participant)
    }

    pub fn get_ride(&self, ride: RideId) -> CoordinationResult<Ride> {
        self.read().get_ride(ride).cloned()
    }

    pub fn get_waitlist_entry(&self, index: WaitlistIndex) -> CoordinationResult<WaitlistEntry> {
        self.read().get_waitlist_entry(index).cloned()
    }

    pub fn run_assignment_batch(&self) -> CoordinationResult<BatchReport> {
        self.run_assignment_batch_with(|| {})
    }

    /// Like [`SharedCoordinator::run_assignment_batch`], calling `between`
    /// after planning and before settling, with no lock held.
    pub fn run_assignment_batch_with(&self, between: impl FnOnce()) -> CoordinationResult<BatchReport> {
        let _batch = self.batch_guard();

        let snapshot = self.read().snapshot();
        if snapshot.is_empty() {
            return Ok(BatchReport {
                batch: snapshot.batch - 1,
                ..BatchReport::default()
            });
        }
        debug!(batch = snapshot.batch, entries = snapshot.entries(), "planning outside the lock");
        let plan = snapshot.plan()?;
        between();

        self.write().apply_plan(&plan, snapshot.batch)
    }
}
