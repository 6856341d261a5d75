//! Funds custody.
//!
//! Every unit taken in sits in exactly one of three places until it is
//! withdrawn: a pending waitlist deposit, a ride's revenue (owed to the
//! driver once the ride completes), or a participant's withdrawable balance.
//!
//! # Critical Invariants
//!
//! - `custody == held_deposits + Σ ride_revenue + Σ balances`
//! - A balance is zeroed when paid out, so it cannot be withdrawn twice

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Amount, ParticipantId, RideId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EscrowError {
    #[error("deposit {deposit} does not cover seat price {price}")]
    InsufficientDeposit { deposit: Amount, price: Amount },

    #[error("{0} has nothing to withdraw")]
    NothingToWithdraw(ParticipantId),

    #[error("balance overflow")]
    BalanceOverflow,

    #[error("held deposits {held} cannot cover {requested}")]
    CustodyUnderflow { held: Amount, requested: Amount },
}

/// Seat charge applied to a deposit at settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatCharge {
    pub ride: RideId,
    pub price: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    custody: Amount,
    held_deposits: Amount,
    ride_revenue: BTreeMap<RideId, Amount>,
    balances: BTreeMap<ParticipantId, Amount>,
    withdrawn: Amount,
}

impl Escrow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take custody of a coordination deposit.
    pub fn hold_deposit(&mut self, amount: Amount) -> Result<(), EscrowError> {
        let custody = checked_add(self.custody, amount)?;
        let held = checked_add(self.held_deposits, amount)?;
        self.custody = custody;
        self.held_deposits = held;
        Ok(())
    }

    /// Take custody of a direct-booking fare; it becomes revenue of `ride`.
    pub fn collect_fare(&mut self, ride: RideId, amount: Amount) -> Result<(), EscrowError> {
        let custody = checked_add(self.custody, amount)?;
        let revenue = checked_add(self.revenue_of(ride), amount)?;
        self.custody = custody;
        self.ride_revenue.insert(ride, revenue);
        Ok(())
    }

    /// Split a held deposit into seat revenue and a refund credited to `passenger`.
    ///
    /// Returns the refund. Nothing changes on error.
    pub fn settle_deposit(
        &mut self,
        passenger: ParticipantId,
        deposit: Amount,
        charge: Option<SeatCharge>,
    ) -> Result<Amount, EscrowError> {
        if deposit > self.held_deposits {
            return Err(EscrowError::CustodyUnderflow {
                held: self.held_deposits,
                requested: deposit,
            });
        }
        let price = charge.map_or(0, |c| c.price);
        let refund = deposit
            .checked_sub(price)
            .ok_or(EscrowError::InsufficientDeposit { deposit, price })?;
        let balance = checked_add(self.balance_of(passenger), refund)?;
        let revenue = match charge {
            Some(c) => Some((c.ride, checked_add(self.revenue_of(c.ride), price)?)),
            None => None,
        };

        self.held_deposits -= deposit;
        if let Some((ride, total)) = revenue {
            self.ride_revenue.insert(ride, total);
        }
        if refund > 0 {
            self.balances.insert(passenger, balance);
        }
        Ok(refund)
    }

    /// Move the revenue of a completed ride to its driver's balance.
    pub fn release_revenue(&mut self, ride: RideId, driver: ParticipantId) -> Result<Amount, EscrowError> {
        let revenue = self.revenue_of(ride);
        if revenue == 0 {
            return Ok(0);
        }
        let balance = checked_add(self.balance_of(driver), revenue)?;
        self.ride_revenue.remove(&ride);
        self.balances.insert(driver, balance);
        Ok(revenue)
    }

    /// Pay out the participant's whole balance.
    pub fn withdraw(&mut self, participant: ParticipantId) -> Result<Amount, EscrowError> {
        let amount = self
            .balances
            .remove(&participant)
            .filter(|amount| *amount > 0)
            .ok_or(EscrowError::NothingToWithdraw(participant))?;
        self.custody -= amount;
        self.withdrawn += amount;
        Ok(amount)
    }

    pub fn balance_of(&self, participant: ParticipantId) -> Amount {
        self.balances.get(&participant).copied().unwrap_or(0)
    }

    pub fn revenue_of(&self, ride: RideId) -> Amount {
        self.ride_revenue.get(&ride).copied().unwrap_or(0)
    }

    pub fn custody(&self) -> Amount {
        self.custody
    }

    pub fn held_deposits(&self) -> Amount {
        self.held_deposits
    }

    pub fn withdrawn(&self) -> Amount {
        self.withdrawn
    }

    /// Checks the custody identity. Holds after every public operation.
    pub fn is_balanced(&self) -> bool {
        let revenue: u128 = self.ride_revenue.values().map(|v| u128::from(*v)).sum();
        let balances: u128 = self.balances.values().map(|v| u128::from(*v)).sum();
        u128::from(self.custody) == u128::from(self.held_deposits) + revenue + balances
    }
}

fn checked_add(a: Amount, b: Amount) -> Result<Amount, EscrowError> {
    a.checked_add(b).ok_or(EscrowError::BalanceOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSENGER: ParticipantId = ParticipantId(7);
    const DRIVER: ParticipantId = ParticipantId(1);

    #[test]
    fn assigned_deposit_splits_into_revenue_and_refund() {
        let mut escrow = Escrow::new();
        escrow.hold_deposit(20).expect("hold");

        let refund = escrow
            .settle_deposit(
                PASSENGER,
                20,
                Some(SeatCharge {
                    ride: RideId(0),
                    price: 10,
                }),
            )
            .expect("settle");

        assert_eq!(refund, 10);
        assert_eq!(escrow.balance_of(PASSENGER), 10);
        assert_eq!(escrow.revenue_of(RideId(0)), 10);
        assert_eq!(escrow.held_deposits(), 0);
        assert!(escrow.is_balanced());
    }

    #[test]
    fn unassigned_deposit_is_refunded_in_full() {
        let mut escrow = Escrow::new();
        escrow.hold_deposit(15).expect("hold");
        let refund = escrow.settle_deposit(PASSENGER, 15, None).expect("settle");
        assert_eq!(refund, 15);
        assert_eq!(escrow.balance_of(PASSENGER), 15);
        assert!(escrow.is_balanced());
    }

    #[test]
    fn short_deposit_leaves_state_untouched() {
        let mut escrow = Escrow::new();
        escrow.hold_deposit(5).expect("hold");
        let before = escrow.clone();
        assert_eq!(
            escrow.settle_deposit(
                PASSENGER,
                5,
                Some(SeatCharge {
                    ride: RideId(0),
                    price: 10,
                }),
            ),
            Err(EscrowError::InsufficientDeposit {
                deposit: 5,
                price: 10,
            })
        );
        assert_eq!(escrow, before);
    }

    #[test]
    fn withdrawal_zeroes_the_balance() {
        let mut escrow = Escrow::new();
        escrow.hold_deposit(12).expect("hold");
        escrow.settle_deposit(PASSENGER, 12, None).expect("settle");

        assert_eq!(escrow.withdraw(PASSENGER), Ok(12));
        assert_eq!(
            escrow.withdraw(PASSENGER),
            Err(EscrowError::NothingToWithdraw(PASSENGER))
        );
        assert_eq!(escrow.custody(), 0);
        assert_eq!(escrow.withdrawn(), 12);
        assert!(escrow.is_balanced());
    }

    #[test]
    fn revenue_reaches_driver_only_on_release() {
        let mut escrow = Escrow::new();
        escrow.collect_fare(RideId(0), 10).expect("fare");
        escrow.collect_fare(RideId(0), 10).expect("fare");
        assert_eq!(escrow.balance_of(DRIVER), 0);

        assert_eq!(escrow.release_revenue(RideId(0), DRIVER), Ok(20));
        assert_eq!(escrow.balance_of(DRIVER), 20);
        assert_eq!(escrow.revenue_of(RideId(0)), 0);
        assert_eq!(escrow.release_revenue(RideId(0), DRIVER), Ok(0));
        assert!(escrow.is_balanced());
    }

    #[test]
    fn cannot_settle_more_than_is_held() {
        let mut escrow = Escrow::new();
        escrow.hold_deposit(3).expect("hold");
        assert_eq!(
            escrow.settle_deposit(PASSENGER, 4, None),
            Err(EscrowError::CustodyUnderflow {
                held: 3,
                requested: 4,
            })
        );
    }
}
