use thiserror::Error;

use crate::escrow::EscrowError;
use crate::ledger::LedgerError;
use crate::matching::MatchingError;
use crate::registry::RegistryError;
use crate::types::{Amount, RideId};
use crate::waitlist::WaitlistError;

/// Error surface of every coordinator operation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoordinationError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Waitlist(#[from] WaitlistError),

    #[error(transparent)]
    Matching(#[from] MatchingError),

    #[error(transparent)]
    Escrow(#[from] EscrowError),

    #[error("{ride} costs {expected}, got {paid}")]
    IncorrectPayment {
        ride: RideId,
        expected: Amount,
        paid: Amount,
    },
}

pub type CoordinationResult<T> = Result<T, CoordinationError>;
