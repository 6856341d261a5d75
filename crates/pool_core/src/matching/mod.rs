pub mod algorithm;
pub mod exhaustive;
pub mod hungarian;
pub mod problem;
mod refine;
pub mod types;

use thiserror::Error;

use crate::route::RouteKey;

pub use algorithm::{assign_bucket_with, AssignmentAlgorithm};
pub use exhaustive::ExhaustiveAssignment;
pub use hungarian::HungarianAssignment;
pub use problem::{ScaleDimension, TransportProblem};
pub use types::{BucketAssignment, BucketSnapshot, Placement, SeatDemand, SeatSupply};

/// Fatal engine failures. Any of them aborts the whole batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatchingError {
    #[error("bucket {route} exceeds supported scale: {size} {dimension} > {limit}")]
    ScaleExceeded {
        route: RouteKey,
        dimension: ScaleDimension,
        size: usize,
        limit: usize,
    },

    #[error("cost computation overflowed on bucket {route}")]
    ComputationOverflow { route: RouteKey },

    #[error("solver produced an inconsistent result: {0}")]
    SolverInconsistent(String),
}
