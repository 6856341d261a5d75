use tracing::debug;

use crate::config::ScaleLimits;
use crate::waitlist::UnassignedReason;

use super::problem::TransportProblem;
use super::types::{BucketAssignment, BucketSnapshot, Placement};
use super::MatchingError;

/// Exact solver for one route bucket.
///
/// Implementations return, per entry in index order, the column of the ride
/// it is seated on. The result must seat as many entries as possible, then
/// minimise total deviation, then be the lexicographically smallest such
/// vector (lower ride column first, `None` after every ride).
pub trait AssignmentAlgorithm: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, problem: &TransportProblem) -> Result<Vec<Option<usize>>, MatchingError>;

    /// Solve a bucket snapshot end to end. The default validates the solver's
    /// choice vector and attaches unassigned reasons.
    fn assign_bucket(
        &self,
        bucket: &BucketSnapshot,
        limits: &ScaleLimits,
    ) -> Result<BucketAssignment, MatchingError> {
        assign_bucket_with(self, bucket, limits)
    }
}

pub fn assign_bucket_with<A: AssignmentAlgorithm + ?Sized>(
    algorithm: &A,
    bucket: &BucketSnapshot,
    limits: &ScaleLimits,
) -> Result<BucketAssignment, MatchingError> {
    if bucket.rides.is_empty() {
        return Ok(BucketAssignment {
            route: bucket.route,
            placements: bucket
                .demand
                .iter()
                .map(|d| (d.index, Placement::Unassigned(UnassignedReason::NoRideOnRoute)))
                .collect(),
            total_cost: 0,
            assigned: 0,
        });
    }

    let problem = TransportProblem::from_bucket(bucket, limits)?;
    let choice = if problem.entries() == 0 {
        Vec::new()
    } else {
        algorithm.solve(&problem)?
    };
    let (assigned, total_cost) = problem.evaluate(&choice)?;

    let placements = bucket
        .demand
        .iter()
        .zip(&choice)
        .enumerate()
        .map(|(row, (demand, column))| {
            let placement = match *column {
                Some(col) => Placement::Assigned {
                    ride: bucket.rides[col].ride,
                    cost: problem.cost(row, col).unwrap_or_default(),
                },
                None if problem.has_feasible_ride(row) => {
                    Placement::Unassigned(UnassignedReason::CapacityExhausted)
                }
                None => Placement::Unassigned(UnassignedReason::NoAffordableRide),
            };
            (demand.index, placement)
        })
        .collect();

    debug!(
        route = %bucket.route,
        algorithm = algorithm.name(),
        entries = bucket.demand.len(),
        rides = bucket.rides.len(),
        assigned,
        total_cost,
        "bucket solved"
    );

    Ok(BucketAssignment {
        route: bucket.route,
        placements,
        total_cost,
        assigned,
    })
}
