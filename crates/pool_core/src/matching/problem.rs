//! Dense transportation problem for one route bucket.
//!
//! Rows are waitlist entries in index order, columns are rides in id order.
//! A cell holds the departure deviation, or `None` when the entry's deposit
//! cannot cover the ride's price. Ride capacity is capped at the number of
//! entries, so the seat-expanded form never grows past `rows * columns`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ScaleLimits;
use crate::route::RouteKey;
use crate::types::deviation;

use super::types::BucketSnapshot;
use super::MatchingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleDimension {
    Entries,
    Rides,
    SeatUnits,
}

impl fmt::Display for ScaleDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleDimension::Entries => f.write_str("entries"),
            ScaleDimension::Rides => f.write_str("rides"),
            ScaleDimension::SeatUnits => f.write_str("seat units"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportProblem {
    route: RouteKey,
    costs: Vec<Vec<Option<u64>>>,
    capacities: Vec<usize>,
}

impl TransportProblem {
    /// Build the problem for a bucket, rejecting buckets beyond `limits` and
    /// cost ranges whose sums could overflow the solver's `i64` weights.
    pub fn from_bucket(bucket: &BucketSnapshot, limits: &ScaleLimits) -> Result<Self, MatchingError> {
        let route = bucket.route;
        check_scale(route, ScaleDimension::Entries, bucket.demand.len(), limits.max_bucket_entries)?;
        check_scale(route, ScaleDimension::Rides, bucket.rides.len(), limits.max_bucket_rides)?;

        let costs = bucket
            .demand
            .iter()
            .map(|entry| {
                bucket
                    .rides
                    .iter()
                    .map(|ride| {
                        (entry.deposit >= ride.price).then(|| deviation(entry.requested, ride.departure))
                    })
                    .collect()
            })
            .collect();
        let capacities = bucket.rides.iter().map(|r| r.remaining as usize).collect();

        let problem = Self::new(route, costs, capacities)?;
        check_scale(
            route,
            ScaleDimension::SeatUnits,
            problem.seat_units(),
            limits.max_bucket_seat_units,
        )?;
        Ok(problem)
    }

    /// Build directly from a cost matrix (`costs[entry][ride]`) and per-ride capacities.
    pub fn new(
        route: RouteKey,
        costs: Vec<Vec<Option<u64>>>,
        capacities: Vec<usize>,
    ) -> Result<Self, MatchingError> {
        let rides = capacities.len();
        if costs.iter().any(|row| row.len() != rides) {
            return Err(MatchingError::SolverInconsistent(format!(
                "cost matrix for {route} is not {rides} columns wide"
            )));
        }
        let entries = costs.len();
        let capacities = capacities.into_iter().map(|c| c.min(entries)).collect();
        let problem = Self {
            route,
            costs,
            capacities,
        };
        problem.check_cost_range()?;
        Ok(problem)
    }

    /// Every weight and label the solvers derive stays below
    /// `max_cost * (entries + 1) * (nodes + 1)`; that product must fit in `i64`.
    fn check_cost_range(&self) -> Result<(), MatchingError> {
        let nodes = (self.entries() + self.rides() + 2) as u64;
        let bound = self
            .max_cost()
            .checked_add(1)
            .and_then(|c| c.checked_mul(self.entries() as u64 + 1))
            .and_then(|c| c.checked_mul(nodes + 1))
            .and_then(|c| c.checked_mul(4));
        match bound {
            Some(b) if b <= i64::MAX as u64 => Ok(()),
            _ => Err(MatchingError::ComputationOverflow { route: self.route }),
        }
    }

    pub fn route(&self) -> RouteKey {
        self.route
    }

    pub fn entries(&self) -> usize {
        self.costs.len()
    }

    pub fn rides(&self) -> usize {
        self.capacities.len()
    }

    /// Deviation of `entry` on `ride`; `None` when the pair is infeasible.
    pub fn cost(&self, entry: usize, ride: usize) -> Option<u64> {
        self.costs[entry][ride]
    }

    pub fn capacity(&self, ride: usize) -> usize {
        self.capacities[ride]
    }

    pub fn seat_units(&self) -> usize {
        self.capacities.iter().sum()
    }

    pub fn max_cost(&self) -> u64 {
        self.costs
            .iter()
            .flatten()
            .filter_map(|c| *c)
            .max()
            .unwrap_or(0)
    }

    pub fn has_feasible_ride(&self, entry: usize) -> bool {
        self.costs[entry].iter().any(Option::is_some)
    }

    /// Validate a choice vector and return `(seated, total_cost)`.
    pub fn evaluate(&self, choice: &[Option<usize>]) -> Result<(usize, u64), MatchingError> {
        if choice.len() != self.entries() {
            return Err(MatchingError::SolverInconsistent(format!(
                "{} choices for {} entries",
                choice.len(),
                self.entries()
            )));
        }
        let mut used = vec![0usize; self.rides()];
        let mut seated = 0;
        let mut total: u64 = 0;
        for (entry, ride) in choice.iter().enumerate() {
            let Some(ride) = *ride else { continue };
            let cost = self
                .costs
                .get(entry)
                .and_then(|row| row.get(ride))
                .copied()
                .flatten()
                .ok_or_else(|| {
                    MatchingError::SolverInconsistent(format!(
                        "entry {entry} placed on infeasible ride {ride}"
                    ))
                })?;
            used[ride] += 1;
            if used[ride] > self.capacities[ride] {
                return Err(MatchingError::SolverInconsistent(format!(
                    "ride {ride} over capacity"
                )));
            }
            seated += 1;
            total = total
                .checked_add(cost)
                .ok_or(MatchingError::ComputationOverflow { route: self.route })?;
        }
        Ok((seated, total))
    }
}

fn check_scale(
    route: RouteKey,
    dimension: ScaleDimension,
    size: usize,
    limit: usize,
) -> Result<(), MatchingError> {
    if size > limit {
        return Err(MatchingError::ScaleExceeded {
            route,
            dimension,
            size,
            limit,
        });
    }
    Ok(())
}
