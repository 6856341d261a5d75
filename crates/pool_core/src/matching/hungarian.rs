//! Hungarian (Kuhn-Munkres) solver for the seat transportation problem.
//!
//! Each ride contributes one column per remaining seat, followed by one
//! "stay on the waitlist" column per entry, so rows never outnumber columns.
//! A feasible seat weighs `MATCH_BONUS - deviation`, a waitlist column 0.
//! `MATCH_BONUS` exceeds the largest possible total deviation, so seating one
//! more entry always beats any cost saving. The maximum-weight assignment
//! is then refined to the lexicographically smallest optimum.

use pathfinding::kuhn_munkres::{kuhn_munkres, Weights};

use super::algorithm::AssignmentAlgorithm;
use super::problem::TransportProblem;
use super::refine::refine_lexicographically;
use super::MatchingError;

/// Dense weight matrix implementing pathfinding's `Weights` for i64.
struct SeatWeights(Vec<Vec<i64>>);

impl Weights<i64> for SeatWeights {
    fn rows(&self) -> usize {
        self.0.len()
    }

    fn columns(&self) -> usize {
        self.0.first().map_or(0, |r| r.len())
    }

    fn at(&self, row: usize, col: usize) -> i64 {
        self.0[row][col]
    }

    fn neg(&self) -> Self {
        SeatWeights(
            self.0
                .iter()
                .map(|r| r.iter().map(|&x| x.saturating_neg()).collect())
                .collect(),
        )
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HungarianAssignment;

impl HungarianAssignment {
    pub fn new() -> Self {
        Self
    }

    /// Seat-expanded weight matrix plus the ride owning each seat column.
    fn seat_weights(problem: &TransportProblem) -> Result<(SeatWeights, Vec<usize>), MatchingError> {
        let overflow = || MatchingError::ComputationOverflow {
            route: problem.route(),
        };
        let entries = problem.entries();
        let bonus = problem
            .max_cost()
            .checked_mul(entries as u64)
            .and_then(|c| c.checked_add(1))
            .and_then(|c| i64::try_from(c).ok())
            .ok_or_else(overflow)?;
        // Worse than the free waitlist column every row can fall back to.
        let infeasible = -bonus;

        let seat_owner: Vec<usize> = (0..problem.rides())
            .flat_map(|ride| std::iter::repeat(ride).take(problem.capacity(ride)))
            .collect();

        let mut matrix = Vec::with_capacity(entries);
        for entry in 0..entries {
            let mut row = Vec::with_capacity(seat_owner.len() + entries);
            for &ride in &seat_owner {
                let weight = match problem.cost(entry, ride) {
                    Some(cost) => bonus - i64::try_from(cost).map_err(|_| overflow())?,
                    None => infeasible,
                };
                row.push(weight);
            }
            row.extend(std::iter::repeat(0).take(entries));
            matrix.push(row);
        }
        Ok((SeatWeights(matrix), seat_owner))
    }
}

impl AssignmentAlgorithm for HungarianAssignment {
    fn name(&self) -> &'static str {
        "hungarian"
    }

    fn solve(&self, problem: &TransportProblem) -> Result<Vec<Option<usize>>, MatchingError> {
        let entries = problem.entries();
        if entries == 0 {
            return Ok(Vec::new());
        }

        let (weights, seat_owner) = Self::seat_weights(problem)?;
        let (_total, columns) = kuhn_munkres(&weights);

        let mut choice: Vec<Option<usize>> = columns
            .iter()
            .enumerate()
            .map(|(entry, &col)| {
                seat_owner
                    .get(col)
                    .copied()
                    .filter(|&ride| problem.cost(entry, ride).is_some())
            })
            .collect();

        refine_lexicographically(problem, &mut choice)?;
        Ok(choice)
    }
}
