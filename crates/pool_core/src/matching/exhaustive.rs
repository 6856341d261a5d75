//! Brute-force reference solver.
//!
//! Enumerates choice vectors in lexicographic order (ride 0 first, waiting
//! last) and keeps the first one that beats the incumbent strictly, so the
//! survivor is the lexicographically smallest optimum by construction.
//! Exponential; only for tiny buckets and as an oracle in tests.

use super::algorithm::AssignmentAlgorithm;
use super::problem::{ScaleDimension, TransportProblem};
use super::MatchingError;

pub const DEFAULT_MAX_ENTRIES: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct ExhaustiveAssignment {
    max_entries: usize,
}

impl ExhaustiveAssignment {
    pub fn new(max_entries: usize) -> Self {
        Self { max_entries }
    }
}

impl Default for ExhaustiveAssignment {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

struct Best {
    seated: usize,
    cost: u64,
    choice: Vec<Option<usize>>,
}

struct Search<'a> {
    problem: &'a TransportProblem,
    used: Vec<usize>,
    current: Vec<Option<usize>>,
    best: Option<Best>,
}

impl Search<'_> {
    fn visit(&mut self, entry: usize, seated: usize, cost: u64) -> Result<(), MatchingError> {
        let remaining = self.problem.entries() - entry;
        if let Some(best) = &self.best {
            let reachable = seated + remaining;
            if reachable < best.seated || (reachable == best.seated && cost >= best.cost) {
                return Ok(());
            }
        }
        if remaining == 0 {
            self.best = Some(Best {
                seated,
                cost,
                choice: self.current.clone(),
            });
            return Ok(());
        }

        for ride in 0..self.problem.rides() {
            let Some(step) = self.problem.cost(entry, ride) else { continue };
            if self.used[ride] >= self.problem.capacity(ride) {
                continue;
            }
            let total = cost.checked_add(step).ok_or(MatchingError::ComputationOverflow {
                route: self.problem.route(),
            })?;
            self.used[ride] += 1;
            self.current[entry] = Some(ride);
            self.visit(entry + 1, seated + 1, total)?;
            self.current[entry] = None;
            self.used[ride] -= 1;
        }
        self.visit(entry + 1, seated, cost)
    }
}

impl AssignmentAlgorithm for ExhaustiveAssignment {
    fn name(&self) -> &'static str {
        "exhaustive"
    }

    fn solve(&self, problem: &TransportProblem) -> Result<Vec<Option<usize>>, MatchingError> {
        if problem.entries() > self.max_entries {
            return Err(MatchingError::ScaleExceeded {
                route: problem.route(),
                dimension: ScaleDimension::Entries,
                size: problem.entries(),
                limit: self.max_entries,
            });
        }
        let mut search = Search {
            problem,
            used: vec![0; problem.rides()],
            current: vec![None; problem.entries()],
            best: None,
        };
        search.visit(0, 0, 0)?;
        Ok(search
            .best
            .map(|b| b.choice)
            .unwrap_or_else(|| vec![None; problem.entries()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteKey;

    #[test]
    fn finds_lexicographically_first_optimum() {
        let p = TransportProblem::new(
            RouteKey::from((0, 1)),
            vec![vec![Some(2), Some(2)], vec![Some(2), Some(2)]],
            vec![1, 1],
        )
        .expect("problem");
        assert_eq!(
            ExhaustiveAssignment::default().solve(&p),
            Ok(vec![Some(0), Some(1)])
        );
    }

    #[test]
    fn refuses_large_buckets() {
        let p = TransportProblem::new(RouteKey::from((0, 1)), vec![vec![Some(1)]; 3], vec![3])
            .expect("problem");
        assert!(matches!(
            ExhaustiveAssignment::new(2).solve(&p),
            Err(MatchingError::ScaleExceeded { size: 3, limit: 2, .. })
        ));
    }
}
