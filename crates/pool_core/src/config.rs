use serde::{Deserialize, Serialize};

use crate::matching::{AssignmentAlgorithm, ExhaustiveAssignment, HungarianAssignment};

/// Assignment engine used by a coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmKind {
    #[default]
    Hungarian,
    Exhaustive,
}

impl AlgorithmKind {
    pub fn build(self) -> Box<dyn AssignmentAlgorithm> {
        match self {
            AlgorithmKind::Hungarian => Box::new(HungarianAssignment::new()),
            AlgorithmKind::Exhaustive => Box::new(ExhaustiveAssignment::default()),
        }
    }
}

/// Largest bucket the engine accepts. Larger buckets fail with `ScaleExceeded`
/// instead of degrading silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleLimits {
    pub max_bucket_entries: usize,
    pub max_bucket_rides: usize,
    /// Seat units after capping each ride at the bucket's entry count.
    pub max_bucket_seat_units: usize,
}

impl Default for ScaleLimits {
    fn default() -> Self {
        Self {
            max_bucket_entries: 256,
            max_bucket_rides: 128,
            max_bucket_seat_units: 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub algorithm: AlgorithmKind,
    pub limits: ScaleLimits,
    /// Plan route buckets on the rayon pool. Results are identical either way.
    pub parallel_buckets: bool,
}

impl CoordinatorConfig {
    pub fn with_algorithm(mut self, algorithm: AlgorithmKind) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_limits(mut self, limits: ScaleLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Cap the number of waitlist entries per route bucket.
    pub fn with_max_bucket_entries(mut self, entries: usize) -> Self {
        self.limits.max_bucket_entries = entries;
        self
    }

    pub fn with_parallel_buckets(mut self, parallel: bool) -> Self {
        self.parallel_buckets = parallel;
        self
    }
}
