//! Telemetry / KPIs: records batch outcomes for analysis.

use bevy_ecs::prelude::Resource;

use crate::settlement::BatchReport;
use crate::types::Amount;

/// One settled batch, stamped with the clock time it ran at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRecord {
    pub timestamp: u64,
    pub report: BatchReport,
}

/// Collects coordination telemetry. Insert as a resource to record batches.
#[derive(Debug, Default, Resource)]
pub struct CoordinationTelemetry {
    pub batches: Vec<BatchRecord>,
    /// Batches that aborted with a fatal error, with the error text.
    pub failed_batches: Vec<(u64, String)>,
    pub submitted_requests: usize,
    pub rejected_requests: usize,
}

impl CoordinationTelemetry {
    pub fn total_assigned(&self) -> usize {
        self.batches.iter().map(|b| b.report.assigned).sum()
    }

    pub fn total_unassigned(&self) -> usize {
        self.batches.iter().map(|b| b.report.unassigned).sum()
    }

    pub fn total_recovered(&self) -> usize {
        self.batches.iter().map(|b| b.report.recovered).sum()
    }

    pub fn total_cost(&self) -> u64 {
        self.batches.iter().map(|b| b.report.total_cost).sum()
    }

    pub fn total_refunded(&self) -> Amount {
        self.batches.iter().map(|b| b.report.refunded).sum()
    }

    /// Share of resolved entries that got a seat; `None` before any entry resolved.
    pub fn fill_rate(&self) -> Option<f64> {
        let resolved = self.total_assigned() + self.total_unassigned();
        (resolved > 0).then(|| self.total_assigned() as f64 / resolved as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_sum_over_batches() {
        let mut telemetry = CoordinationTelemetry::default();
        assert_eq!(telemetry.fill_rate(), None);
        for (assigned, unassigned) in [(3, 1), (1, 3)] {
            telemetry.batches.push(BatchRecord {
                timestamp: 10,
                report: BatchReport {
                    assigned,
                    unassigned,
                    total_cost: 2,
                    ..BatchReport::default()
                },
            });
        }
        assert_eq!(telemetry.total_assigned(), 4);
        assert_eq!(telemetry.total_cost(), 4);
        assert_eq!(telemetry.fill_rate(), Some(0.5));
    }
}
