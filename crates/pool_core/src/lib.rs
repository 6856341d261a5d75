pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod escrow;
pub mod events;
pub mod export;
pub mod ledger;
pub mod matching;
pub mod registry;
pub mod route;
pub mod runner;
pub mod scenario;
pub mod service;
pub mod settlement;
pub mod systems;
pub mod telemetry;
pub mod types;
pub mod waitlist;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use config::{AlgorithmKind, CoordinatorConfig, ScaleLimits};
pub use coordinator::Coordinator;
pub use error::{CoordinationError, CoordinationResult};
pub use route::{Location, RouteKey};
pub use service::SharedCoordinator;
pub use settlement::BatchReport;
pub use types::{Amount, ParticipantId, RideId, TimeSlot, WaitlistIndex};
