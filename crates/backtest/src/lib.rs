//! Deterministic replay of recorded snapshots against simulated execution.

pub mod data_provider;
pub mod execution;
pub mod loaders;

pub use data_provider::HistoricalSnapshotProvider;
pub use execution::{ScheduledEvent, SimulatedExecutionHandler};
pub use optcycle_core::CONTRACT_MULTIPLIER;
pub use loaders::{load_chains, load_schedule};
