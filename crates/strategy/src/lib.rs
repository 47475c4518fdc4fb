//! The trading side of an option-writing cycle.
//!
//! [`setup::build_controller`] resolves configured legs against the option
//! chain once, then [`PositionLifecycleController`] decides on every snapshot
//! whether to open positions, wait, or hold.

pub mod auxiliary;
pub mod lifecycle;
pub mod setup;

pub use auxiliary::AuxiliaryComputation;
pub use lifecycle::{
    LifecycleError, LifecycleState, PositionLifecycleController, SnapshotDecision,
    SnapshotOutcome, TrackedLeg,
};
pub use setup::{bridge_from_config, build_controller, build_controller_with_bridge, SetupError};
