//! CLI commands for replaying the option-writing cycle.

pub mod backtest;
pub mod compute;

pub use backtest::{run_backtest, validate, BacktestInputs};
pub use compute::compute;
