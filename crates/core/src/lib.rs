pub mod config;
pub mod config_loader;
pub mod engine;
pub mod events;
pub mod metrics_formatter;
pub mod position;
pub mod traits;
pub mod types;

pub use config::{
    AuxiliaryConfig, BridgeConfig, FailurePolicy, LegConfig, RunConfig, RunWindow, RuntimeKind,
    UnderlyingConfig,
};
pub use config_loader::ConfigLoader;
pub use engine::{RunSummary, TradingSystem};
pub use metrics_formatter::SummaryFormatter;
pub use events::{ExecutionReport, FillEvent, FillKind, MarketSnapshot, OrderIntent};
pub use position::{Position, PositionBook};
pub use traits::{ExecutionHandler, SnapshotProvider, Strategy};
pub use types::{
    ContractError, OptionContract, Resolution, Right, Symbol, Underlying, CONTRACT_MULTIPLIER,
};
