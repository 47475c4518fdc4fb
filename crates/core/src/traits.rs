use crate::events::{ExecutionReport, MarketSnapshot, OrderIntent};
use crate::position::PositionBook;
use anyhow::Result;
use async_trait::async_trait;

/// Delivers snapshots in non-decreasing timestamp order.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn next_snapshot(&mut self) -> Result<Option<MarketSnapshot>>;
}

/// Execution collaborator: accepts intents, confirms them later.
#[async_trait]
pub trait ExecutionHandler: Send + Sync {
    /// Queue an intent. Confirmation is never delivered within this call.
    async fn submit(&mut self, intent: OrderIntent, snapshot: &MarketSnapshot) -> Result<()>;

    /// Reports that became available by the time of `snapshot`
    /// (fills of earlier intents, rejections, assignments, expiries).
    async fn poll_reports(&mut self, snapshot: &MarketSnapshot) -> Result<Vec<ExecutionReport>>;
}

/// Snapshot-driven decision logic. Processing is synchronous and runs to
/// completion before the next snapshot is delivered.
pub trait Strategy: Send {
    fn on_snapshot(
        &mut self,
        snapshot: &MarketSnapshot,
        positions: &PositionBook,
    ) -> Result<Vec<OrderIntent>>;

    fn on_execution_report(&mut self, report: &ExecutionReport);

    fn name(&self) -> &str;
}
