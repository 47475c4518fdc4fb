use crate::events::ExecutionReport;
use crate::position::PositionBook;
use crate::traits::{ExecutionHandler, SnapshotProvider, Strategy};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Counters collected over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub snapshots_processed: usize,
    pub intents_emitted: usize,
    pub fills_applied: usize,
    pub rejections: usize,
    /// Snapshots on which the strategy emitted at least one intent.
    pub engagement_cycles: usize,
    /// Cash, net of every commission paid.
    pub realized_pnl: Decimal,
}

/// Wires a snapshot source, a strategy and an execution collaborator.
///
/// The system owns the `PositionBook` on behalf of the execution side:
/// reports are applied before each snapshot reaches the strategy, so
/// fills of intents emitted on cycle N show up on cycle N+1 at the earliest.
pub struct TradingSystem<D, E, S>
where
    D: SnapshotProvider,
    E: ExecutionHandler,
    S: Strategy,
{
    data_provider: D,
    execution_handler: E,
    strategy: S,
    positions: PositionBook,
    last_timestamp: Option<DateTime<Utc>>,
}

impl<D, E, S> TradingSystem<D, E, S>
where
    D: SnapshotProvider,
    E: ExecutionHandler,
    S: Strategy,
{
    pub fn new(data_provider: D, execution_handler: E, strategy: S) -> Self {
        Self {
            data_provider,
            execution_handler,
            strategy,
            positions: PositionBook::new(),
            last_timestamp: None,
        }
    }

    /// Runs until the provider is exhausted.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a collaborator or the strategy,
    /// or if the provider delivers a snapshot older than the previous one.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        while let Some(snapshot) = self.data_provider.next_snapshot().await? {
            if let Some(last) = self.last_timestamp {
                anyhow::ensure!(
                    snapshot.timestamp >= last,
                    "Snapshot at {} delivered after {}",
                    snapshot.timestamp,
                    last
                );
            }
            self.last_timestamp = Some(snapshot.timestamp);

            for report in self.execution_handler.poll_reports(&snapshot).await? {
                match &report {
                    ExecutionReport::Fill(fill) => {
                        summary.realized_pnl += self.positions.apply_fill(fill);
                        summary.fills_applied += 1;
                        tracing::info!(
                            symbol = %fill.symbol,
                            quantity = %fill.quantity,
                            price = %fill.price,
                            kind = ?fill.kind,
                            "Fill applied"
                        );
                    }
                    ExecutionReport::Rejected { symbol, reason, .. } => {
                        summary.rejections += 1;
                        tracing::warn!(symbol = %symbol, reason, "Order rejected");
                    }
                }
                self.strategy.on_execution_report(&report);
            }

            let intents = self.strategy.on_snapshot(&snapshot, &self.positions)?;
            summary.snapshots_processed += 1;
            if !intents.is_empty() {
                summary.engagement_cycles += 1;
            }

            for intent in intents {
                tracing::info!(
                    strategy = self.strategy.name(),
                    symbol = %intent.symbol,
                    quantity = %intent.quantity,
                    "Submitting order intent"
                );
                summary.intents_emitted += 1;
                self.execution_handler.submit(intent, &snapshot).await?;
            }
        }

        tracing::info!(
            snapshots = summary.snapshots_processed,
            intents = summary.intents_emitted,
            fills = summary.fills_applied,
            cycles = summary.engagement_cycles,
            "Run finished"
        );
        Ok(summary)
    }

    #[must_use]
    pub const fn positions(&self) -> &PositionBook {
        &self.positions
    }

    #[must_use]
    pub const fn strategy(&self) -> &S {
        &self.strategy
    }

    #[must_use]
    pub const fn execution_handler(&self) -> &E {
        &self.execution_handler
    }
}
