use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use optcycle_core::{MarketSnapshot, SnapshotProvider, Symbol};

/// Replays recorded snapshots in timestamp order.
pub struct HistoricalSnapshotProvider {
    snapshots: Vec<MarketSnapshot>,
    current_index: usize,
}

impl HistoricalSnapshotProvider {
    /// Snapshots are sorted by timestamp. The sort is stable, so snapshots
    /// sharing a timestamp keep their given order.
    #[must_use]
    pub fn new(mut snapshots: Vec<MarketSnapshot>) -> Self {
        snapshots.sort_by_key(|s| s.timestamp);
        Self {
            snapshots,
            current_index: 0,
        }
    }

    /// Loads price rows from a CSV file.
    ///
    /// Expected header: `timestamp,symbol,price`, where `symbol` is either a
    /// ticker or an option in display form (`GOOG 800P 2016-01-15`). Rows
    /// sharing a timestamp form one snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The CSV file cannot be opened
    /// - A row has fewer than three fields
    /// - Timestamp, symbol or price parsing fails
    pub fn from_csv(path: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open price file {path}"))?;
        let mut grouped: BTreeMap<DateTime<Utc>, MarketSnapshot> = BTreeMap::new();

        for (line, result) in reader.records().enumerate() {
            let record = result?;
            anyhow::ensure!(record.len() >= 3, "Row {} has {} fields", line + 1, record.len());

            let timestamp: DateTime<Utc> = record[0]
                .parse()
                .with_context(|| format!("Row {}: bad timestamp '{}'", line + 1, &record[0]))?;
            let symbol = Symbol::from_str(&record[1])?;
            let price = Decimal::from_str(&record[2])
                .with_context(|| format!("Row {}: bad price '{}'", line + 1, &record[2]))?;

            let snapshot = grouped
                .remove(&timestamp)
                .unwrap_or_else(|| MarketSnapshot::new(timestamp));
            grouped.insert(timestamp, snapshot.with_price(symbol, price));
        }

        tracing::debug!(path, snapshots = grouped.len(), "Loaded price history");
        Ok(Self::new(grouped.into_values().collect()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[async_trait]
impl SnapshotProvider for HistoricalSnapshotProvider {
    async fn next_snapshot(&mut self) -> Result<Option<MarketSnapshot>> {
        if self.current_index < self.snapshots.len() {
            let snapshot = self.snapshots[self.current_index].clone();
            self.current_index += 1;
            Ok(Some(snapshot))
        } else {
            Ok(None)
        }
    }
}
