//! Flat/Engaged position lifecycle with re-entry after assignment.
//!
//! On every snapshot the controller derives its state from confirmed
//! positions and from the intents it is still waiting on:
//!
//! - `Pending`: intents emitted, not yet filled or rejected. Nothing is emitted.
//!   An intent resolves once the position view shows a fill on its symbol;
//!   order fill and rejection reports resolve it sooner.
//! - `Engaged`: some tracked symbol holds a non-zero position. Nothing is emitted.
//! - `Flat`: every tracked symbol is at zero. If every tracked price is
//!   non-zero, one intent per traded leg is emitted and the controller
//!   becomes `Pending`; otherwise the snapshot is a stale-quote no-op.
//!
//! Assignment or expiry zeroing every leg brings the controller back to
//! `Flat`, so the next valid snapshot re-enters. That loop runs until the
//! snapshot stream ends.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use optcycle_bridge::ComputationError;
use optcycle_core::{
    ExecutionReport, FailurePolicy, FillKind, MarketSnapshot, OrderIntent, PositionBook, Strategy,
    Symbol, Underlying,
};

use crate::auxiliary::AuxiliaryComputation;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Snapshot at {received} is older than the last processed one at {last}")]
    OutOfOrderSnapshot {
        received: DateTime<Utc>,
        last: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Flat,
    Pending,
    Engaged,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::Pending => write!(f, "pending"),
            Self::Engaged => write!(f, "engaged"),
        }
    }
}

/// A symbol whose position and price the controller watches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedLeg {
    pub symbol: Symbol,
    /// Signed quantity to open on engagement; `None` for price-gate-only legs.
    pub target: Option<Decimal>,
}

impl TrackedLeg {
    #[must_use]
    pub const fn traded(symbol: Symbol, quantity: Decimal) -> Self {
        Self {
            symbol,
            target: Some(quantity),
        }
    }

    #[must_use]
    pub const fn watched(symbol: Symbol) -> Self {
        Self {
            symbol,
            target: None,
        }
    }
}

/// What a snapshot led to.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOutcome {
    /// Flat and fully quoted: intents were emitted.
    Engaged,
    /// Flat but `symbol` had no valid quote. Not an error.
    StaleQuote { symbol: Symbol },
    /// Flat and quoted, but the auxiliary computation failed under `FailurePolicy::Abort`.
    AuxiliaryFailed(ComputationError),
    /// Waiting on fills or rejections of earlier intents.
    AwaitingConfirmation,
    /// Holding a position.
    Holding,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotDecision {
    pub outcome: SnapshotOutcome,
    pub intents: Vec<OrderIntent>,
}

impl SnapshotDecision {
    fn idle(outcome: SnapshotOutcome) -> Self {
        Self {
            outcome,
            intents: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct PositionLifecycleController {
    name: String,
    underlying: Underlying,
    legs: Vec<TrackedLeg>,
    auxiliary: Option<AuxiliaryComputation>,
    state: LifecycleState,
    /// Intents emitted and not yet resolved, with the symbol's fill revision at emission.
    outstanding: HashMap<Uuid, (Symbol, u64)>,
    last_timestamp: Option<DateTime<Utc>>,
    last_auxiliary_value: Option<Decimal>,
    engagements: usize,
}

impl PositionLifecycleController {
    #[must_use]
    pub fn new(name: &str, underlying: Underlying, legs: Vec<TrackedLeg>) -> Self {
        Self {
            name: name.to_string(),
            underlying,
            legs,
            auxiliary: None,
            state: LifecycleState::Flat,
            outstanding: HashMap::new(),
            last_timestamp: None,
            last_auxiliary_value: None,
            engagements: 0,
        }
    }

    #[must_use]
    pub fn with_auxiliary(mut self, auxiliary: AuxiliaryComputation) -> Self {
        self.auxiliary = Some(auxiliary);
        self
    }

    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    #[must_use]
    pub fn legs(&self) -> &[TrackedLeg] {
        &self.legs
    }

    #[must_use]
    pub const fn underlying(&self) -> &Underlying {
        &self.underlying
    }

    /// Number of Flat→Engaged transitions so far.
    #[must_use]
    pub const fn engagements(&self) -> usize {
        self.engagements
    }

    #[must_use]
    pub const fn last_auxiliary_value(&self) -> Option<Decimal> {
        self.last_auxiliary_value
    }

    #[must_use]
    pub fn outstanding_intents(&self) -> usize {
        self.outstanding.len()
    }

    /// Decide what to do with one snapshot given confirmed positions.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::OutOfOrderSnapshot` if `snapshot` is older
    /// than the previously processed one.
    pub fn process(
        &mut self,
        snapshot: &MarketSnapshot,
        positions: &PositionBook,
    ) -> Result<SnapshotDecision, LifecycleError> {
        if let Some(last) = self.last_timestamp {
            if snapshot.timestamp < last {
                return Err(LifecycleError::OutOfOrderSnapshot {
                    received: snapshot.timestamp,
                    last,
                });
            }
        }
        self.last_timestamp = Some(snapshot.timestamp);

        let underlying_price = snapshot.price(&self.underlying.symbol());
        if !underlying_price.is_zero() {
            self.underlying.price = underlying_price;
        }

        self.reconcile(positions);
        self.transition(self.derive_state(positions), snapshot.timestamp);

        match self.state {
            LifecycleState::Pending => {
                Ok(SnapshotDecision::idle(SnapshotOutcome::AwaitingConfirmation))
            }
            LifecycleState::Engaged => Ok(SnapshotDecision::idle(SnapshotOutcome::Holding)),
            LifecycleState::Flat => Ok(self.try_engage(snapshot, positions)),
        }
    }

    /// Drop intents whose symbol has seen a confirmed fill since emission.
    fn reconcile(&mut self, positions: &PositionBook) {
        let name = &self.name;
        self.outstanding.retain(|order_id, (symbol, revision)| {
            let unchanged = positions.revision(symbol) == *revision;
            if !unchanged {
                debug!(
                    strategy = name,
                    order_id = %order_id,
                    symbol = %symbol,
                    "Intent confirmed through positions"
                );
            }
            unchanged
        });
    }

    fn derive_state(&self, positions: &PositionBook) -> LifecycleState {
        if !self.outstanding.is_empty() {
            LifecycleState::Pending
        } else if positions.is_invested_in(self.legs.iter().map(|leg| &leg.symbol)) {
            LifecycleState::Engaged
        } else {
            LifecycleState::Flat
        }
    }

    fn transition(&mut self, next: LifecycleState, at: DateTime<Utc>) {
        if next != self.state {
            info!(
                strategy = self.name,
                from = %self.state,
                to = %next,
                %at,
                "Lifecycle transition"
            );
            self.state = next;
        }
    }

    fn try_engage(
        &mut self,
        snapshot: &MarketSnapshot,
        positions: &PositionBook,
    ) -> SnapshotDecision {
        if let Some(stale) = self
            .legs
            .iter()
            .find(|leg| !snapshot.has_valid_quote(&leg.symbol))
        {
            debug!(
                strategy = self.name,
                symbol = %stale.symbol,
                at = %snapshot.timestamp,
                "Stale quote, deferring entry"
            );
            return SnapshotDecision::idle(SnapshotOutcome::StaleQuote {
                symbol: stale.symbol.clone(),
            });
        }

        if let Some(auxiliary) = &self.auxiliary {
            match auxiliary.run() {
                Ok(value) => self.last_auxiliary_value = Some(value),
                Err(e) => match auxiliary.policy() {
                    FailurePolicy::Proceed => {
                        warn!(
                            strategy = self.name,
                            error = %e,
                            "Auxiliary computation failed, entering without it"
                        );
                    }
                    FailurePolicy::Abort => {
                        warn!(
                            strategy = self.name,
                            error = %e,
                            "Auxiliary computation failed, skipping entry this cycle"
                        );
                        return SnapshotDecision::idle(SnapshotOutcome::AuxiliaryFailed(e));
                    }
                },
            }
        }

        let intents: Vec<OrderIntent> = self
            .legs
            .iter()
            .filter_map(|leg| {
                let quantity = leg.target?;
                Some(OrderIntent::market(leg.symbol.clone(), quantity, snapshot.timestamp))
            })
            .collect();

        for intent in &intents {
            let revision = positions.revision(&intent.symbol);
            self.outstanding.insert(intent.id, (intent.symbol.clone(), revision));
        }
        self.engagements += 1;

        info!(
            strategy = self.name,
            cycle = self.engagements,
            intents = intents.len(),
            underlying_price = %self.underlying.price,
            "Entering positions"
        );
        self.transition(LifecycleState::Pending, snapshot.timestamp);

        SnapshotDecision {
            outcome: SnapshotOutcome::Engaged,
            intents,
        }
    }

    /// Resolve outstanding intents from execution traffic ahead of the next snapshot.
    ///
    /// Only order fills and rejections resolve intents; assignment, delivery
    /// and expiry fills reach the controller through positions alone.
    /// Rejections leave no trace in positions, so they need this path.
    pub fn on_report(&mut self, report: &ExecutionReport) {
        match report {
            ExecutionReport::Fill(fill) if fill.kind == FillKind::Order => {
                if self.outstanding.remove(&fill.order_id).is_none() {
                    debug!(
                        strategy = self.name,
                        order_id = %fill.order_id,
                        "Fill for an intent this controller is not waiting on"
                    );
                }
            }
            ExecutionReport::Fill(_) => {}
            ExecutionReport::Rejected {
                order_id,
                symbol,
                reason,
                ..
            } => {
                if self.outstanding.remove(order_id).is_some() {
                    warn!(
                        strategy = self.name,
                        symbol = %symbol,
                        reason,
                        "Entry intent rejected"
                    );
                }
            }
        }
    }
}

impl Strategy for PositionLifecycleController {
    fn on_snapshot(
        &mut self,
        snapshot: &MarketSnapshot,
        positions: &PositionBook,
    ) -> anyhow::Result<Vec<OrderIntent>> {
        Ok(self.process(snapshot, positions)?.intents)
    }

    fn on_execution_report(&mut self, report: &ExecutionReport) {
        self.on_report(report);
    }

    fn name(&self) -> &str {
        &self.name
    }
}
