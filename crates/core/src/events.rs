use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Symbol;

/// Timestamped bundle of current prices keyed by symbol.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub timestamp: DateTime<Utc>,
    prices: HashMap<Symbol, Decimal>,
}

impl MarketSnapshot {
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            prices: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_price(mut self, symbol: Symbol, price: Decimal) -> Self {
        self.prices.insert(symbol, price);
        self
    }

    /// Current price, or zero when the symbol has no quote in this snapshot.
    #[must_use]
    pub fn price(&self, symbol: &Symbol) -> Decimal {
        self.prices.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    #[must_use]
    pub fn has_valid_quote(&self, symbol: &Symbol) -> bool {
        !self.price(symbol).is_zero()
    }

    pub fn prices(&self) -> impl Iterator<Item = (&Symbol, &Decimal)> {
        self.prices.iter()
    }
}

/// Request to move a symbol's position by a signed quantity.
///
/// Not confirmed state: confirmation arrives later as an `ExecutionReport`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub id: Uuid,
    pub symbol: Symbol,
    /// Positive buys, negative sells.
    pub quantity: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl OrderIntent {
    #[must_use]
    pub fn market(symbol: Symbol, quantity: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol,
            quantity,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillKind {
    /// Execution of an order intent.
    Order,
    /// Option assignment closing a short leg.
    Assignment,
    /// Underlying delivered or taken as the result of an assignment.
    Delivery,
    /// Option position closed by expiration.
    Expiry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillEvent {
    /// Intent id for `FillKind::Order`, otherwise an id generated by the
    /// execution collaborator.
    pub order_id: Uuid,
    pub symbol: Symbol,
    /// Signed quantity added to the position.
    pub quantity: Decimal,
    pub price: Decimal,
    pub commission: Decimal,
    pub kind: FillKind,
    pub timestamp: DateTime<Utc>,
}

/// Confirmation traffic from the execution collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionReport {
    Fill(FillEvent),
    Rejected {
        order_id: Uuid,
        symbol: Symbol,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl ExecutionReport {
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        match self {
            Self::Fill(fill) => &fill.symbol,
            Self::Rejected { symbol, .. } => symbol,
        }
    }
}
