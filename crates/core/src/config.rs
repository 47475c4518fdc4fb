use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Resolution, Right};

/// Static configuration handed to setup. Dates and cash are bookkeeping for
/// the surrounding harness; the core only checks they are coherent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub run: RunWindow,
    pub underlying: UnderlyingConfig,
    pub legs: Vec<LegConfig>,
    #[serde(default)]
    pub auxiliary: Option<AuxiliaryConfig>,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub cash: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderlyingConfig {
    pub ticker: String,
    pub resolution: Resolution,
}

/// One tracked symbol. A leg without `quantity` gates engagement but is never traded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LegConfig {
    /// The underlying itself.
    Equity {
        #[serde(default)]
        quantity: Option<Decimal>,
    },
    /// An option selected from the chain by right and exact strike.
    Option {
        right: Right,
        strike: Decimal,
        quantity: Decimal,
    },
}

impl LegConfig {
    #[must_use]
    pub const fn quantity(&self) -> Option<Decimal> {
        match self {
            Self::Equity { quantity } => *quantity,
            Self::Option { quantity, .. } => Some(*quantity),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure and emit intents anyway.
    #[default]
    Proceed,
    /// Skip engagement for this snapshot.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryConfig {
    pub function: String,
    #[serde(default)]
    pub args: Vec<Decimal>,
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    #[default]
    Builtin,
    Python,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub runtime: RuntimeKind,
    /// Module the Python runtime resolves functions from.
    #[serde(default = "default_module")]
    pub module: String,
}

fn default_module() -> String {
    "numpy".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeKind::default(),
            module: default_module(),
        }
    }
}

impl RunConfig {
    /// Checks coherence that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first problem found.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.run.start <= self.run.end,
            "Run start {} is after end {}",
            self.run.start,
            self.run.end
        );
        anyhow::ensure!(
            !self.underlying.ticker.trim().is_empty(),
            "Underlying ticker is empty"
        );
        anyhow::ensure!(!self.legs.is_empty(), "No legs configured");

        for leg in &self.legs {
            if let LegConfig::Option { right, strike, .. } = leg {
                anyhow::ensure!(
                    *strike > Decimal::ZERO,
                    "Option leg {right} has non-positive strike {strike}"
                );
            }
            if let Some(quantity) = leg.quantity() {
                anyhow::ensure!(!quantity.is_zero(), "Leg quantity must be non-zero");
            }
        }

        anyhow::ensure!(
            self.legs.iter().any(|leg| leg.quantity().is_some()),
            "No leg carries an order quantity"
        );

        if let Some(aux) = &self.auxiliary {
            anyhow::ensure!(
                !aux.function.trim().is_empty(),
                "Auxiliary function name is empty"
            );
        }

        Ok(())
    }

    /// Underlying plus a short put and short call, the configuration the
    /// assignment regression runs with.
    #[must_use]
    pub fn short_strangle(ticker: &str, put_strike: Decimal, call_strike: Decimal) -> Self {
        Self {
            run: RunWindow {
                start: NaiveDate::from_ymd_opt(2015, 12, 23).unwrap_or_default(),
                end: NaiveDate::from_ymd_opt(2015, 12, 24).unwrap_or_default(),
                cash: Decimal::from(100_000),
            },
            underlying: UnderlyingConfig {
                ticker: ticker.to_string(),
                resolution: Resolution::Minute,
            },
            legs: vec![
                LegConfig::Equity { quantity: None },
                LegConfig::Option {
                    right: Right::Put,
                    strike: put_strike,
                    quantity: Decimal::NEGATIVE_ONE,
                },
                LegConfig::Option {
                    right: Right::Call,
                    strike: call_strike,
                    quantity: Decimal::NEGATIVE_ONE,
                },
            ],
            auxiliary: None,
            bridge: BridgeConfig::default(),
        }
    }
}
