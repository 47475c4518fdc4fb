//! Instrument identity types shared by every crate.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shares per equity option contract.
pub const CONTRACT_MULTIPLIER: i64 = 100;

/// Options contract right (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Right {
    Call,
    Put,
}

impl std::fmt::Display for Right {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "C"),
            Self::Put => write!(f, "P"),
        }
    }
}

/// Observation resolution of the underlying's market data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Tick,
    Second,
    Minute,
    Hour,
    Day,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tick => write!(f, "tick"),
            Self::Second => write!(f, "second"),
            Self::Minute => write!(f, "minute"),
            Self::Hour => write!(f, "hour"),
            Self::Day => write!(f, "day"),
        }
    }
}

/// The base instrument options are written on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Underlying {
    pub ticker: String,
    pub resolution: Resolution,
    /// Last observed price. Zero until the first valid quote arrives.
    pub price: Decimal,
}

impl Underlying {
    #[must_use]
    pub fn new(ticker: &str, resolution: Resolution) -> Self {
        Self {
            ticker: ticker.to_uppercase(),
            resolution,
            price: Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn symbol(&self) -> Symbol {
        Symbol::equity(&self.ticker)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContractError {
    #[error("Strike must be positive, got {strike} for {underlying}")]
    NonPositiveStrike { underlying: String, strike: Decimal },

    #[error("Cannot parse symbol '{0}', expected 'TICKER' or 'TICKER 800P 2016-01-15'")]
    Unparsable(String),
}

/// A listed options contract.
///
/// Fields are private so the (right, strike, expiry) triple cannot change
/// once a contract has been listed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionContract {
    underlying: String,
    right: Right,
    strike: Decimal,
    expiry: NaiveDate,
}

impl OptionContract {
    /// Create a contract on `underlying`.
    ///
    /// # Errors
    ///
    /// Returns `ContractError::NonPositiveStrike` if `strike <= 0`.
    pub fn new(
        underlying: &str,
        right: Right,
        strike: Decimal,
        expiry: NaiveDate,
    ) -> Result<Self, ContractError> {
        let underlying = underlying.to_uppercase();
        if strike <= Decimal::ZERO {
            return Err(ContractError::NonPositiveStrike { underlying, strike });
        }
        Ok(Self {
            underlying,
            right,
            strike: strike.normalize(),
            expiry,
        })
    }

    #[must_use]
    pub fn underlying(&self) -> &str {
        &self.underlying
    }

    #[must_use]
    pub const fn right(&self) -> Right {
        self.right
    }

    #[must_use]
    pub const fn strike(&self) -> Decimal {
        self.strike
    }

    #[must_use]
    pub const fn expiry(&self) -> NaiveDate {
        self.expiry
    }

    #[must_use]
    pub fn symbol(&self) -> Symbol {
        Symbol::Option(self.clone())
    }
}

impl std::fmt::Display for OptionContract {
    /// Human-readable form, e.g. "GOOG 800P 2016-01-15".
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}{} {}", self.underlying, self.strike, self.right, self.expiry)
    }
}

/// Identity of anything that can carry a price or a position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Symbol {
    Equity { ticker: String },
    Option(OptionContract),
}

impl Symbol {
    #[must_use]
    pub fn equity(ticker: &str) -> Self {
        Self::Equity {
            ticker: ticker.to_uppercase(),
        }
    }

    #[must_use]
    pub const fn as_option(&self) -> Option<&OptionContract> {
        match self {
            Self::Option(contract) => Some(contract),
            Self::Equity { .. } => None,
        }
    }

    /// Cash value of one unit of price movement per unit of quantity.
    #[must_use]
    pub fn multiplier(&self) -> Decimal {
        match self {
            Self::Equity { .. } => Decimal::ONE,
            Self::Option(_) => Decimal::from(CONTRACT_MULTIPLIER),
        }
    }

    /// Ticker of the instrument itself, or of the underlying for options.
    #[must_use]
    pub fn ticker(&self) -> &str {
        match self {
            Self::Equity { ticker } => ticker,
            Self::Option(contract) => contract.underlying(),
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Equity { ticker } => write!(f, "{ticker}"),
            Self::Option(contract) => write!(f, "{contract}"),
        }
    }
}

impl std::str::FromStr for Symbol {
    type Err = ContractError;

    /// Inverse of `Display`: "GOOG" or "GOOG 800P 2016-01-15".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unparsable = || ContractError::Unparsable(s.to_string());
        let parts: Vec<&str> = s.split_whitespace().collect();
        match parts.as_slice() {
            [ticker] => Ok(Self::equity(ticker)),
            [ticker, strike_right, expiry] => {
                let (right, strike) = match strike_right.chars().last() {
                    Some('P' | 'p') => (Right::Put, &strike_right[..strike_right.len() - 1]),
                    Some('C' | 'c') => (Right::Call, &strike_right[..strike_right.len() - 1]),
                    _ => return Err(unparsable()),
                };
                let strike: Decimal = strike.parse().map_err(|_| unparsable())?;
                let expiry: NaiveDate = expiry.parse().map_err(|_| unparsable())?;
                Ok(OptionContract::new(ticker, right, strike, expiry)?.symbol())
            }
            _ => Err(unparsable()),
        }
    }
}
