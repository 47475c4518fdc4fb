//! Candidate filtering and exact-strike contract selection.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

use optcycle_core::{OptionContract, Right, Symbol};

use crate::chain::ContractChain;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// Fatal to setup: the chain cannot change mid-selection, so retrying is pointless.
    #[error("No {right:?} contract with strike {strike} listed for {underlying}")]
    NoMatchingContract {
        underlying: String,
        right: Right,
        strike: Decimal,
    },
}

/// Filter for querying a subset of the chain. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractFilter {
    /// Filter to a specific right (call/put).
    pub right: Option<Right>,
    /// Minimum strike price, inclusive.
    pub min_strike: Option<Decimal>,
    /// Maximum strike price, inclusive.
    pub max_strike: Option<Decimal>,
    /// Earliest expiration, inclusive.
    pub earliest_expiry: Option<NaiveDate>,
    /// Latest expiration, inclusive.
    pub latest_expiry: Option<NaiveDate>,
}

impl ContractFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn right(mut self, right: Right) -> Self {
        self.right = Some(right);
        self
    }

    #[must_use]
    pub fn strikes(mut self, min: Decimal, max: Decimal) -> Self {
        self.min_strike = Some(min);
        self.max_strike = Some(max);
        self
    }

    #[must_use]
    pub fn expiring_between(mut self, earliest: NaiveDate, latest: NaiveDate) -> Self {
        self.earliest_expiry = Some(earliest);
        self.latest_expiry = Some(latest);
        self
    }

    #[must_use]
    pub fn matches(&self, contract: &OptionContract) -> bool {
        self.right.map_or(true, |r| contract.right() == r)
            && self.min_strike.map_or(true, |s| contract.strike() >= s)
            && self.max_strike.map_or(true, |s| contract.strike() <= s)
            && self.earliest_expiry.map_or(true, |d| contract.expiry() >= d)
            && self.latest_expiry.map_or(true, |d| contract.expiry() <= d)
    }

    /// Matching contracts ordered by expiry, then strike, then right.
    ///
    /// The ordering is total over distinct contracts, so the output does not
    /// depend on the order contracts were listed in.
    #[must_use]
    pub fn apply<'a>(&self, chain: &'a ContractChain) -> Vec<&'a OptionContract> {
        let mut candidates: Vec<&OptionContract> =
            chain.contracts().iter().filter(|c| self.matches(c)).collect();
        candidates.sort_by(|a, b| {
            a.expiry()
                .cmp(&b.expiry())
                .then_with(|| a.strike().cmp(&b.strike()))
                .then_with(|| a.right().cmp(&b.right()))
        });
        candidates.dedup();

        debug!(
            underlying = chain.underlying(),
            listed = chain.len(),
            matched = candidates.len(),
            "Chain filtered"
        );
        candidates
    }
}

/// Earliest-expiring contract of `right` whose strike equals `target_strike` exactly.
///
/// # Errors
///
/// Returns `SelectionError::NoMatchingContract` naming the right and strike
/// when nothing in the chain matches.
pub fn select_contract(
    chain: &ContractChain,
    right: Right,
    target_strike: Decimal,
) -> Result<Symbol, SelectionError> {
    let selected = ContractFilter::new()
        .right(right)
        .apply(chain)
        .into_iter()
        .find(|c| c.strike() == target_strike)
        .ok_or_else(|| SelectionError::NoMatchingContract {
            underlying: chain.underlying().to_string(),
            right,
            strike: target_strike,
        })?;

    info!(
        contract = %selected,
        as_of = %chain.as_of(),
        "Contract selected"
    );
    Ok(selected.symbol())
}
