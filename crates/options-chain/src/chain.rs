//! Option chain for a single underlying and the provider interface that supplies it.

use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

use optcycle_core::OptionContract;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("Contract {contract} does not belong to underlying {underlying}")]
    ForeignContract { underlying: String, contract: String },

    #[error("No option chain available for {underlying} as of {as_of}")]
    Unavailable { underlying: String, as_of: NaiveDate },
}

/// Contracts listed for one underlying at one point in time.
///
/// Read-only once built. Input order is preserved but carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractChain {
    underlying: String,
    as_of: NaiveDate,
    contracts: Vec<OptionContract>,
}

impl ContractChain {
    /// Build a chain, checking every contract is written on `underlying`.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::ForeignContract` for the first contract on another underlying.
    pub fn new(
        underlying: &str,
        as_of: NaiveDate,
        contracts: Vec<OptionContract>,
    ) -> Result<Self, ChainError> {
        let underlying = underlying.to_uppercase();
        if let Some(foreign) = contracts.iter().find(|c| c.underlying() != underlying) {
            return Err(ChainError::ForeignContract {
                underlying,
                contract: foreign.to_string(),
            });
        }
        Ok(Self {
            underlying,
            as_of,
            contracts,
        })
    }

    #[must_use]
    pub fn underlying(&self) -> &str {
        &self.underlying
    }

    #[must_use]
    pub const fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    #[must_use]
    pub fn contracts(&self) -> &[OptionContract] {
        &self.contracts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

/// External option-chain collaborator.
pub trait ChainProvider: Send + Sync {
    /// Contracts listed for `underlying` as of `as_of`.
    fn contract_list(&self, underlying: &str, as_of: NaiveDate) -> Result<ContractChain>;
}

/// Serves chains registered up front. Any `as_of` returns the latest
/// registered chain dated on or before it.
#[derive(Debug, Default)]
pub struct InMemoryChainProvider {
    chains: HashMap<String, Vec<ContractChain>>,
}

impl InMemoryChainProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_chain(mut self, chain: ContractChain) -> Self {
        self.insert(chain);
        self
    }

    pub fn insert(&mut self, chain: ContractChain) {
        let chains = self.chains.entry(chain.underlying.clone()).or_default();
        chains.push(chain);
        chains.sort_by_key(ContractChain::as_of);
    }
}

impl ChainProvider for InMemoryChainProvider {
    fn contract_list(&self, underlying: &str, as_of: NaiveDate) -> Result<ContractChain> {
        let underlying = underlying.to_uppercase();
        let chain = self
            .chains
            .get(&underlying)
            .and_then(|chains| chains.iter().rev().find(|c| c.as_of <= as_of))
            .ok_or_else(|| ChainError::Unavailable {
                underlying: underlying.clone(),
                as_of,
            })?;

        debug!(
            underlying,
            %as_of,
            contracts = chain.len(),
            "Serving option chain"
        );
        Ok(chain.clone())
    }
}
