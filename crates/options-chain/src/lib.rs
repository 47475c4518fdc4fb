//! Option chains and deterministic contract selection.
//!
//! Selection keeps contracts of the requested right, orders them by
//! expiration (earliest first) and takes the first whose strike equals the
//! target exactly. A miss is fatal to setup and is never retried.

pub mod chain;
pub mod filter;

pub use chain::{ChainError, ChainProvider, ContractChain, InMemoryChainProvider};
pub use filter::{select_contract, ContractFilter, SelectionError};
