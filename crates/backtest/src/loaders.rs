//! CSV inputs for a replay: listed contracts and scheduled assignments/expiries.

use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};

use optcycle_core::{OptionContract, Symbol};
use optcycle_options_chain::{ContractChain, InMemoryChainProvider};

use crate::execution::ScheduledEvent;

/// Loads option chains from `as_of,contract` rows.
///
/// Rows are grouped by underlying and `as_of` date into one chain each.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a date does not parse, or a
/// contract column is not an option symbol.
pub fn load_chains(path: &str) -> Result<InMemoryChainProvider> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open chain file {path}"))?;
    let mut grouped: BTreeMap<(String, NaiveDate), Vec<OptionContract>> = BTreeMap::new();

    for (line, result) in reader.records().enumerate() {
        let record = result?;
        anyhow::ensure!(record.len() >= 2, "Row {} has {} fields", line + 1, record.len());

        let as_of = NaiveDate::from_str(&record[0])
            .with_context(|| format!("Row {}: bad date '{}'", line + 1, &record[0]))?;
        let contract = match Symbol::from_str(&record[1])? {
            Symbol::Option(contract) => contract,
            Symbol::Equity { ticker } => {
                anyhow::bail!("Row {}: '{ticker}' is not an option contract", line + 1)
            }
        };
        grouped
            .entry((contract.underlying().to_string(), as_of))
            .or_default()
            .push(contract);
    }

    let mut provider = InMemoryChainProvider::new();
    for ((underlying, as_of), contracts) in grouped {
        provider.insert(ContractChain::new(&underlying, as_of, contracts)?);
    }
    Ok(provider)
}

/// Loads scheduled events from `timestamp,event,contract,deliver` rows.
///
/// `event` is `assignment` or `expiry`; `deliver` is only read for
/// assignments and defaults to false when empty.
///
/// # Errors
///
/// Returns an error on unreadable files, unknown events, or unparsable fields.
pub fn load_schedule(path: &str) -> Result<Vec<ScheduledEvent>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open schedule file {path}"))?;
    let mut events = Vec::new();

    for (line, result) in reader.records().enumerate() {
        let record = result?;
        anyhow::ensure!(record.len() >= 3, "Row {} has {} fields", line + 1, record.len());

        let at: DateTime<Utc> = record[0]
            .parse()
            .with_context(|| format!("Row {}: bad timestamp '{}'", line + 1, &record[0]))?;
        let contract = Symbol::from_str(&record[2])?;
        let deliver = record.get(3).map(str::trim).unwrap_or_default();

        let event = match record[1].trim() {
            "assignment" => {
                let deliver_underlying = !deliver.is_empty()
                    && bool::from_str(deliver).with_context(|| {
                        format!("Row {}: bad deliver flag '{deliver}'", line + 1)
                    })?;
                ScheduledEvent::Assignment {
                    at,
                    contract,
                    deliver_underlying,
                }
            }
            "expiry" => ScheduledEvent::Expiry { at, contract },
            other => anyhow::bail!("Row {}: unknown event '{other}'", line + 1),
        };
        events.push(event);
    }

    Ok(events)
}
