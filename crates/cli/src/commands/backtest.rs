use anyhow::Context;
use rust_decimal::Decimal;

use optcycle_backtest::{
    load_chains, load_schedule, HistoricalSnapshotProvider, SimulatedExecutionHandler,
};
use optcycle_core::{ConfigLoader, LegConfig, RunConfig, SummaryFormatter, TradingSystem};
use optcycle_strategy::build_controller;

pub struct BacktestInputs {
    pub config: String,
    pub prices: String,
    pub chain: String,
    pub schedule: Option<String>,
    pub commission: Decimal,
    pub slippage_bps: Decimal,
}

pub async fn run_backtest(inputs: &BacktestInputs) -> anyhow::Result<()> {
    let config = ConfigLoader::load(&inputs.config)?;
    tracing::info!(
        config = inputs.config,
        prices = inputs.prices,
        underlying = config.underlying.ticker,
        "Running backtest"
    );

    let chains = load_chains(&inputs.chain)?;
    let controller = build_controller(&config, &chains).context("Setup failed")?;

    let data_provider = HistoricalSnapshotProvider::from_csv(&inputs.prices)?;
    anyhow::ensure!(!data_provider.is_empty(), "No prices in {}", inputs.prices);

    let mut handler = SimulatedExecutionHandler::new(inputs.commission, inputs.slippage_bps);
    if let Some(path) = &inputs.schedule {
        let events = load_schedule(path)?;
        tracing::info!(events = events.len(), "Loaded assignment schedule");
        for event in events {
            handler.schedule(event);
        }
    }

    let mut system = TradingSystem::new(data_provider, handler, controller);
    let summary = system.run().await?;

    println!("{}", SummaryFormatter::format(&summary, system.positions()));
    Ok(())
}

pub fn validate(path: &str) -> anyhow::Result<()> {
    let config = ConfigLoader::load(path)?;
    println!("{}", describe(&config));
    Ok(())
}

fn describe(config: &RunConfig) -> String {
    let mut lines = vec![format!(
        "{} ({}) from {} to {}, cash {}",
        config.underlying.ticker,
        config.underlying.resolution,
        config.run.start,
        config.run.end,
        config.run.cash
    )];
    for leg in &config.legs {
        lines.push(match leg {
            LegConfig::Equity { quantity: None } => "  equity: watched".to_string(),
            LegConfig::Equity {
                quantity: Some(quantity),
            } => format!("  equity: {quantity}"),
            LegConfig::Option {
                right,
                strike,
                quantity,
            } => format!("  option: {quantity} x {strike}{right}, earliest expiry"),
        });
    }
    if let Some(aux) = &config.auxiliary {
        lines.push(format!(
            "  auxiliary: {}({:?}) via {:?}, on failure {:?}",
            aux.function, aux.args, config.bridge.runtime, aux.on_failure
        ));
    }
    lines.join("\n")
}
