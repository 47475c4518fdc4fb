use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use optcycle_backtest::{HistoricalSnapshotProvider, ScheduledEvent, SimulatedExecutionHandler};
use optcycle_core::{
    AuxiliaryConfig, FailurePolicy, MarketSnapshot, OptionContract, Right, RunConfig, Symbol,
    TradingSystem,
};
use optcycle_options_chain::{ContractChain, InMemoryChainProvider};
use optcycle_strategy::{build_controller, LifecycleState, PositionLifecycleController};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn expiry() -> NaiveDate {
    NaiveDate::from_ymd_opt(2016, 1, 15).unwrap()
}

fn put() -> Symbol {
    OptionContract::new("GOOG", Right::Put, dec!(800), expiry()).unwrap().symbol()
}

fn call() -> Symbol {
    OptionContract::new("GOOG", Right::Call, dec!(600), expiry()).unwrap().symbol()
}

fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2015, 12, 23, 14, 30, 0).unwrap() + Duration::minutes(minute)
}

fn chain_provider() -> InMemoryChainProvider {
    let later = NaiveDate::from_ymd_opt(2016, 2, 19).unwrap();
    let contracts = vec![
        OptionContract::new("GOOG", Right::Put, dec!(800), later).unwrap(),
        OptionContract::new("GOOG", Right::Put, dec!(800), expiry()).unwrap(),
        OptionContract::new("GOOG", Right::Put, dec!(750), expiry()).unwrap(),
        OptionContract::new("GOOG", Right::Call, dec!(600), later).unwrap(),
        OptionContract::new("GOOG", Right::Call, dec!(600), expiry()).unwrap(),
    ];
    InMemoryChainProvider::new().with_chain(
        ContractChain::new("GOOG", NaiveDate::from_ymd_opt(2015, 12, 1).unwrap(), contracts)
            .unwrap(),
    )
}

/// Minute bars with the underlying unquoted on the first one.
fn snapshots(minutes: i64) -> HistoricalSnapshotProvider {
    let snapshots = (0..minutes)
        .map(|m| {
            let stock = if m == 0 { Decimal::ZERO } else { dec!(745) };
            MarketSnapshot::new(at(m))
                .with_price(Symbol::equity("GOOG"), stock)
                .with_price(put(), dec!(55))
                .with_price(call(), dec!(150))
        })
        .collect();
    HistoricalSnapshotProvider::new(snapshots)
}

fn controller(config: &RunConfig) -> PositionLifecycleController {
    build_controller(config, &chain_provider()).unwrap()
}

#[tokio::test]
async fn short_strangle_re_enters_after_assignment_and_expiry() {
    let config = RunConfig::short_strangle("GOOG", dec!(800), dec!(600));
    let handler = SimulatedExecutionHandler::frictionless()
        .with_event(ScheduledEvent::Assignment {
            at: at(4),
            contract: put(),
            deliver_underlying: false,
        })
        .with_event(ScheduledEvent::Assignment {
            at: at(5),
            contract: call(),
            deliver_underlying: false,
        })
        .with_event(ScheduledEvent::Expiry {
            at: at(8),
            contract: put(),
        })
        .with_event(ScheduledEvent::Expiry {
            at: at(8),
            contract: call(),
        });

    let mut system = TradingSystem::new(snapshots(12), handler, controller(&config));
    let summary = system.run().await.unwrap();

    // Entered at minutes 1, 5 and 8
    assert_eq!(summary.snapshots_processed, 12);
    assert_eq!(summary.engagement_cycles, 3);
    assert_eq!(summary.intents_emitted, 6);
    assert_eq!(summary.fills_applied, 10);
    assert_eq!(summary.rejections, 0);
    assert!(summary.realized_pnl > Decimal::ZERO);

    assert_eq!(system.positions().quantity(&put()), dec!(-1));
    assert_eq!(system.positions().quantity(&call()), dec!(-1));
    assert_eq!(system.positions().quantity(&Symbol::equity("GOOG")), Decimal::ZERO);
    assert_eq!(system.strategy().state(), LifecycleState::Engaged);
    assert_eq!(system.strategy().engagements(), 3);
}

#[tokio::test]
async fn delivered_shares_keep_the_cycle_engaged() {
    let config = RunConfig::short_strangle("GOOG", dec!(800), dec!(600));
    let handler = SimulatedExecutionHandler::frictionless()
        .with_event(ScheduledEvent::Assignment {
            at: at(4),
            contract: put(),
            deliver_underlying: true,
        })
        .with_event(ScheduledEvent::Expiry {
            at: at(6),
            contract: call(),
        });

    let mut system = TradingSystem::new(snapshots(10), handler, controller(&config));
    let summary = system.run().await.unwrap();

    // Both options are gone but the put assignment left 100 shares
    assert_eq!(system.positions().quantity(&put()), Decimal::ZERO);
    assert_eq!(system.positions().quantity(&call()), Decimal::ZERO);
    assert_eq!(system.positions().quantity(&Symbol::equity("GOOG")), dec!(100));
    assert_eq!(summary.engagement_cycles, 1);
    assert_eq!(summary.fills_applied, 5);
    assert_eq!(system.strategy().state(), LifecycleState::Engaged);
}

#[tokio::test]
async fn both_delivered_assignments_net_out_and_re_enter() {
    let config = RunConfig::short_strangle("GOOG", dec!(800), dec!(600));
    let handler = SimulatedExecutionHandler::frictionless()
        .with_event(ScheduledEvent::Assignment {
            at: at(4),
            contract: put(),
            deliver_underlying: true,
        })
        .with_event(ScheduledEvent::Assignment {
            at: at(4),
            contract: call(),
            deliver_underlying: true,
        });

    let mut system = TradingSystem::new(snapshots(10), handler, controller(&config));
    let summary = system.run().await.unwrap();

    // +100 shares bought at 800 and -100 sold at 600 leave no stock, so the
    // cycle re-enters on the same minute and those fills land at minute 5
    assert_eq!(summary.engagement_cycles, 2);
    assert_eq!(summary.intents_emitted, 4);
    assert_eq!(summary.fills_applied, 8);
    assert_eq!(system.positions().quantity(&Symbol::equity("GOOG")), Decimal::ZERO);
    assert_eq!(system.positions().quantity(&put()), dec!(-1));
    assert_eq!(system.positions().quantity(&call()), dec!(-1));
    assert_eq!(system.strategy().state(), LifecycleState::Engaged);
    assert_eq!(system.strategy().engagements(), 2);

    // Premiums of 5500 and 15000 less the 20000 lost on the shares
    assert_eq!(summary.realized_pnl, dec!(500));
}

#[tokio::test]
async fn aborting_auxiliary_failure_blocks_every_entry() {
    let mut config = RunConfig::short_strangle("GOOG", dec!(800), dec!(600));
    config.auxiliary = Some(AuxiliaryConfig {
        function: "erf".to_string(),
        args: vec![dec!(1)],
        on_failure: FailurePolicy::Abort,
    });

    let handler = SimulatedExecutionHandler::frictionless();
    let mut system = TradingSystem::new(snapshots(5), handler, controller(&config));
    let summary = system.run().await.unwrap();

    assert_eq!(summary.snapshots_processed, 5);
    assert_eq!(summary.intents_emitted, 0);
    assert_eq!(system.strategy().state(), LifecycleState::Flat);
}

#[tokio::test]
async fn auxiliary_value_is_recorded_on_entry() {
    let mut config = RunConfig::short_strangle("GOOG", dec!(800), dec!(600));
    config.auxiliary = Some(AuxiliaryConfig {
        function: "sin".to_string(),
        args: vec![dec!(10)],
        on_failure: FailurePolicy::Proceed,
    });

    let mut system = TradingSystem::new(
        snapshots(3),
        SimulatedExecutionHandler::frictionless(),
        controller(&config),
    );
    let summary = system.run().await.unwrap();

    assert_eq!(summary.engagement_cycles, 1);
    let value = system.strategy().last_auxiliary_value().unwrap();
    assert!((value - Decimal::try_from(10f64.sin()).unwrap()).abs() < dec!(0.000000001));
}
