//! One-time construction of a controller from a `RunConfig`.

use thiserror::Error;
use tracing::info;

use optcycle_bridge::CrossRuntimeBridge;
use optcycle_core::{BridgeConfig, LegConfig, RunConfig, RuntimeKind, Symbol, Underlying};
use optcycle_options_chain::{select_contract, ChainProvider, SelectionError};

use crate::auxiliary::AuxiliaryComputation;
use crate::lifecycle::{PositionLifecycleController, TrackedLeg};

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("Option chain for {underlying} unavailable: {message}")]
    ChainUnavailable { underlying: String, message: String },

    #[error("Foreign runtime {0:?} is not available in this build")]
    RuntimeUnavailable(RuntimeKind),
}

/// Build a controller, creating the bridge the configuration asks for.
///
/// # Errors
///
/// See [`build_controller_with_bridge`]; additionally fails with
/// `SetupError::RuntimeUnavailable` when the configured runtime was not
/// compiled in.
pub fn build_controller(
    config: &RunConfig,
    provider: &dyn ChainProvider,
) -> Result<PositionLifecycleController, SetupError> {
    let bridge = match &config.auxiliary {
        Some(_) => Some(bridge_from_config(&config.bridge)?),
        None => None,
    };
    build(config, provider, bridge)
}

/// Build a controller whose auxiliary computation, if configured, runs on `bridge`.
///
/// The chain is fetched once, as of the run start, and only when some leg is
/// an option. Every option leg must resolve to a listed contract.
///
/// # Errors
///
/// Returns `SetupError::InvalidConfig` when validation fails,
/// `SetupError::ChainUnavailable` when the provider fails, and
/// `SetupError::Selection` naming the right and strike of the first leg
/// with no matching contract.
pub fn build_controller_with_bridge(
    config: &RunConfig,
    provider: &dyn ChainProvider,
    bridge: CrossRuntimeBridge,
) -> Result<PositionLifecycleController, SetupError> {
    build(config, provider, Some(bridge))
}

fn build(
    config: &RunConfig,
    provider: &dyn ChainProvider,
    bridge: Option<CrossRuntimeBridge>,
) -> Result<PositionLifecycleController, SetupError> {
    config
        .validate()
        .map_err(|e| SetupError::InvalidConfig(e.to_string()))?;

    let underlying = Underlying::new(&config.underlying.ticker, config.underlying.resolution);
    let needs_chain = config
        .legs
        .iter()
        .any(|leg| matches!(leg, LegConfig::Option { .. }));

    let chain = if needs_chain {
        let chain = provider
            .contract_list(&underlying.ticker, config.run.start)
            .map_err(|e| SetupError::ChainUnavailable {
                underlying: underlying.ticker.clone(),
                message: e.to_string(),
            })?;
        Some(chain)
    } else {
        None
    };

    let mut legs = Vec::with_capacity(config.legs.len());
    for leg in &config.legs {
        let symbol = match (leg, &chain) {
            (LegConfig::Equity { .. }, _) => Symbol::equity(&underlying.ticker),
            (LegConfig::Option { right, strike, .. }, Some(chain)) => {
                select_contract(chain, *right, *strike)?
            }
            (LegConfig::Option { .. }, None) => {
                return Err(SetupError::InvalidConfig(
                    "option leg configured without a chain".to_string(),
                ))
            }
        };
        legs.push(match leg.quantity() {
            Some(quantity) => TrackedLeg::traded(symbol, quantity),
            None => TrackedLeg::watched(symbol),
        });
    }

    let name = format!("{}-lifecycle", underlying.ticker.to_lowercase());
    info!(
        strategy = name,
        underlying = underlying.ticker,
        legs = legs.len(),
        start = %config.run.start,
        end = %config.run.end,
        cash = %config.run.cash,
        "Controller configured"
    );

    let mut controller = PositionLifecycleController::new(&name, underlying, legs);
    if let (Some(aux), Some(bridge)) = (&config.auxiliary, bridge) {
        controller = controller.with_auxiliary(AuxiliaryComputation::from_config(aux, bridge));
    }
    Ok(controller)
}

/// Bridge over the runtime `config` names.
///
/// # Errors
///
/// Returns `SetupError::RuntimeUnavailable` when that runtime was not compiled in.
pub fn bridge_from_config(config: &BridgeConfig) -> Result<CrossRuntimeBridge, SetupError> {
    match config.runtime {
        RuntimeKind::Builtin => Ok(CrossRuntimeBridge::builtin()),
        #[cfg(feature = "python")]
        RuntimeKind::Python => Ok(CrossRuntimeBridge::python(&config.module)),
        #[cfg(not(feature = "python"))]
        RuntimeKind::Python => Err(SetupError::RuntimeUnavailable(RuntimeKind::Python)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::NaiveDate;
    use optcycle_core::{AuxiliaryConfig, FailurePolicy, OptionContract, Right};
    use optcycle_options_chain::{ContractChain, InMemoryChainProvider};
    use rust_decimal_macros::dec;

    fn goog_provider() -> InMemoryChainProvider {
        let contracts = [
            (Right::Put, dec!(800), (2016, 2, 19)),
            (Right::Put, dec!(800), (2016, 1, 15)),
            (Right::Put, dec!(700), (2016, 1, 15)),
            (Right::Call, dec!(600), (2016, 1, 15)),
            (Right::Call, dec!(600), (2016, 2, 19)),
        ]
        .into_iter()
        .map(|(right, strike, (y, m, d))| {
            OptionContract::new("GOOG", right, strike, NaiveDate::from_ymd_opt(y, m, d).unwrap())
                .unwrap()
        })
        .collect();
        InMemoryChainProvider::new().with_chain(
            ContractChain::new("GOOG", NaiveDate::from_ymd_opt(2015, 12, 1).unwrap(), contracts)
                .unwrap(),
        )
    }

    struct CountingProvider {
        inner: InMemoryChainProvider,
        calls: AtomicUsize,
    }

    impl ChainProvider for CountingProvider {
        fn contract_list(
            &self,
            underlying: &str,
            as_of: NaiveDate,
        ) -> anyhow::Result<ContractChain> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.contract_list(underlying, as_of)
        }
    }

    #[test]
    fn builds_strangle_with_earliest_expiries() {
        let config = RunConfig::short_strangle("GOOG", dec!(800), dec!(600));
        let controller = build_controller(&config, &goog_provider()).unwrap();

        let expiry = NaiveDate::from_ymd_opt(2016, 1, 15).unwrap();
        let legs = controller.legs();
        assert_eq!(legs.len(), 3);
        assert_eq!(legs[0], TrackedLeg::watched(Symbol::equity("GOOG")));
        assert_eq!(
            legs[1],
            TrackedLeg::traded(
                OptionContract::new("GOOG", Right::Put, dec!(800), expiry).unwrap().symbol(),
                dec!(-1)
            )
        );
        assert_eq!(
            legs[2].symbol,
            OptionContract::new("GOOG", Right::Call, dec!(600), expiry).unwrap().symbol()
        );
        assert_eq!(optcycle_core::Strategy::name(&controller), "goog-lifecycle");
    }

    #[test]
    fn chain_is_requested_once_as_of_run_start() {
        let provider = CountingProvider {
            inner: goog_provider(),
            calls: AtomicUsize::new(0),
        };
        let config = RunConfig::short_strangle("GOOG", dec!(800), dec!(600));
        build_controller(&config, &provider).unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn equity_only_config_never_touches_the_chain() {
        let provider = CountingProvider {
            inner: InMemoryChainProvider::new(),
            calls: AtomicUsize::new(0),
        };
        let mut config = RunConfig::short_strangle("SPY", dec!(1), dec!(1));
        config.legs = vec![LegConfig::Equity {
            quantity: Some(dec!(100)),
        }];

        let controller = build_controller(&config, &provider).unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(controller.legs()[0].target, Some(dec!(100)));
    }

    #[test]
    fn unlisted_strike_fails_setup_naming_right_and_strike() {
        let config = RunConfig::short_strangle("GOOG", dec!(801), dec!(600));
        let err = build_controller(&config, &goog_provider()).unwrap_err();
        assert!(matches!(
            err,
            SetupError::Selection(SelectionError::NoMatchingContract {
                right: Right::Put,
                ..
            })
        ));
        assert_eq!(err.to_string(), "No Put contract with strike 801 listed for GOOG");
    }

    #[test]
    fn missing_chain_is_reported() {
        let config = RunConfig::short_strangle("AAPL", dec!(100), dec!(90));
        let err = build_controller(&config, &goog_provider()).unwrap_err();
        assert!(matches!(
            err,
            SetupError::ChainUnavailable { ref underlying, .. } if underlying == "AAPL"
        ));
    }

    #[test]
    fn invalid_config_is_rejected_before_fetching() {
        let provider = CountingProvider {
            inner: goog_provider(),
            calls: AtomicUsize::new(0),
        };
        let mut config = RunConfig::short_strangle("GOOG", dec!(800), dec!(600));
        config.legs.clear();
        assert!(matches!(
            build_controller(&config, &provider),
            Err(SetupError::InvalidConfig(_))
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn auxiliary_is_wired_from_config() {
        let mut config = RunConfig::short_strangle("GOOG", dec!(800), dec!(600));
        config.auxiliary = Some(AuxiliaryConfig {
            function: "sin".to_string(),
            args: vec![dec!(10)],
            on_failure: FailurePolicy::Proceed,
        });
        let bridge = CrossRuntimeBridge::builtin();
        let controller = build_controller_with_bridge(&config, &goog_provider(), bridge).unwrap();
        assert_eq!(controller.last_auxiliary_value(), None);
    }

    #[cfg(not(feature = "python"))]
    #[test]
    fn python_runtime_requires_the_feature() {
        let mut config = RunConfig::short_strangle("GOOG", dec!(800), dec!(600));
        config.auxiliary = Some(AuxiliaryConfig {
            function: "sin".to_string(),
            args: vec![dec!(10)],
            on_failure: FailurePolicy::Abort,
        });
        config.bridge.runtime = RuntimeKind::Python;
        assert!(matches!(
            build_controller(&config, &goog_provider()),
            Err(SetupError::RuntimeUnavailable(RuntimeKind::Python))
        ));
    }
}
