//! Bridge computation run just before entering positions.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::info;

use optcycle_bridge::{
    BuiltinRuntime, ComputationError, CrossRuntimeBridge, ForeignRuntime, ForeignValue,
};
use optcycle_core::{AuxiliaryConfig, FailurePolicy};

/// A named function evaluated through the bridge on every engagement.
///
/// The result is logged next to the in-process value of the same function
/// when the builtin runtime knows it, so the two runtimes can be compared.
#[derive(Debug)]
pub struct AuxiliaryComputation {
    bridge: CrossRuntimeBridge,
    function: String,
    args: Vec<Decimal>,
    on_failure: FailurePolicy,
    reference: BuiltinRuntime,
}

impl AuxiliaryComputation {
    #[must_use]
    pub fn new(bridge: CrossRuntimeBridge, function: &str, args: Vec<Decimal>) -> Self {
        Self {
            bridge,
            function: function.to_string(),
            args,
            on_failure: FailurePolicy::default(),
            reference: BuiltinRuntime::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &AuxiliaryConfig, bridge: CrossRuntimeBridge) -> Self {
        Self::new(bridge, &config.function, config.args.clone()).on_failure(config.on_failure)
    }

    #[must_use]
    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    #[must_use]
    pub const fn policy(&self) -> FailurePolicy {
        self.on_failure
    }

    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Evaluate through the bridge.
    ///
    /// # Errors
    ///
    /// Propagates the bridge's `ComputationError` untouched.
    pub fn run(&self) -> Result<Decimal, ComputationError> {
        let value = self.bridge.invoke(&self.function, &self.args)?;
        info!(
            runtime = self.bridge.runtime_name(),
            function = self.function,
            args = ?self.args,
            foreign = %value,
            native = ?self.native_value(),
            "Auxiliary computation"
        );
        Ok(value)
    }

    fn native_value(&self) -> Option<f64> {
        let args: Option<Vec<f64>> = self.args.iter().map(ToPrimitive::to_f64).collect();
        match self.reference.call(&self.function, &args?) {
            Ok(ForeignValue::Float(v)) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn runs_configured_function() {
        let config = AuxiliaryConfig {
            function: "sin".to_string(),
            args: vec![dec!(10)],
            on_failure: FailurePolicy::Abort,
        };
        let aux = AuxiliaryComputation::from_config(&config, CrossRuntimeBridge::builtin());

        assert_eq!(aux.policy(), FailurePolicy::Abort);
        assert_eq!(aux.function(), "sin");
        let value = aux.run().unwrap();
        assert!((value.to_f64().unwrap() - 10f64.sin()).abs() < 1e-9);
        assert_eq!(aux.native_value(), Some(10f64.sin()));
    }

    #[test]
    fn bridge_errors_pass_through() {
        let aux = AuxiliaryComputation::new(CrossRuntimeBridge::builtin(), "erf", vec![dec!(1)]);
        assert_eq!(aux.policy(), FailurePolicy::Proceed);
        assert!(matches!(aux.run(), Err(ComputationError::UnresolvedFunction { .. })));
        assert_eq!(aux.native_value(), None);
    }
}
