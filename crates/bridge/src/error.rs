//! Errors surfaced by bridge invocations.

use rust_decimal::Decimal;
use thiserror::Error;

/// Failure of a single bridge invocation.
///
/// Recoverable from the caller's point of view: it may fall back to a
/// native value or abort the calculation. Never retried by the bridge.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComputationError {
    /// The runtime could not import or look up the callable.
    #[error("Function '{function}' could not be resolved: {message}")]
    UnresolvedFunction { function: String, message: String },

    /// The callable raised.
    #[error("Function '{function}' failed: {message}")]
    Invocation { function: String, message: String },

    /// The callable returned something without a native numeric form.
    #[error("Function '{function}' returned an incompatible value: {message}")]
    IncompatibleReturn { function: String, message: String },

    /// A native argument has no representation in the runtime's float type.
    #[error("Argument {index} ({value}) of '{function}' cannot be converted to a float")]
    ArgumentConversion {
        function: String,
        index: usize,
        value: Decimal,
    },

    /// The runtime panicked while the lock was held.
    #[error("Function '{function}' panicked: {message}")]
    Panicked { function: String, message: String },
}

impl ComputationError {
    #[must_use]
    pub fn function(&self) -> &str {
        match self {
            Self::UnresolvedFunction { function, .. }
            | Self::Invocation { function, .. }
            | Self::IncompatibleReturn { function, .. }
            | Self::ArgumentConversion { function, .. }
            | Self::Panicked { function, .. } => function,
        }
    }
}
