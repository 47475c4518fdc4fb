//! The serialized call path into a foreign runtime.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{const_mutex, Mutex};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::ComputationError;
use crate::runtime::{BuiltinRuntime, ForeignError, ForeignRuntime, ForeignValue};

/// Held by whichever call site is inside a foreign runtime.
static RUNTIME_LOCK: Mutex<()> = const_mutex(());

/// Typed adapter over a foreign runtime: `invoke(name, args) -> Decimal`.
///
/// Every bridge in the process, however it was built, takes the same lock,
/// so at most one invocation runs inside any runtime at any instant. The
/// lock is a scoped guard, released on every exit path including a panic
/// inside the runtime.
#[derive(Clone)]
pub struct CrossRuntimeBridge {
    runtime: Arc<dyn ForeignRuntime>,
}

impl CrossRuntimeBridge {
    pub fn new(runtime: impl ForeignRuntime + 'static) -> Self {
        Self {
            runtime: Arc::new(runtime),
        }
    }

    /// Bridge over the builtin runtime.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(BuiltinRuntime::new())
    }

    /// Bridge over the embedded Python interpreter, resolving names in `module`.
    #[cfg(feature = "python")]
    #[must_use]
    pub fn python(module: &str) -> Self {
        Self::new(crate::python::PythonRuntime::new(module))
    }

    #[must_use]
    pub fn runtime_name(&self) -> &str {
        self.runtime.name()
    }

    /// Whether some call site in the process is currently inside a runtime.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        RUNTIME_LOCK.is_locked()
    }

    /// Call `function` with `args` inside the runtime and convert the result.
    ///
    /// Blocks until the lock is available; there is no timeout.
    ///
    /// # Errors
    ///
    /// Returns a `ComputationError` carrying the runtime's message when the
    /// function cannot be resolved, fails, panics, or returns a value with no
    /// finite numeric form.
    pub fn invoke(&self, function: &str, args: &[Decimal]) -> Result<Decimal, ComputationError> {
        let foreign_args = to_foreign_args(function, args)?;

        let outcome = {
            let _guard = RUNTIME_LOCK.lock();
            panic::catch_unwind(AssertUnwindSafe(|| {
                self.runtime.call(function, &foreign_args)
            }))
        };

        let value = match outcome {
            Ok(Ok(value)) => value,
            Ok(Err(ForeignError::Unresolved(message))) => {
                return Err(ComputationError::UnresolvedFunction {
                    function: function.to_string(),
                    message,
                })
            }
            Ok(Err(ForeignError::Invocation(message))) => {
                return Err(ComputationError::Invocation {
                    function: function.to_string(),
                    message,
                })
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(
                    runtime = self.runtime.name(),
                    function,
                    message,
                    "Foreign runtime panicked"
                );
                return Err(ComputationError::Panicked {
                    function: function.to_string(),
                    message,
                });
            }
        };

        let result = to_native(function, value)?;
        debug!(
            runtime = self.runtime.name(),
            function,
            args = ?args,
            %result,
            "Bridge invocation complete"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for CrossRuntimeBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossRuntimeBridge")
            .field("runtime", &self.runtime.name())
            .field("locked", &self.is_locked())
            .finish()
    }
}

fn to_foreign_args(function: &str, args: &[Decimal]) -> Result<Vec<f64>, ComputationError> {
    args.iter()
        .enumerate()
        .map(|(index, value)| {
            value.to_f64().ok_or_else(|| ComputationError::ArgumentConversion {
                function: function.to_string(),
                index,
                value: *value,
            })
        })
        .collect()
}

fn to_native(function: &str, value: ForeignValue) -> Result<Decimal, ComputationError> {
    let converted = match &value {
        ForeignValue::Float(v) if v.is_finite() => Decimal::from_f64(*v),
        ForeignValue::Int(v) => Some(Decimal::from(*v)),
        _ => None,
    };
    converted.ok_or_else(|| ComputationError::IncompatibleReturn {
        function: function.to_string(),
        message: format!("expected a finite number, got {}", value.describe()),
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
