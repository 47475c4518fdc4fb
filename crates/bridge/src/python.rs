//! Embedded CPython runtime.

use pyo3::prelude::*;
use pyo3::types::{PyBool, PyFloat, PyString, PyTuple};

use crate::runtime::{ForeignError, ForeignRuntime, ForeignValue};

/// Resolves functions as attributes of a Python module.
///
/// A dotted name (`"math.sin"`) names its own module; a bare name is looked
/// up in the default module.
#[derive(Debug, Clone)]
pub struct PythonRuntime {
    module: String,
}

impl PythonRuntime {
    #[must_use]
    pub fn new(module: &str) -> Self {
        Self {
            module: module.to_string(),
        }
    }

    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }
}

impl ForeignRuntime for PythonRuntime {
    fn name(&self) -> &str {
        "python"
    }

    fn call(&self, function: &str, args: &[f64]) -> Result<ForeignValue, ForeignError> {
        let (module_name, attribute) = function
            .rsplit_once('.')
            .unwrap_or((self.module.as_str(), function));

        Python::with_gil(|py| {
            let module = py
                .import_bound(module_name)
                .map_err(|e| ForeignError::Unresolved(e.to_string()))?;
            let callable = module
                .getattr(attribute)
                .map_err(|e| ForeignError::Unresolved(e.to_string()))?;
            let result = callable
                .call1(PyTuple::new_bound(py, args))
                .map_err(|e| ForeignError::Invocation(e.to_string()))?;
            Ok(classify(&result))
        })
    }
}

fn classify(value: &Bound<'_, PyAny>) -> ForeignValue {
    if value.is_none() {
        return ForeignValue::None;
    }
    // bool subclasses int, so it has to be checked first
    if value.is_instance_of::<PyBool>() {
        return value
            .extract::<bool>()
            .map_or_else(|_| other(value), ForeignValue::Bool);
    }
    if value.is_instance_of::<PyFloat>() {
        return value
            .extract::<f64>()
            .map_or_else(|_| other(value), ForeignValue::Float);
    }
    if value.is_instance_of::<PyString>() {
        return value
            .extract::<String>()
            .map_or_else(|_| other(value), ForeignValue::Text);
    }
    if let Ok(int) = value.extract::<i64>() {
        return ForeignValue::Int(int);
    }
    // numpy scalars and 0-d arrays expose __float__
    if let Ok(float) = value.extract::<f64>() {
        return ForeignValue::Float(float);
    }
    other(value)
}

fn other(value: &Bound<'_, PyAny>) -> ForeignValue {
    let type_name = value
        .get_type()
        .name()
        .map_or_else(|_| "unknown".to_string(), |name| name.to_string());
    ForeignValue::Other(type_name)
}
