//! The foreign-runtime seam and the builtin runtime.
//!
//! A runtime resolves a callable by name, calls it with float arguments and
//! reports back a loosely typed value. Conversion to native numerics and
//! serialization of access are the bridge's job, not the runtime's.

use std::collections::HashMap;

use thiserror::Error;

/// A value as the foreign runtime produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum ForeignValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(String),
    None,
    /// Anything else, described by its foreign type name.
    Other(String),
}

impl ForeignValue {
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Float(v) => format!("float {v}"),
            Self::Int(v) => format!("int {v}"),
            Self::Bool(v) => format!("bool {v}"),
            Self::Text(v) => format!("str {v:?}"),
            Self::None => "None".to_string(),
            Self::Other(type_name) => format!("object of type {type_name}"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForeignError {
    #[error("{0}")]
    Unresolved(String),
    #[error("{0}")]
    Invocation(String),
}

/// A numeric runtime the bridge can call into.
///
/// Implementations may assume calls are never concurrent: every bridge holds
/// the same process-wide lock for the whole duration of `call`.
pub trait ForeignRuntime: Send + Sync {
    fn name(&self) -> &str;

    /// Resolve `function` and call it with `args`.
    ///
    /// # Errors
    ///
    /// `ForeignError::Unresolved` if the name cannot be resolved,
    /// `ForeignError::Invocation` if the call itself fails.
    fn call(&self, function: &str, args: &[f64]) -> Result<ForeignValue, ForeignError>;
}

type NativeFn = Box<dyn Fn(&[f64]) -> Result<ForeignValue, String> + Send + Sync>;

/// In-process runtime backed by Rust closures.
pub struct BuiltinRuntime {
    functions: HashMap<String, NativeFn>,
}

impl BuiltinRuntime {
    /// Runtime preloaded with the usual elementary functions.
    #[must_use]
    pub fn new() -> Self {
        let mut runtime = Self::empty();
        runtime.register_unary("sin", f64::sin);
        runtime.register_unary("cos", f64::cos);
        runtime.register_unary("tan", f64::tan);
        runtime.register_unary("exp", f64::exp);
        runtime.register_unary("log", f64::ln);
        runtime.register_unary("ln", f64::ln);
        runtime.register_unary("log10", f64::log10);
        runtime.register_unary("sqrt", f64::sqrt);
        runtime.register_unary("abs", f64::abs);
        runtime.register_unary("floor", f64::floor);
        runtime.register_unary("ceil", f64::ceil);
        runtime.register("pow", |args| match args {
            [base, exponent] => Ok(ForeignValue::Float(base.powf(*exponent))),
            _ => Err(format!("pow() takes 2 arguments, got {}", args.len())),
        });
        runtime
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Add or replace a function.
    pub fn register<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&[f64]) -> Result<ForeignValue, String> + Send + Sync + 'static,
    {
        self.functions.insert(name.to_string(), Box::new(function));
    }

    fn register_unary(&mut self, name: &'static str, function: fn(f64) -> f64) {
        self.register(name, move |args| match args {
            [x] => Ok(ForeignValue::Float(function(*x))),
            _ => Err(format!("{name}() takes 1 argument, got {}", args.len())),
        });
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

impl Default for BuiltinRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BuiltinRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("BuiltinRuntime").field("functions", &names).finish()
    }
}

impl ForeignRuntime for BuiltinRuntime {
    fn name(&self) -> &str {
        "builtin"
    }

    fn call(&self, function: &str, args: &[f64]) -> Result<ForeignValue, ForeignError> {
        let callable = self
            .functions
            .get(function)
            .ok_or_else(|| ForeignError::Unresolved(format!("no function named '{function}'")))?;
        callable(args).map_err(ForeignError::Invocation)
    }
}
