//! Exclusive, typed access to numeric routines implemented in a foreign runtime.
//!
//! The runtime is not safe for concurrent entry, so every invocation goes
//! through [`CrossRuntimeBridge::invoke`]. It serializes access across the
//! whole process, converts arguments and results at the boundary, and maps
//! every runtime failure to a [`ComputationError`].

pub mod bridge;
pub mod error;
#[cfg(feature = "python")]
pub mod python;
pub mod runtime;

pub use bridge::CrossRuntimeBridge;
pub use error::ComputationError;
#[cfg(feature = "python")]
pub use python::PythonRuntime;
pub use runtime::{BuiltinRuntime, ForeignError, ForeignRuntime, ForeignValue};
