//! Error types for signal registration and dispatch.

use thiserror::Error;

use crate::params::Params;

/// Boxed error raised by a listener's own code
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Returned from `add`/`connect` when a callback cannot be bound to a signal.
#[derive(Debug, Error)]
pub enum BindingError {
    /// The callback's parameters differ from the signal's declared shape
    #[error("callback `{callback}` takes ({found}) but the signal dispatches ({expected})")]
    ShapeMismatch { callback: String, expected: Params, found: Params },

    /// No callback with this name was registered for the listener type
    #[error("no callback named `{callback}` for listener type `{listener_type}`")]
    UnknownCallback { listener_type: &'static str, callback: String },
}

/// Dispatch arguments that do not fit a declared shape.
#[derive(Debug, Clone, Error)]
#[error("expected arguments ({expected}), got {supplied} argument(s){}", .position.map(|p| format!(" with a mismatched type at position {p}")).unwrap_or_default())]
pub struct ArgumentMismatch {
    pub expected: Params,
    pub supplied: usize,
    /// First position whose type differs; `None` when the arity itself is wrong
    pub position: Option<usize>,
}

/// What an invocable reports back to the dispatch engine.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error(transparent)]
    Arguments(#[from] ArgumentMismatch),

    #[error(transparent)]
    Listener(BoxError),
}

impl InvokeError {
    pub fn listener(err: impl Into<BoxError>) -> Self { Self::Listener(err.into()) }
}

/// Failure of one or more listeners during `dispatch`.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The supplied arguments did not fit the callback; it was not invoked
    #[error("callback `{callback}` rejected {arity} argument(s): {source}")]
    Argument { callback: String, arity: usize, source: ArgumentMismatch },

    /// The callback ran and failed, or could not be reached
    #[error("callback `{callback}` failed with {arity} argument(s): {source}")]
    Invocation { callback: String, arity: usize, source: BoxError },

    /// Several listeners failed during one dispatch
    #[error("{} listeners failed during dispatch", .0.len())]
    Aggregate(Vec<DispatchError>),
}

impl DispatchError {
    /// Flattens this error into the individual listener failures it carries
    pub fn failures(&self) -> Vec<&DispatchError> {
        match self {
            Self::Aggregate(errors) => errors.iter().flat_map(|e| e.failures()).collect(),
            other => vec![other],
        }
    }
}

/// The registry and the priority index of a priority signal have diverged.
///
/// This is an internal invariant violation. Mutations treat it as fatal; it is only
/// returned as a value from `verify_consistency`.
#[derive(Debug, Clone, Error)]
#[error("registry/priority index out of sync ({registry} registered, {index} indexed): {detail}")]
pub struct ConsistencyFault {
    pub registry: usize,
    pub index: usize,
    pub detail: &'static str,
}
