use std::any::Any;

use crate::{
    callback::{Callback, IntoCallback},
    error::{BindingError, DispatchError},
    params::Params,
};

/// Registration side of a signal. Dyn object safe.
pub trait Listen {
    /// What callers register and remove: the listener itself, or a shared handle to it
    type Listener;
    /// What callbacks receive when the signal dispatches
    type Target: ?Sized;

    /// The argument shape this signal dispatches with
    fn params(&self) -> &Params;

    /// Binds `callback` for `listener`, replacing any slot the listener already has.
    /// Returns the listener that was replaced.
    fn connect(&self, listener: Self::Listener, callback: Callback<Self::Target>, once: bool) -> Result<Option<Self::Listener>, BindingError>;

    /// Removes the listener's slot; `true` iff one was removed
    fn remove(&self, listener: &Self::Listener) -> bool;

    fn contains_listener(&self, listener: &Self::Listener) -> bool;

    /// Number of live slots
    fn num_listeners(&self) -> usize;

    fn add<C, M>(&self, listener: Self::Listener, callback: C) -> Result<Option<Self::Listener>, BindingError>
    where
        C: IntoCallback<Self::Target, M>,
        Self: Sized,
    {
        self.connect(listener, callback.into_callback(), false)
    }

    /// Like [`Listen::add`], but the slot is removed after its first successful invocation
    fn add_once<C, M>(&self, listener: Self::Listener, callback: C) -> Result<Option<Self::Listener>, BindingError>
    where
        C: IntoCallback<Self::Target, M>,
        Self: Sized,
    {
        self.connect(listener, callback.into_callback(), true)
    }
}

/// Broadcast side of a signal. Dyn object safe.
pub trait Dispatch {
    /// Synchronously invokes every live slot with `args`
    fn dispatch(&self, args: &[&dyn Any]) -> Result<(), DispatchError>;
}

/// Full control over a signal: registration, dispatch, and clearing.
pub trait SignalOwner: Listen + Dispatch {
    fn remove_all(&self);
}

/// Rejects callbacks whose shape differs from the signal's
pub(crate) fn check_binding<T: ?Sized>(params: &Params, callback: &Callback<T>) -> Result<(), BindingError> {
    if callback.params() == params {
        Ok(())
    } else {
        Err(BindingError::ShapeMismatch { callback: callback.name().to_string(), expected: params.clone(), found: callback.params().clone() })
    }
}
