use std::any::Any;

use parking_lot::ReentrantMutex;

use crate::{
    callback::Callback,
    error::{BindingError, DispatchError},
    params::Params,
    traits::{Dispatch, Listen, SignalOwner},
};

/// Wraps a signal so that no two operations on it run at the same time.
///
/// Every call takes one lock for its whole duration, including the full listener sweep of
/// `dispatch`; a slow listener therefore blocks every other caller of this wrapper. The lock is
/// reentrant, so a listener invoked by a wrapped dispatch may call back into the same wrapper on
/// its own thread. Sequences of calls are not atomic unless run inside [`Synchronized::with`], and
/// the wrapped signal is unprotected when reached through any other reference.
pub struct Synchronized<S> {
    lock: ReentrantMutex<()>,
    inner: S,
}

/// Creates a synchronized signal from the given signal
pub fn synchronized<S: SignalOwner>(signal: S) -> Synchronized<S> { Synchronized::new(signal) }

impl<S> Synchronized<S> {
    pub fn new(inner: S) -> Self { Self { lock: ReentrantMutex::new(()), inner } }

    /// Runs `f` against the wrapped signal while holding the lock.
    /// Use this for compound operations, or for calls specific to the wrapped signal type.
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let _guard = self.lock.lock();
        f(&self.inner)
    }

    pub fn into_inner(self) -> S { self.inner }
}

impl<S: Listen> Listen for Synchronized<S> {
    type Listener = S::Listener;
    type Target = S::Target;

    // immutable after construction
    fn params(&self) -> &Params { self.inner.params() }

    fn connect(&self, listener: S::Listener, callback: Callback<S::Target>, once: bool) -> Result<Option<S::Listener>, BindingError> {
        self.with(|inner| inner.connect(listener, callback, once))
    }

    fn remove(&self, listener: &S::Listener) -> bool { self.with(|inner| inner.remove(listener)) }

    fn contains_listener(&self, listener: &S::Listener) -> bool { self.with(|inner| inner.contains_listener(listener)) }

    fn num_listeners(&self) -> usize { self.with(|inner| inner.num_listeners()) }
}

impl<S: Dispatch> Dispatch for Synchronized<S> {
    fn dispatch(&self, args: &[&dyn Any]) -> Result<(), DispatchError> { self.with(|inner| inner.dispatch(args)) }
}

impl<S: SignalOwner> SignalOwner for Synchronized<S> {
    fn remove_all(&self) { self.with(|inner| inner.remove_all()) }
}

impl<S: std::fmt::Debug> std::fmt::Debug for Synchronized<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { self.with(|inner| f.debug_tuple("Synchronized").field(inner).finish()) }
}
