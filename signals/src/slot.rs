use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::callback::Callback;
use crate::error::DispatchError;

/// Binding of one listener reference to its callback.
///
/// `R` is how the slot holds its listener (the listener itself, or a `Weak` to it),
/// `T` is what the callback receives.
pub(crate) struct Slot<R, T: ?Sized> {
    pub(crate) listener: R,
    callback: Callback<T>,
    once: bool,
    /// Registration order within the owning signal
    seq: u64,
    /// Set while a once-slot is being (or has been) invoked
    claimed: AtomicBool,
}

/// Outcome of [`Slot::fire`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fired {
    /// The callback ran; a once-slot must now be evicted
    Invoked,
    /// A once-slot already claimed by an enclosing or concurrent dispatch
    Skipped,
}

impl<R, T: ?Sized> Slot<R, T> {
    pub fn new(listener: R, callback: Callback<T>, once: bool, seq: u64) -> Self {
        Self { listener, callback, once, seq, claimed: AtomicBool::new(false) }
    }

    pub fn once(&self) -> bool { self.once }

    pub fn seq(&self) -> u64 { self.seq }

    pub fn callback(&self) -> &Callback<T> { &self.callback }

    /// Invokes the callback with `target`.
    ///
    /// A once-slot fires at most one time: it is claimed before the call, and the claim is
    /// released again only when the call fails, so it stays eligible for the next dispatch.
    pub fn fire(&self, target: &T, args: &[&dyn Any]) -> Result<Fired, DispatchError> {
        if self.once && self.claimed.swap(true, Ordering::AcqRel) {
            return Ok(Fired::Skipped);
        }
        tracing::trace!("invoking {} (once: {})", self.callback.name(), self.once);
        match self.callback.invoke(target, args) {
            Ok(()) => Ok(Fired::Invoked),
            Err(err) => {
                if self.once {
                    self.claimed.store(false, Ordering::Release);
                }
                Err(err)
            }
        }
    }
}
