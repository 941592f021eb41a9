pub mod priority;
pub mod weak;

pub use priority::*;
pub use weak::*;

use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::{
    callback::Callback,
    dispatch::{DispatchPolicy, Failures},
    error::{BindingError, DispatchError},
    params::Params,
    slot::{Fired, Slot},
    traits::{Dispatch, Listen, SignalOwner, check_binding},
};

pub(crate) type StrongSlot<L> = Slot<L, L>;

/// An event dispatcher for one kind of event.
///
/// Listeners register directly with the signal and are keyed by their own value: adding a listener
/// that is already registered replaces its slot and hands back the listener it displaced.
/// `dispatch` invokes every slot in registration order.
///
/// All operations take `&self`. Listener callbacks run with no internal lock held, so a callback may
/// add, remove, or dispatch on the signal that is invoking it (share the signal through an `Arc`).
/// Concurrent calls from several threads are memory safe but not serialized against each other;
/// wrap the signal in [`Synchronized`](crate::Synchronized) for that.
pub struct Signal<L> {
    params: Params,
    policy: DispatchPolicy,
    slots: RwLock<HashMap<L, Arc<StrongSlot<L>>>>,
    next_seq: AtomicU64,
}

impl<L> Default for Signal<L>
where L: Eq + Hash + Clone
{
    fn default() -> Self { Self::new(Params::new()) }
}

impl<L> Signal<L>
where L: Eq + Hash + Clone
{
    /// Creates a signal that dispatches arguments of the given shape
    pub fn new(params: Params) -> Self {
        Self { params, policy: DispatchPolicy::default(), slots: RwLock::new(HashMap::new()), next_seq: AtomicU64::new(0) }
    }

    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DispatchPolicy { self.policy }

    /// Live slots in registration order
    fn snapshot(&self) -> Vec<Arc<StrongSlot<L>>> {
        let slots = self.slots.read().expect("signal slots lock poisoned");
        let mut snapshot = slots.values().cloned().collect::<Vec<_>>();
        snapshot.sort_by_key(|slot| slot.seq());
        snapshot
    }

    fn is_current(&self, slot: &Arc<StrongSlot<L>>) -> bool {
        let slots = self.slots.read().expect("signal slots lock poisoned");
        slots.get(&slot.listener).is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Removes `slot` unless it was already removed or replaced
    fn evict(&self, slot: &Arc<StrongSlot<L>>) {
        let evicted = {
            let mut slots = self.slots.write().expect("signal slots lock poisoned");
            if slots.get(&slot.listener).is_some_and(|current| Arc::ptr_eq(current, slot)) {
                slots.remove_entry(&slot.listener)
            } else {
                None
            }
        };
        if evicted.is_some() {
            tracing::debug!("removed once-listener {} after dispatch", slot.callback().name());
        }
    }
}

/// Invokes a snapshot of strong slots, skipping any slot that stopped being current since the
/// snapshot was taken and evicting once-slots after they fire.
pub(crate) fn dispatch_pass<L>(
    slots: Vec<Arc<StrongSlot<L>>>,
    args: &[&dyn Any],
    policy: DispatchPolicy,
    is_current: impl Fn(&Arc<StrongSlot<L>>) -> bool,
    evict: impl Fn(&Arc<StrongSlot<L>>),
) -> Result<(), DispatchError> {
    tracing::trace!("dispatching {} argument(s) to {} listener(s)", args.len(), slots.len());
    let mut failures = Failures::new(policy);
    for slot in slots {
        // removed or replaced by an earlier listener during this pass
        if !is_current(&slot) {
            continue;
        }
        match slot.fire(&slot.listener, args) {
            Ok(Fired::Invoked) if slot.once() => evict(&slot),
            Ok(_) => {}
            Err(err) => failures.record(err)?,
        }
    }
    failures.finish()
}

impl<L> Listen for Signal<L>
where L: Eq + Hash + Clone
{
    type Listener = L;
    type Target = L;

    fn params(&self) -> &Params { &self.params }

    fn connect(&self, listener: L, callback: Callback<L>, once: bool) -> Result<Option<L>, BindingError> {
        check_binding(&self.params, &callback)?;
        let name = callback.name().to_string();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(Slot::new(listener.clone(), callback, once, seq));

        let previous = self.slots.write().expect("signal slots lock poisoned").insert(listener, slot);
        match &previous {
            Some(_) => tracing::debug!("replaced listener slot with {name} (once: {once})"),
            None => tracing::debug!("added listener slot {name} (once: {once})"),
        }
        Ok(previous.map(|slot| slot.listener.clone()))
    }

    fn remove(&self, listener: &L) -> bool {
        let removed = self.slots.write().expect("signal slots lock poisoned").remove_entry(listener);
        if let Some((_, slot)) = &removed {
            tracing::debug!("removed listener slot {}", slot.callback().name());
        }
        removed.is_some()
    }

    fn contains_listener(&self, listener: &L) -> bool {
        let slots = self.slots.read().expect("signal slots lock poisoned");
        slots.get(listener).is_some_and(|slot| slot.listener == *listener)
    }

    fn num_listeners(&self) -> usize { self.slots.read().expect("signal slots lock poisoned").len() }
}

impl<L> Dispatch for Signal<L>
where L: Eq + Hash + Clone
{
    fn dispatch(&self, args: &[&dyn Any]) -> Result<(), DispatchError> {
        dispatch_pass(self.snapshot(), args, self.policy, |slot| self.is_current(slot), |slot| self.evict(slot))
    }
}

impl<L> SignalOwner for Signal<L>
where L: Eq + Hash + Clone
{
    fn remove_all(&self) {
        // listeners and callback state are dropped after the lock is released
        let drained = std::mem::take(&mut *self.slots.write().expect("signal slots lock poisoned"));
        tracing::debug!("removed all {} listener slot(s)", drained.len());
        drop(drained);
    }
}

impl<L> std::fmt::Debug for Signal<L>
where L: Eq + Hash + Clone
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal").field("params", &self.params).field("listeners", &self.num_listeners()).finish()
    }
}
