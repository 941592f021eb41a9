use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::{
    callback::Callback,
    dispatch::{DispatchPolicy, Failures},
    error::{BindingError, DispatchError},
    params::Params,
    slot::{Fired, Slot},
    traits::{Dispatch, Listen, SignalOwner, check_binding},
};

/// Identity of a weakly held listener: the address of its `Arc` allocation.
///
/// The address stays reserved while any `Weak` to the allocation exists, so a slot's id cannot be
/// taken over by a new listener even after the old one has been dropped.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ListenerId(usize);

impl ListenerId {
    pub fn of<L: ?Sized>(listener: &Arc<L>) -> Self { Self(Arc::as_ptr(listener).cast::<()>() as usize) }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{:#x}", self.0) }
}

type WeakSlot<L> = Slot<Weak<L>, L>;

/// A signal that does not keep its listeners alive.
///
/// Listeners are registered as `Arc<L>` but only a `Weak` is retained. Once every strong reference
/// is gone the slot is dead: it no longer counts in [`Listen::num_listeners`] or
/// [`Listen::contains_listener`], and the next [`Dispatch::dispatch`] (or [`WeakSignal::prune`])
/// removes it without invoking it.
pub struct WeakSignal<L: ?Sized> {
    params: Params,
    policy: DispatchPolicy,
    slots: RwLock<HashMap<ListenerId, Arc<WeakSlot<L>>>>,
    next_seq: AtomicU64,
}

impl<L: ?Sized> Default for WeakSignal<L> {
    fn default() -> Self { Self::new(Params::new()) }
}

impl<L: ?Sized> WeakSignal<L> {
    pub fn new(params: Params) -> Self {
        Self { params, policy: DispatchPolicy::default(), slots: RwLock::new(HashMap::new()), next_seq: AtomicU64::new(0) }
    }

    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DispatchPolicy { self.policy }

    /// Removes every slot whose listener has been dropped; returns how many were removed
    pub fn prune(&self) -> usize {
        let pruned = {
            let mut slots = self.slots.write().expect("weak signal slots lock poisoned");
            let dead = slots.iter().filter(|(_, slot)| slot.listener.strong_count() == 0).map(|(id, _)| *id).collect::<Vec<_>>();
            dead.into_iter().filter_map(|id| slots.remove(&id)).collect::<Vec<_>>()
        };
        if !pruned.is_empty() {
            tracing::debug!("pruned {} reclaimed listener(s)", pruned.len());
        }
        pruned.len()
    }

    fn snapshot(&self) -> Vec<(ListenerId, Arc<WeakSlot<L>>)> {
        let slots = self.slots.read().expect("weak signal slots lock poisoned");
        let mut snapshot = slots.iter().map(|(id, slot)| (*id, Arc::clone(slot))).collect::<Vec<_>>();
        snapshot.sort_by_key(|(_, slot)| slot.seq());
        snapshot
    }

    fn is_current(&self, id: &ListenerId, slot: &Arc<WeakSlot<L>>) -> bool {
        let slots = self.slots.read().expect("weak signal slots lock poisoned");
        slots.get(id).is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    fn evict(&self, id: &ListenerId, slot: &Arc<WeakSlot<L>>) {
        let evicted = {
            let mut slots = self.slots.write().expect("weak signal slots lock poisoned");
            if slots.get(id).is_some_and(|current| Arc::ptr_eq(current, slot)) { slots.remove(id) } else { None }
        };
        drop(evicted);
    }
}

impl<L: ?Sized> Listen for WeakSignal<L> {
    type Listener = Arc<L>;
    type Target = L;

    fn params(&self) -> &Params { &self.params }

    fn connect(&self, listener: Arc<L>, callback: Callback<L>, once: bool) -> Result<Option<Arc<L>>, BindingError> {
        check_binding(&self.params, &callback)?;
        let id = ListenerId::of(&listener);
        let name = callback.name().to_string();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(Slot::new(Arc::downgrade(&listener), callback, once, seq));

        let previous = self.slots.write().expect("weak signal slots lock poisoned").insert(id, slot);
        match &previous {
            Some(_) => tracing::debug!("replaced weak listener {id} with {name} (once: {once})"),
            None => tracing::debug!("added weak listener {id} with {name} (once: {once})"),
        }
        Ok(previous.and_then(|slot| slot.listener.upgrade()))
    }

    fn remove(&self, listener: &Arc<L>) -> bool {
        let id = ListenerId::of(listener);
        let removed = self.slots.write().expect("weak signal slots lock poisoned").remove(&id);
        if removed.is_some() {
            tracing::debug!("removed weak listener {id}");
        }
        removed.is_some()
    }

    fn contains_listener(&self, listener: &Arc<L>) -> bool {
        let slots = self.slots.read().expect("weak signal slots lock poisoned");
        slots
            .get(&ListenerId::of(listener))
            .is_some_and(|slot| slot.listener.strong_count() > 0 && std::ptr::addr_eq(slot.listener.as_ptr(), Arc::as_ptr(listener)))
    }

    fn num_listeners(&self) -> usize {
        let slots = self.slots.read().expect("weak signal slots lock poisoned");
        slots.values().filter(|slot| slot.listener.strong_count() > 0).count()
    }
}

impl<L: ?Sized> Dispatch for WeakSignal<L> {
    fn dispatch(&self, args: &[&dyn Any]) -> Result<(), DispatchError> {
        let slots = self.snapshot();
        tracing::trace!("dispatching {} argument(s) to {} weak listener(s)", args.len(), slots.len());
        let mut failures = Failures::new(self.policy);
        for (id, slot) in slots {
            if !self.is_current(&id, &slot) {
                continue;
            }
            let Some(listener) = slot.listener.upgrade() else {
                self.evict(&id, &slot);
                tracing::debug!("evicted reclaimed listener {id}");
                continue;
            };
            match slot.fire(&listener, args) {
                Ok(Fired::Invoked) if slot.once() => {
                    self.evict(&id, &slot);
                    tracing::debug!("removed once-listener {id} after dispatch");
                }
                Ok(_) => {}
                Err(err) => failures.record(err)?,
            }
        }
        failures.finish()
    }
}

impl<L: ?Sized> SignalOwner for WeakSignal<L> {
    fn remove_all(&self) {
        let drained = std::mem::take(&mut *self.slots.write().expect("weak signal slots lock poisoned"));
        tracing::debug!("removed all {} weak listener slot(s)", drained.len());
        drop(drained);
    }
}

impl<L: ?Sized> std::fmt::Debug for WeakSignal<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakSignal").field("params", &self.params).field("listeners", &self.num_listeners()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IntoCallback;

    trait Named: Send + Sync {
        fn name(&self) -> &str;
    }

    struct Widget;
    impl Named for Widget {
        fn name(&self) -> &str { "widget" }
    }

    #[test]
    fn test_listener_id_survives_drop() {
        let listener = Arc::new(Widget);
        let weak = Arc::downgrade(&listener);
        let id = ListenerId::of(&listener);
        drop(listener);
        assert_eq!(id.0, weak.as_ptr() as usize);
    }

    #[test]
    fn test_unsized_listeners() {
        let signal = WeakSignal::<dyn Named>::default();
        let listener: Arc<dyn Named> = Arc::new(Widget);
        let callback: Callback<dyn Named> = (|named: &(dyn Named + 'static)| assert_eq!(named.name(), "widget")).into_callback();
        signal.connect(listener.clone(), callback, false).unwrap();
        assert!(signal.contains_listener(&listener));
        signal.dispatch(&[]).unwrap();
        assert_eq!(signal.num_listeners(), 1);
    }

    #[test]
    fn test_prune_drops_dead_slots() {
        let signal = WeakSignal::<Widget>::default();
        let kept = Arc::new(Widget);
        let dropped = Arc::new(Widget);
        signal.add(kept.clone(), |_: &Widget| {}).unwrap();
        signal.add(dropped.clone(), |_: &Widget| {}).unwrap();
        drop(dropped);
        assert_eq!(signal.num_listeners(), 1);
        assert_eq!(signal.prune(), 1);
        assert_eq!(signal.prune(), 0);
        assert!(signal.contains_listener(&kept));
    }
}
