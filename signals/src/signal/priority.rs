use std::any::Any;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::atomic::{self, AtomicU64};
use std::sync::{Arc, RwLock};

use super::{StrongSlot, dispatch_pass};
use crate::{
    callback::{Callback, IntoCallback},
    dispatch::DispatchPolicy,
    error::{BindingError, ConsistencyFault, DispatchError},
    params::Params,
    slot::Slot,
    traits::{Dispatch, Listen, SignalOwner, check_binding},
};

/// Position of a slot in the priority index.
///
/// Ascending order puts unprioritized slots first, then explicit priorities from low to high;
/// within one priority, later registrations sort lower. Dispatch walks the index in descending
/// order: highest priority first, ties in registration order, unprioritized last.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Rank<P> {
    priority: Option<P>,
    seq: u64,
}

impl<P: Ord> Ord for Rank<P> {
    fn cmp(&self, other: &Self) -> Ordering { self.priority.cmp(&other.priority).then_with(|| other.seq.cmp(&self.seq)) }
}

impl<P: Ord> PartialOrd for Rank<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

struct Entry<L, P> {
    rank: Rank<P>,
    slot: Arc<StrongSlot<L>>,
}

/// Two views of one slot set: keyed by listener, and ordered by rank
struct Queue<L, P> {
    registry: HashMap<L, Entry<L, P>>,
    index: BTreeMap<Rank<P>, Arc<StrongSlot<L>>>,
}

impl<L, P> Queue<L, P>
where
    L: Eq + Hash + Clone,
    P: Ord + Clone,
{
    /// Returns the displaced entry; the caller drops it once the lock is released
    fn insert(&mut self, listener: L, rank: Rank<P>, slot: Arc<StrongSlot<L>>) -> Option<Entry<L, P>> {
        let previous = self.registry.insert(listener, Entry { rank: rank.clone(), slot: Arc::clone(&slot) });
        if let Some(previous) = &previous {
            if self.index.remove(&previous.rank).is_none() {
                self.fault("replaced listener was missing from the priority index");
            }
        }
        self.index.insert(rank, slot);
        self.assert_in_sync();
        previous
    }

    /// Returns the registered key and its entry; the caller drops them once the lock is released
    fn remove(&mut self, listener: &L) -> Option<(L, Entry<L, P>)> {
        let (key, entry) = self.registry.remove_entry(listener)?;
        if self.index.remove(&entry.rank).is_none() {
            self.fault("removed listener was missing from the priority index");
        }
        self.assert_in_sync();
        Some((key, entry))
    }

    fn current(&self, slot: &Arc<StrongSlot<L>>) -> bool {
        self.registry.get(&slot.listener).is_some_and(|entry| Arc::ptr_eq(&entry.slot, slot))
    }

    fn drain(&mut self) -> (HashMap<L, Entry<L, P>>, BTreeMap<Rank<P>, Arc<StrongSlot<L>>>) {
        (std::mem::take(&mut self.registry), std::mem::take(&mut self.index))
    }

    fn verify(&self) -> Result<(), ConsistencyFault> {
        if self.registry.len() != self.index.len() {
            return Err(self.fault_report("registry and priority index sizes differ"));
        }
        for entry in self.registry.values() {
            if !self.index.get(&entry.rank).is_some_and(|slot| Arc::ptr_eq(slot, &entry.slot)) {
                return Err(self.fault_report("registered slot is missing from the priority index"));
            }
        }
        Ok(())
    }

    fn assert_in_sync(&self) {
        if self.registry.len() != self.index.len() {
            self.fault("registry and priority index sizes differ");
        }
    }

    fn fault_report(&self, detail: &'static str) -> ConsistencyFault {
        ConsistencyFault { registry: self.registry.len(), index: self.index.len(), detail }
    }

    fn fault(&self, detail: &'static str) -> ! {
        let fault = self.fault_report(detail);
        tracing::error!("{}", fault);
        panic!("{fault}");
    }
}

/// A [`Signal`](super::Signal) that dispatches to its listeners in priority order.
///
/// A higher value is a higher priority and fires first. Listeners added without a priority fire
/// after every prioritized listener. Listeners with equal priority fire in registration order.
///
/// ```
/// use signal_slots::*;
/// use std::sync::{Arc, Mutex};
///
/// let fired = Arc::new(Mutex::new(Vec::new()));
/// let signal = PrioritySignal::<&str, i32>::new(Params::new());
/// for (name, priority) in [("low", 0), ("high", 2), ("mid", 1)] {
///     let fired = fired.clone();
///     signal.add_with_priority(name, move |name: &&'static str| fired.lock().unwrap().push(*name), priority).unwrap();
/// }
/// signal.dispatch(&[]).unwrap();
/// assert_eq!(*fired.lock().unwrap(), ["high", "mid", "low"]);
/// ```
pub struct PrioritySignal<L, P> {
    params: Params,
    policy: DispatchPolicy,
    queue: RwLock<Queue<L, P>>,
    next_seq: AtomicU64,
}

impl<L, P> PrioritySignal<L, P>
where
    L: Eq + Hash + Clone,
    P: Ord + Clone,
{
    pub fn new(params: Params) -> Self { Self::with_capacity(0, params) }

    /// Creates a signal with room for `capacity` listeners before reallocating
    pub fn with_capacity(capacity: usize, params: Params) -> Self {
        Self {
            params,
            policy: DispatchPolicy::default(),
            queue: RwLock::new(Queue { registry: HashMap::with_capacity(capacity), index: BTreeMap::new() }),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DispatchPolicy { self.policy }

    pub fn add_with_priority<C, M>(&self, listener: L, callback: C, priority: P) -> Result<Option<L>, BindingError>
    where C: IntoCallback<L, M> {
        self.connect_with_priority(listener, callback.into_callback(), false, Some(priority))
    }

    pub fn add_once_with_priority<C, M>(&self, listener: L, callback: C, priority: P) -> Result<Option<L>, BindingError>
    where C: IntoCallback<L, M> {
        self.connect_with_priority(listener, callback.into_callback(), true, Some(priority))
    }

    /// Binds `callback` for `listener` at `priority` (`None` fires after all prioritized listeners).
    /// Returns the listener that was replaced.
    pub fn connect_with_priority(&self, listener: L, callback: Callback<L>, once: bool, priority: Option<P>) -> Result<Option<L>, BindingError> {
        check_binding(&self.params, &callback)?;
        let name = callback.name().to_string();
        let prioritized = priority.is_some();
        let seq = self.next_seq.fetch_add(1, atomic::Ordering::Relaxed);
        let slot = Arc::new(Slot::new(listener.clone(), callback, once, seq));

        let previous = self.queue.write().expect("priority queue lock poisoned").insert(listener, Rank { priority, seq }, slot);
        tracing::debug!(
            "{} priority listener slot {name} (prioritized: {prioritized}, once: {once})",
            if previous.is_some() { "replaced" } else { "added" }
        );
        Ok(previous.map(|entry| entry.slot.listener.clone()))
    }

    /// Checks that the registry and the priority index hold exactly the same slots
    pub fn verify_consistency(&self) -> Result<(), ConsistencyFault> { self.queue.read().expect("priority queue lock poisoned").verify() }

    /// Live slots from highest to lowest rank
    fn snapshot(&self) -> Vec<Arc<StrongSlot<L>>> {
        let queue = self.queue.read().expect("priority queue lock poisoned");
        queue.index.values().rev().cloned().collect()
    }

    fn is_current(&self, slot: &Arc<StrongSlot<L>>) -> bool { self.queue.read().expect("priority queue lock poisoned").current(slot) }

    fn evict(&self, slot: &Arc<StrongSlot<L>>) {
        let evicted = {
            let mut queue = self.queue.write().expect("priority queue lock poisoned");
            if queue.current(slot) { queue.remove(&slot.listener) } else { None }
        };
        if evicted.is_some() {
            tracing::debug!("removed once-listener {} after dispatch", slot.callback().name());
        }
    }
}

impl<L, P> Listen for PrioritySignal<L, P>
where
    L: Eq + Hash + Clone,
    P: Ord + Clone,
{
    type Listener = L;
    type Target = L;

    fn params(&self) -> &Params { &self.params }

    fn connect(&self, listener: L, callback: Callback<L>, once: bool) -> Result<Option<L>, BindingError> {
        self.connect_with_priority(listener, callback, once, None)
    }

    fn remove(&self, listener: &L) -> bool {
        let removed = self.queue.write().expect("priority queue lock poisoned").remove(listener);
        if let Some((_, entry)) = &removed {
            tracing::debug!("removed priority listener slot {}", entry.slot.callback().name());
        }
        removed.is_some()
    }

    fn contains_listener(&self, listener: &L) -> bool {
        let queue = self.queue.read().expect("priority queue lock poisoned");
        queue.registry.get(listener).is_some_and(|entry| entry.slot.listener == *listener)
    }

    fn num_listeners(&self) -> usize { self.queue.read().expect("priority queue lock poisoned").registry.len() }
}

impl<L, P> Dispatch for PrioritySignal<L, P>
where
    L: Eq + Hash + Clone,
    P: Ord + Clone,
{
    fn dispatch(&self, args: &[&dyn Any]) -> Result<(), DispatchError> {
        dispatch_pass(self.snapshot(), args, self.policy, |slot| self.is_current(slot), |slot| self.evict(slot))
    }
}

impl<L, P> SignalOwner for PrioritySignal<L, P>
where
    L: Eq + Hash + Clone,
    P: Ord + Clone,
{
    fn remove_all(&self) {
        let drained = self.queue.write().expect("priority queue lock poisoned").drain();
        tracing::debug!("removed all {} priority listener slot(s)", drained.0.len());
        drop(drained);
    }
}

impl<L, P> std::fmt::Debug for PrioritySignal<L, P>
where
    L: Eq + Hash + Clone,
    P: Ord + Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrioritySignal").field("params", &self.params).field("listeners", &self.num_listeners()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rank(priority: Option<i32>, seq: u64) -> Rank<i32> { Rank { priority, seq } }

    #[test]
    fn test_rank_order() {
        let mut ranks = vec![rank(Some(1), 0), rank(None, 1), rank(Some(5), 2), rank(Some(1), 3), rank(None, 4)];
        ranks.sort();
        ranks.reverse();
        assert_eq!(ranks, [rank(Some(5), 2), rank(Some(1), 0), rank(Some(1), 3), rank(None, 1), rank(None, 4)]);
    }

    #[test]
    fn test_fault_detected_when_views_diverge() {
        let signal = PrioritySignal::<u8, i32>::new(Params::new());
        signal.add_with_priority(1, |_: &u8| {}, 0).unwrap();
        signal.add(2, |_: &u8| {}).unwrap();
        assert!(signal.verify_consistency().is_ok());

        signal.queue.write().unwrap().index.clear();
        let fault = signal.verify_consistency().unwrap_err();
        assert_eq!((fault.registry, fault.index), (2, 0));
    }

    #[test]
    #[should_panic(expected = "missing from the priority index")]
    fn test_remove_fails_fast_on_divergence() {
        let signal = PrioritySignal::<u8, i32>::new(Params::new());
        signal.add_with_priority(1, |_: &u8| {}, 0).unwrap();
        signal.queue.write().unwrap().index.clear();
        signal.remove(&1);
    }

    #[test]
    #[should_panic(expected = "replaced listener was missing from the priority index")]
    fn test_replace_fails_fast_on_divergence() {
        let signal = PrioritySignal::<u8, i32>::new(Params::new());
        signal.add_with_priority(1, |_: &u8| {}, 0).unwrap();
        signal.queue.write().unwrap().index.clear();
        let _ = signal.add_with_priority(1, |_: &u8| {}, 1);
    }
}
