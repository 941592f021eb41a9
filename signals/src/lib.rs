/*!
Synchronous event-dispatch signals with a listener registry

A signal is an event dispatcher for one kind of event. Listeners register directly with the signal,
each with a callback, and `dispatch` invokes every registered callback in-line on the caller's thread.

# Design requirements:
- A listener has at most one slot per signal; re-adding replaces the slot and hands back the old listener
- Callbacks are bound to one listener type and one argument shape, checked when they are added
- `Listen`, `Dispatch` and `SignalOwner` are dyn object safe
- Listeners may add, remove, or dispatch on the signal that is currently invoking them
- Once-listeners fire at most once, even when dispatches nest
- Weak signals never keep a listener alive
- Locking across whole calls is opt-in through `Synchronized`

# Variants
- [`Signal`] - registration order
- [`PrioritySignal`] - highest priority first, unprioritized listeners last
- [`WeakSignal`] - holds listeners weakly, evicts them once they are dropped
- [`Synchronized`] - wraps any of the above behind one reentrant lock

# Basic usage

```rust
use signal_slots::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

let score = Arc::new(AtomicU32::new(0));
let signal = Signal::new(params![u32]);
let total = score.clone();
signal.add("scoreboard", move |_: &&'static str, points: &u32| {
    total.fetch_add(*points, Ordering::SeqCst);
}).unwrap();

signal.dispatch(&[&10u32]).unwrap();
signal.dispatch(&[&5u32]).unwrap();
assert_eq!(score.load(Ordering::SeqCst), 15);

// wrong argument shape: the callback is not invoked
assert!(signal.dispatch(&[&"ten"]).is_err());
assert_eq!(score.load(Ordering::SeqCst), 15);
```

# Weak listeners

```rust
use signal_slots::*;
use std::sync::Arc;

struct Hud;

let signal = WeakSignal::<Hud>::new(params![String]);
let hud = Arc::new(Hud);
signal.add_once(hud.clone(), |_: &Hud, message: &String| println!("hud: {message}")).unwrap();
assert_eq!(signal.num_listeners(), 1);

drop(hud);
assert_eq!(signal.num_listeners(), 0);
signal.dispatch(&[&"game over".to_string()]).unwrap();
```
*/

mod callback;
mod dispatch;
mod error;
mod params;
mod signal;
mod slot;
mod sync;
mod traits;

pub use callback::*;
pub use dispatch::DispatchPolicy;
pub use error::*;
pub use params::*;
pub use signal::*;
pub use sync::*;
pub use traits::*;
