mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use common::init_tracing;
use signal_slots::*;
use tokio_test::assert_ok;

#[derive(Clone, PartialEq, Eq, Hash)]
struct Worker(usize);

#[test]
fn test_concurrent_adds_and_dispatches() {
    init_tracing();
    let signal = Arc::new(synchronized(PrioritySignal::<Worker, usize>::new(params![usize])));
    let total = Arc::new(AtomicUsize::new(0));

    let handles = (0..8)
        .map(|batch| {
            let signal = signal.clone();
            let total = total.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    let total = total.clone();
                    let worker = Worker(batch * 100 + i);
                    let count = move |_: &Worker, n: &usize| {
                        total.fetch_add(*n, Ordering::SeqCst);
                    };
                    signal.with(|inner| inner.add_with_priority(worker, count, i)).unwrap();
                    signal.dispatch(&[&0usize]).unwrap();
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(signal.num_listeners(), 200);
    assert_ok!(signal.dispatch(&[&1usize]));
    assert_eq!(total.load(Ordering::SeqCst), 200);
    assert_ok!(signal.with(|inner| inner.verify_consistency()));
}

#[test]
fn test_wrapper_is_a_signal_owner() {
    fn drain(owner: &dyn SignalOwner<Listener = Worker, Target = Worker>) {
        owner.remove_all();
    }

    let signal = synchronized(Signal::<Worker>::new(params![]));
    assert_ok!(signal.add(Worker(1), |_: &Worker| {}));
    assert!(signal.contains_listener(&Worker(1)));
    drain(&signal);
    assert_eq!(signal.num_listeners(), 0);
}
