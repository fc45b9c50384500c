//! Scheduling before `Scheduler::initialize` fails fast.

use signal_bindings::prelude::*;

#[test]
#[should_panic(expected = "used before Scheduler::initialize")]
fn begin_before_initialize_panics() {
    let _batch = Scheduler::begin();
}

#[test]
#[should_panic(expected = "used before Scheduler::initialize")]
fn invalidation_before_initialize_panics() {
    let count = Observable::new(0);
    let mut bindings = BindingManager::new();
    bindings.bind(
        {
            let count = count.clone();
            move || count.get()
        },
        |_| {},
    );
    count.set(1);
}

#[test]
fn unbound_writes_need_no_scheduler() {
    let count = Observable::new(0);
    count.set(1);
    assert_eq!(count.get(), 1);
    assert!(!Scheduler::is_initialized());
}
