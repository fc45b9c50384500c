//! Background-thread writes are marshaled onto the consumer thread.

use parking_lot::Mutex;
use signal_bindings::prelude::*;
use signal_bindings::ConsumerQueue;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;

#[test]
fn background_set_is_delivered_on_consumer_thread() {
    let mut queue = ConsumerQueue::new();
    queue.install().unwrap();
    let consumer = thread::current().id();

    let status = Observable::new(String::from("idle"));
    let delivered = Rc::new(RefCell::new(Vec::new()));
    let delivered_on = Arc::new(Mutex::new(Vec::new()));
    let mut bindings = BindingManager::new();
    bindings.bind(
        {
            let status = status.clone();
            move || status.get()
        },
        {
            let delivered = delivered.clone();
            let delivered_on = delivered_on.clone();
            move |text| {
                delivered_on.lock().push(thread::current().id());
                delivered.borrow_mut().push(text);
            }
        },
    );

    let worker = {
        let status = status.clone();
        thread::spawn(move || {
            status.set("loading".into());
            status.set("loaded".into());
        })
    };
    worker.join().unwrap();

    // Both writes coalesce into a single pending recompute.
    assert_eq!(queue.run_pending(), 1);
    assert_eq!(*delivered.borrow(), vec!["idle", "loaded"]);
    assert!(delivered_on.lock().iter().all(|id| *id == consumer));

    // Writes on the consumer thread itself are delivered inline.
    status.set("done".into());
    assert_eq!(queue.run_pending(), 0);
    assert_eq!(delivered.borrow().last().map(String::as_str), Some("done"));

    // Work queued for bindings that are gone by the time it runs is dropped.
    let worker = {
        let status = status.clone();
        thread::spawn(move || status.set("late".into()))
    };
    worker.join().unwrap();
    bindings.unbind();
    assert_eq!(queue.run_pending(), 1);
    assert_eq!(delivered.borrow().len(), 3);
}
