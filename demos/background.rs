//! Background Update Example
//!
//! Demonstrates setting observables from worker threads while every view
//! update runs on the consumer thread.

use signal_bindings::prelude::*;
use signal_bindings::ConsumerQueue;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut queue = ConsumerQueue::new();
    queue.install().expect("initialized once");

    let user: Observable<Option<String>> = Observable::new(None);
    let loading = Observable::new(false);

    let mut bindings = BindingManager::new();
    bindings.bind(
        {
            let (user, loading) = (user.clone(), loading.clone());
            move || match (loading.get(), user.get()) {
                (true, _) => String::from("Loading..."),
                (false, Some(name)) => format!("User: {name}"),
                (false, None) => String::from("No user loaded"),
            }
        },
        |text| println!("[{}] {text}", thread::current().name().unwrap_or("consumer")),
    );

    loading.set(true);
    let worker = thread::Builder::new()
        .name("fetch".into())
        .spawn({
            let (user, loading) = (user.clone(), loading.clone());
            move || {
                thread::sleep(Duration::from_millis(200));
                let name = if rand::random() { "Alice (Admin)" } else { "Bob (User)" };
                user.set(Some(name.to_string()));
                loading.set(false);
            }
        })
        .expect("spawn fetch thread");

    // The scheduler keeps a dispatcher alive for the life of the process, so
    // drive the queue from the loop instead of awaiting `run`.
    while !worker.is_finished() {
        queue.run_pending();
        thread::sleep(Duration::from_millis(10));
    }
    worker.join().expect("fetch thread");
    queue.run_pending();
    bindings.unbind();
}
