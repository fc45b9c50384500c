//! Per-element ownership of output (model → view) and input (view → model)
//! subscriptions.

use crate::computed::{Computed, ComputedSubscription};
use std::fmt;

/// Handle for an event handler connected to a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

/// The view → model side of a binding, implemented by each adapter.
///
/// `subscribe` connects the adapter's event handlers; `unsubscribe`
/// disconnects them.
pub trait InputSubscription {
    fn subscribe(&mut self);
    fn unsubscribe(&mut self);
}

struct BindingEntry {
    output: Option<ComputedSubscription>,
    input: Option<Box<dyn InputSubscription>>,
}

impl BindingEntry {
    fn release(&mut self) {
        if let Some(mut output) = self.output.take() {
            output.unsubscribe();
        }
        if let Some(mut input) = self.input.take() {
            input.unsubscribe();
        }
    }
}

/// Owns every subscription bound to one UI element.
///
/// A manager is created when its element is realized and unbound when the
/// element is recycled away or destroyed. [`BindingManager::unbind`] is
/// idempotent, and dropping the manager unbinds it.
///
/// ```rust,no_run
/// use signal_bindings::prelude::*;
///
/// let title = Observable::new(String::from("Inbox"));
/// let mut bindings = BindingManager::new();
/// bindings.bind(
///     {
///         let title = title.clone();
///         move || title.get()
///     },
///     |text| println!("title: {text}"),
/// );
/// bindings.unbind();
/// ```
#[derive(Default)]
pub struct BindingManager {
    bindings: Vec<BindingEntry>,
}

impl BindingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `getter` to `setter`: evaluate now, deliver the value, and deliver
    /// again whenever an observable read by `getter` changes.
    pub fn bind<T: Clone + 'static>(
        &mut self,
        getter: impl Fn() -> T + 'static,
        setter: impl Fn(T) + 'static,
    ) {
        let output = Computed::new(getter).subscribe(setter);
        self.push(Some(output), None);
    }

    /// Bind an output as with [`bind`](Self::bind) and activate `input`.
    pub fn bind_two_way<T: Clone + 'static>(
        &mut self,
        getter: impl Fn() -> T + 'static,
        setter: impl Fn(T) + 'static,
        mut input: impl InputSubscription + 'static,
    ) {
        input.subscribe();
        let output = Computed::new(getter).subscribe(setter);
        self.push(Some(output), Some(Box::new(input)));
    }

    /// Activate an input subscription with no output side.
    pub fn bind_input(&mut self, mut input: impl InputSubscription + 'static) {
        input.subscribe();
        self.push(None, Some(Box::new(input)));
    }

    /// Tear down every binding. Former callbacks are never invoked again.
    /// Calling this on an unbound manager does nothing.
    pub fn unbind(&mut self) {
        if self.bindings.is_empty() {
            return;
        }
        let count = self.bindings.len();
        for mut entry in self.bindings.drain(..) {
            entry.release();
        }
        tracing::debug!(count, "bindings released");
    }

    /// Number of live bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn push(
        &mut self,
        output: Option<ComputedSubscription>,
        input: Option<Box<dyn InputSubscription>>,
    ) {
        self.bindings.push(BindingEntry { output, input });
        tracing::trace!(count = self.bindings.len(), "binding added");
    }
}

impl Drop for BindingManager {
    fn drop(&mut self) {
        self.unbind();
    }
}

impl fmt::Debug for BindingManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingManager")
            .field("bindings", &self.bindings.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::init_scheduler;
    use crate::Observable;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Records subscribe/unsubscribe calls.
    struct FakeInput {
        active: Rc<Cell<bool>>,
        unsubscribed: Rc<Cell<u32>>,
    }

    fn fake_input() -> (FakeInput, Rc<Cell<bool>>, Rc<Cell<u32>>) {
        let active = Rc::new(Cell::new(false));
        let unsubscribed = Rc::new(Cell::new(0));
        let input = FakeInput {
            active: active.clone(),
            unsubscribed: unsubscribed.clone(),
        };
        (input, active, unsubscribed)
    }

    impl InputSubscription for FakeInput {
        fn subscribe(&mut self) {
            self.active.set(true);
        }

        fn unsubscribe(&mut self) {
            self.active.set(false);
            self.unsubscribed.set(self.unsubscribed.get() + 1);
        }
    }

    #[test]
    fn test_bind_delivers_and_tracks() {
        init_scheduler();
        let name = Observable::new(String::from("a"));
        let label = Rc::new(RefCell::new(String::new()));
        let mut bindings = BindingManager::new();
        bindings.bind(
            {
                let name = name.clone();
                move || name.get().to_uppercase()
            },
            {
                let label = label.clone();
                move |text| *label.borrow_mut() = text
            },
        );
        assert_eq!(*label.borrow(), "A");

        name.set("b".into());
        assert_eq!(*label.borrow(), "B");
        assert_eq!(bindings.len(), 1);
    }

    #[test]
    fn test_bind_input_activates_immediately() {
        init_scheduler();
        let (input, active, _) = fake_input();
        let mut bindings = BindingManager::new();
        bindings.bind_input(input);
        assert!(active.get());

        bindings.unbind();
        assert!(!active.get());
    }

    #[test]
    fn test_unbind_stops_delivery_and_is_idempotent() {
        init_scheduler();
        let count = Observable::new(0);
        let calls = Rc::new(Cell::new(0));
        let (input, active, unsubscribed) = fake_input();
        let mut bindings = BindingManager::new();
        bindings.bind_two_way(
            {
                let count = count.clone();
                move || count.get()
            },
            {
                let calls = calls.clone();
                move |_| calls.set(calls.get() + 1)
            },
            input,
        );
        assert!(active.get());
        assert_eq!(calls.get(), 1);

        bindings.unbind();
        bindings.unbind();
        assert_eq!(unsubscribed.get(), 1);
        assert_eq!(count.dependent_count(), 0);

        count.set(5);
        assert_eq!(calls.get(), 1);
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_rebind_after_unbind() {
        init_scheduler();
        let count = Observable::new(1);
        let seen = Rc::new(Cell::new(0));
        let mut bindings = BindingManager::new();
        bindings.bind(
            {
                let count = count.clone();
                move || count.get()
            },
            |_| {},
        );
        bindings.unbind();

        bindings.bind(
            {
                let count = count.clone();
                move || count.get()
            },
            {
                let seen = seen.clone();
                move |value| seen.set(value)
            },
        );
        count.set(7);
        assert_eq!(seen.get(), 7);
    }

    #[test]
    fn test_drop_unbinds() {
        init_scheduler();
        let count = Observable::new(0);
        let (input, active, _) = fake_input();
        {
            let mut bindings = BindingManager::new();
            bindings.bind_two_way(
                {
                    let count = count.clone();
                    move || count.get()
                },
                |_| {},
                input,
            );
            assert_eq!(count.dependent_count(), 1);
        }
        assert_eq!(count.dependent_count(), 0);
        assert!(!active.get());
    }
}
