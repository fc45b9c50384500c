//! Observable cells: mutable values that participate in dependency tracking.

use crate::scheduler;
use crate::storage::{self, ComputedId, Dependency, ObservableId};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;

struct ObservableInner<T> {
    id: ObservableId,
    value: RwLock<T>,
    /// Non-owning references to the evaluations that read this cell, in the
    /// order they first read it.
    dependents: Mutex<Vec<ComputedId>>,
}

impl<T: Send + Sync> Dependency for ObservableInner<T> {
    fn add_dependent(&self, id: ComputedId) {
        let mut dependents = self.dependents.lock();
        if !dependents.contains(&id) {
            dependents.push(id);
        }
    }

    fn remove_dependent(&self, id: ComputedId) {
        self.dependents.lock().retain(|dependent| *dependent != id);
    }
}

/// A model property that participates in dependency tracking.
///
/// Reading an observable while a computed evaluation is running records it
/// as a dependency of that evaluation. Writing a value that differs from the
/// current one invalidates every dependent evaluation.
///
/// Observables are cheap to clone; clones share the same cell. They may be
/// written from any thread.
///
/// ```rust,no_run
/// use signal_bindings::prelude::*;
///
/// let name = Observable::new(String::from("Ada"));
/// name.set(String::from("Grace"));
/// assert_eq!(name.get(), "Grace");
/// ```
pub struct Observable<T> {
    inner: Arc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for Observable<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl<T> Eq for Observable<T> {}

impl<T> Observable<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    /// Create a new observable with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(ObservableInner {
                id: storage::next_observable_id(),
                value: RwLock::new(value),
                dependents: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Get a clone of the current value, tracking the read.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Get a clone of the current value without tracking the read.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.with_untracked(T::clone)
    }

    /// Read the value with a closure, tracking the read.
    ///
    /// The cell is locked while `f` runs; `f` must not write to it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        self.with_untracked(f)
    }

    /// Read the value with a closure without tracking.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.inner.value.read())
    }

    /// Store a new value.
    ///
    /// Equal values are ignored. Otherwise every dependent evaluation is
    /// invalidated and scheduled for recompute.
    pub fn set(&self, value: T) {
        {
            let mut current = self.inner.value.write();
            if *current == value {
                return;
            }
            *current = value;
        }
        self.notify();
    }

    /// Modify the value in place; dependents are invalidated only if it changed.
    ///
    /// The cell is locked while `f` runs; `f` must not read or write it.
    pub fn update(&self, f: impl FnOnce(&mut T))
    where
        T: Clone,
    {
        let changed = {
            let mut current = self.inner.value.write();
            let before = current.clone();
            f(&mut *current);
            *current != before
        };
        if changed {
            self.notify();
        }
    }

    /// Number of evaluations currently depending on this cell.
    pub fn dependent_count(&self) -> usize {
        self.inner.dependents.lock().len()
    }

    fn track(&self) {
        storage::track_read(self.inner.id, || {
            Arc::clone(&self.inner) as Arc<dyn Dependency>
        });
    }

    fn notify(&self) {
        // Snapshot first: an invalidation may run a recompute that rewires
        // this cell's dependents.
        let dependents = self.inner.dependents.lock().clone();
        tracing::trace!(
            observable = self.inner.id,
            dependents = dependents.len(),
            "observable changed"
        );
        for id in dependents {
            scheduler::invalidate(id);
        }
    }
}

impl<T> Default for Observable<T>
where
    T: Default + PartialEq + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::init_scheduler;
    use crate::{Computed, Scheduler};
    use proptest::prelude::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn test_observable_set_and_get() {
        let cell = Observable::new(0);
        cell.set(10);
        assert_eq!(cell.get(), 10);
    }

    #[test]
    fn test_observable_update() {
        let cell = Observable::new(5);
        cell.update(|n| *n *= 2);
        assert_eq!(cell.get(), 10);
    }

    #[test]
    fn test_observable_with() {
        let cell = Observable::new(String::from("hello"));
        assert_eq!(cell.with(|s| s.len()), 5);
    }

    #[test]
    fn test_observable_eq_is_identity() {
        let a = Observable::new(10);
        let b = a.clone();
        let c = Observable::new(10);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_none_equals_none() {
        init_scheduler();
        let cell: Observable<Option<String>> = Observable::new(None);
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let _sub = Computed::new({
            let cell = cell.clone();
            move || cell.get()
        })
        .subscribe(move |_| counter.set(counter.get() + 1));

        cell.set(None);
        assert_eq!(runs.get(), 1);
        cell.set(Some("x".into()));
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_update_without_change_does_not_invalidate() {
        init_scheduler();
        let cell = Observable::new(vec![1, 2, 3]);
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let _sub = Computed::new({
            let cell = cell.clone();
            move || cell.with(|v| v.len())
        })
        .subscribe(move |_| counter.set(counter.get() + 1));

        cell.update(|v| v.sort());
        assert_eq!(runs.get(), 1);
        cell.update(|v| v.push(4));
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_dependents_invalidated_in_subscription_order() {
        init_scheduler();
        let cell = Observable::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let subscriptions: Vec<_> = (0..8)
            .map(|index| {
                let cell = cell.clone();
                let order = order.clone();
                Computed::new(move || cell.get()).subscribe(move |_| order.borrow_mut().push(index))
            })
            .collect();
        order.borrow_mut().clear();

        Scheduler::batch(|| cell.set(1));
        assert_eq!(*order.borrow(), (0..8).collect::<Vec<_>>());
        drop(subscriptions);
        assert_eq!(cell.dependent_count(), 0);
    }

    proptest! {
        #[test]
        fn prop_setting_equal_values_never_invalidates(value in any::<i64>(), repeats in 1usize..20) {
            init_scheduler();
            let cell = Observable::new(value);
            let runs = Rc::new(Cell::new(0));
            let counter = runs.clone();
            let _sub = Computed::new({
                let cell = cell.clone();
                move || cell.get()
            })
            .subscribe(move |_| counter.set(counter.get() + 1));

            for _ in 0..repeats {
                cell.set(value);
            }
            prop_assert_eq!(runs.get(), 1);
        }
    }
}
