//! Computed evaluations that derive their value from observables.

use crate::storage::{self, ComputedId, DependencySet, Evaluate};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type Callback<T> = Rc<dyn Fn(T)>;

struct ComputedInner<T> {
    id: Cell<ComputedId>,
    getter: Box<dyn Fn() -> T>,
    cached: RefCell<Option<T>>,
    /// Exactly the observables read by the most recent evaluation.
    dependencies: RefCell<DependencySet>,
    subscribers: RefCell<Vec<(u64, Callback<T>)>>,
    next_key: Cell<u64>,
    attached: Cell<bool>,
}

impl<T: Clone + 'static> ComputedInner<T> {
    fn attach(self: &Rc<Self>) {
        if self.attached.replace(true) {
            return;
        }
        let id = storage::register();
        self.id.set(id);
        let weak: Weak<Self> = Rc::downgrade(self);
        storage::install_evaluation(id, weak);
    }

    /// Run the getter as the current evaluation and rewire the graph to
    /// exactly the observables it read.
    fn evaluate(&self) -> T {
        let (value, reads) = storage::tracked(self.id.get(), || (self.getter)());
        self.rewire(reads);
        *self.cached.borrow_mut() = Some(value.clone());
        value
    }

    /// Drop the edges to observables the latest run no longer read. Edges to
    /// new reads were added as the reads happened.
    fn rewire(&self, reads: DependencySet) {
        let id = self.id.get();
        let mut dependencies = self.dependencies.borrow_mut();
        let mut removed = 0;
        for (key, dependency) in dependencies.iter() {
            if !reads.contains_key(key) {
                dependency.remove_dependent(id);
                removed += 1;
            }
        }
        let added = reads
            .keys()
            .filter(|key| !dependencies.contains_key(*key))
            .count();
        *dependencies = reads;
        if added + removed > 0 {
            tracing::trace!(?id, added, removed, total = dependencies.len(), "dependencies rebuilt");
        }
    }

    fn deliver(&self, value: T) {
        let callbacks: Vec<Callback<T>> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        storage::untracked(|| {
            for callback in callbacks {
                callback(value.clone());
            }
        });
    }

    /// Remove every edge to this evaluation and release its registry node.
    fn detach(&self) {
        if !self.attached.replace(false) {
            return;
        }
        let id = self.id.get();
        for dependency in self.dependencies.borrow_mut().drain().map(|(_, d)| d) {
            dependency.remove_dependent(id);
        }
        self.cached.borrow_mut().take();
        storage::remove_evaluation(id);
        storage::release(id);
        tracing::trace!(?id, "computed detached");
    }
}

impl<T: Clone + 'static> Evaluate for ComputedInner<T> {
    fn refresh(&self) {
        if !self.attached.get() || !storage::mark_clean(self.id.get()) {
            return;
        }
        let value = self.evaluate();
        self.deliver(value);
    }
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        if self.attached.get() {
            let id = self.id.get();
            for (_, dependency) in self.dependencies.get_mut().drain() {
                dependency.remove_dependent(id);
            }
            storage::remove_evaluation(id);
            storage::release(id);
        }
    }
}

/// Subscriber bookkeeping shared by every `Computed<T>`, independent of `T`.
trait SubscriberSet {
    fn remove_subscriber(&self, key: u64);
}

impl<T: Clone + 'static> SubscriberSet for ComputedInner<T> {
    fn remove_subscriber(&self, key: u64) {
        let now_empty = {
            let mut subscribers = self.subscribers.borrow_mut();
            subscribers.retain(|(k, _)| *k != key);
            subscribers.is_empty()
        };
        if now_empty {
            self.detach();
        }
    }
}

/// A cached function of observables whose dependency set is rediscovered on
/// every evaluation.
///
/// Whichever observables the getter reads on a given run are exactly the ones
/// that will invalidate it, so branches that skip a read also skip the
/// dependency. Evaluation starts with the first subscriber and stops when the
/// last one goes away.
///
/// A computed lives on the consumer thread that created it. Recomputes are
/// delivered there through the [`Scheduler`](crate::Scheduler).
///
/// A getter that writes to an observable it also reads has undefined
/// delivery order and should be avoided.
///
/// ```rust,no_run
/// use signal_bindings::prelude::*;
///
/// let count = Observable::new(5);
/// let doubled = Computed::new({
///     let count = count.clone();
///     move || count.get() * 2
/// });
/// let _subscription = doubled.subscribe(|value| println!("doubled = {value}"));
/// ```
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Create a computed around `getter`. Nothing is evaluated until the
    /// first subscription.
    pub fn new(getter: impl Fn() -> T + 'static) -> Self {
        Self {
            inner: Rc::new(ComputedInner {
                id: Cell::new(ComputedId::default()),
                getter: Box::new(getter),
                cached: RefCell::new(None),
                dependencies: RefCell::new(DependencySet::new()),
                subscribers: RefCell::new(Vec::new()),
                next_key: Cell::new(0),
                attached: Cell::new(false),
            }),
        }
    }

    /// Register `callback` for every recomputed value.
    ///
    /// The first subscriber triggers an eager evaluation; every subscriber
    /// receives the current value before this returns.
    #[must_use = "dropping the subscription unsubscribes it"]
    pub fn subscribe(&self, callback: impl Fn(T) + 'static) -> ComputedSubscription {
        self.inner.attach();
        let key = self.inner.next_key.get();
        self.inner.next_key.set(key + 1);
        let callback: Callback<T> = Rc::new(callback);
        self.inner
            .subscribers
            .borrow_mut()
            .push((key, Rc::clone(&callback)));

        let cached = self.inner.cached.borrow().clone();
        let value = match cached {
            Some(value) => value,
            None => self.inner.evaluate(),
        };
        storage::untracked(|| callback(value));

        let target: Rc<dyn SubscriberSet> = self.inner.clone();
        ComputedSubscription {
            target: Some((target, key)),
        }
    }

    /// The last evaluated value, if the computed is subscribed.
    pub fn cached(&self) -> Option<T> {
        self.inner.cached.borrow().clone()
    }

    /// Number of observables read by the most recent evaluation.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.borrow().len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Whether the computed is currently attached to the graph.
    pub fn is_attached(&self) -> bool {
        self.inner.attached.get()
    }
}

impl<T: Clone + fmt::Debug + 'static> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("value", &self.cached())
            .field("dependencies", &self.dependency_count())
            .finish()
    }
}

/// The live link between a computed and one delivery callback.
///
/// Unsubscribing the last subscription of a computed detaches it from every
/// observable it depends on. Dropping a subscription unsubscribes it.
#[must_use = "dropping the subscription unsubscribes it"]
pub struct ComputedSubscription {
    target: Option<(Rc<dyn SubscriberSet>, u64)>,
}

impl ComputedSubscription {
    /// Remove the callback. Calling this more than once is a no-op.
    pub fn unsubscribe(&mut self) {
        if let Some((target, key)) = self.target.take() {
            target.remove_subscriber(key);
        }
    }

    pub fn is_active(&self) -> bool {
        self.target.is_some()
    }
}

impl Drop for ComputedSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for ComputedSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedSubscription")
            .field("active", &self.is_active())
            .finish()
    }
}
