//! Backing state for the dependency graph.
//!
//! The graph is split by ownership:
//!
//! - A process-wide generational arena of computed nodes holds only the
//!   dirty flag of each evaluation. Observables refer to their dependents by
//!   [`ComputedId`], so a torn-down evaluation is simply a stale key and
//!   removal is a single arena operation.
//! - The evaluations themselves (user closures, cached values, dependency
//!   sets) live in a thread-local table on the consumer thread and are never
//!   shared across threads.
//! - The ambient "current evaluation" is a thread-local stack of trackers.

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

new_key_type! {
    /// Unique identifier for a computed evaluation in the registry.
    pub struct ComputedId;
}

/// Identifier of an observable cell, unique for the life of the process.
pub(crate) type ObservableId = u64;

static NEXT_OBSERVABLE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_observable_id() -> ObservableId {
    NEXT_OBSERVABLE.fetch_add(1, Ordering::Relaxed)
}

/// Registry entry for a live computed evaluation.
struct Node {
    /// Set on invalidation, cleared when the recompute starts.
    dirty: bool,
}

/// Outcome of an invalidation against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mark {
    /// The node was clean and is now dirty; a recompute must be scheduled.
    Marked,
    /// A recompute is already pending for this node.
    AlreadyDirty,
    /// The evaluation has been torn down.
    Released,
}

static REGISTRY: LazyLock<Mutex<SlotMap<ComputedId, Node>>> =
    LazyLock::new(|| Mutex::new(SlotMap::with_key()));

fn with_registry<R>(f: impl FnOnce(&mut SlotMap<ComputedId, Node>) -> R) -> R {
    f(&mut REGISTRY.lock())
}

/// Allocate a clean registry node for a new evaluation.
pub(crate) fn register() -> ComputedId {
    with_registry(|nodes| nodes.insert(Node { dirty: false }))
}

/// Remove a node. Pending updates targeting it become no-ops.
pub(crate) fn release(id: ComputedId) {
    with_registry(|nodes| {
        nodes.remove(id);
    });
}

pub(crate) fn is_live(id: ComputedId) -> bool {
    with_registry(|nodes| nodes.contains_key(id))
}

pub(crate) fn mark_dirty(id: ComputedId) -> Mark {
    with_registry(|nodes| match nodes.get_mut(id) {
        None => Mark::Released,
        Some(node) if node.dirty => Mark::AlreadyDirty,
        Some(node) => {
            node.dirty = true;
            Mark::Marked
        }
    })
}

/// Clear the dirty flag ahead of a recompute. Returns false for released nodes.
pub(crate) fn mark_clean(id: ComputedId) -> bool {
    with_registry(|nodes| match nodes.get_mut(id) {
        None => false,
        Some(node) => {
            node.dirty = false;
            true
        }
    })
}

/// Type-erased view of an observable as seen by the evaluations reading it.
pub(crate) trait Dependency: Send + Sync {
    fn add_dependent(&self, id: ComputedId);
    fn remove_dependent(&self, id: ComputedId);
}

/// Dependencies observed during one evaluation, keyed by observable.
pub(crate) type DependencySet = HashMap<ObservableId, Arc<dyn Dependency>>;

/// Reads recorded for the evaluation currently running on this thread.
struct Tracker {
    observer: ComputedId,
    reads: DependencySet,
}

thread_local! {
    /// `Some` frames record reads, `None` frames suppress tracking.
    static TRACKING: RefCell<Vec<Option<Tracker>>> = const { RefCell::new(Vec::new()) };

    static EVALUATIONS: RefCell<HashMap<ComputedId, Weak<dyn Evaluate>>> =
        RefCell::new(HashMap::new());
}

/// Pops the tracking frame even if the evaluated closure unwinds.
struct FrameGuard;

impl Drop for FrameGuard {
    fn drop(&mut self) {
        TRACKING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

fn with_frame<R>(frame: Option<Tracker>, f: impl FnOnce() -> R) -> (R, Option<Tracker>) {
    TRACKING.with(|stack| stack.borrow_mut().push(frame));
    let guard = FrameGuard;
    let result = f();
    let frame = TRACKING.with(|stack| stack.borrow_mut().last_mut().and_then(Option::take));
    drop(guard);
    (result, frame)
}

/// Run `f` as the evaluation of `observer`, returning every dependency it
/// read.
///
/// Each dependency gains `observer` as a dependent at the moment it is first
/// read, before its value is seen. A write racing with the evaluation
/// therefore always finds the edge and invalidates `observer`. Edges that
/// are no longer read are the caller's to remove.
pub(crate) fn tracked<R>(observer: ComputedId, f: impl FnOnce() -> R) -> (R, DependencySet) {
    let tracker = Tracker {
        observer,
        reads: DependencySet::new(),
    };
    let (result, frame) = with_frame(Some(tracker), f);
    (result, frame.map(|tracker| tracker.reads).unwrap_or_default())
}

/// Run `f` with dependency tracking suspended.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    with_frame(None, f).0
}

/// Record a read against the current evaluation, if any.
///
/// `dependency` is only called when a tracking frame is active.
pub(crate) fn track_read(id: ObservableId, dependency: impl FnOnce() -> Arc<dyn Dependency>) {
    TRACKING.with(|stack| {
        if let Some(Some(tracker)) = stack.borrow_mut().last_mut() {
            if let Entry::Vacant(slot) = tracker.reads.entry(id) {
                slot.insert(dependency()).add_dependent(tracker.observer);
            }
        }
    });
}

/// A computed evaluation that can be recomputed on the consumer thread.
pub(crate) trait Evaluate {
    fn refresh(&self);
}

pub(crate) fn install_evaluation(id: ComputedId, evaluation: Weak<dyn Evaluate>) {
    EVALUATIONS.with(|table| {
        table.borrow_mut().insert(id, evaluation);
    });
}

pub(crate) fn remove_evaluation(id: ComputedId) {
    // Evaluations dropped during thread teardown may outlive the table.
    let _ = EVALUATIONS.try_with(|table| {
        table.borrow_mut().remove(&id);
    });
}

pub(crate) fn lookup_evaluation(id: ComputedId) -> Option<Rc<dyn Evaluate>> {
    EVALUATIONS.with(|table| table.borrow().get(&id).and_then(Weak::upgrade))
}
