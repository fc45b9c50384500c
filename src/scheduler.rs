//! Update scheduling: marshals recomputes onto the consumer thread and
//! batches invalidations into coherent refresh passes.

use crate::error::{BindingError, Result};
use crate::storage::{self, ComputedId, Mark};
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::OnceLock;

type Dispatch = Box<dyn Fn(Update) + Send + Sync>;

static DISPATCH: OnceLock<Dispatch> = OnceLock::new();

thread_local! {
    /// Open batches on this thread, innermost last.
    static BATCHES: RefCell<Vec<Vec<Update>>> = const { RefCell::new(Vec::new()) };
}

/// A pending recompute-and-deliver for one computed evaluation.
///
/// Running an update whose computed has since been unsubscribed is a no-op.
/// Updates for live computeds must run on the thread that created them.
///
/// Dropping an update without running it gives up that recompute: the
/// computed keeps its last delivered value, and the next change to one of its
/// dependencies schedules it again.
#[must_use = "updates do nothing unless run"]
pub struct Update {
    target: ComputedId,
    pending: bool,
}

impl Update {
    pub(crate) fn for_target(target: ComputedId) -> Self {
        Self {
            target,
            pending: true,
        }
    }

    /// Recompute the target evaluation and deliver its value.
    ///
    /// # Panics
    ///
    /// Panics if the target is live but belongs to another thread.
    pub fn run(mut self) {
        self.pending = false;
        match storage::lookup_evaluation(self.target) {
            Some(evaluation) => evaluation.refresh(),
            None if storage::is_live(self.target) => {
                panic!("{}", BindingError::OffConsumerThread)
            }
            None => tracing::trace!(computed = ?self.target, "skipping update for released computed"),
        }
    }
}

impl Drop for Update {
    fn drop(&mut self) {
        if self.pending && storage::mark_clean(self.target) {
            tracing::debug!(computed = ?self.target, "update dropped without running");
        }
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Update").field("target", &self.target).finish()
    }
}

/// The process-wide update scheduler.
///
/// The host installs its marshaling primitive once with
/// [`Scheduler::initialize`]. Outside of a batch each invalidation is handed
/// to that primitive individually; inside a batch opened on the current
/// thread, invalidations are collected and returned by [`Batch::end`].
///
/// ```rust,no_run
/// use signal_bindings::prelude::*;
///
/// Scheduler::initialize(|update| update.run()).unwrap();
///
/// let batch = Scheduler::begin();
/// // build a compound view, binding several labels
/// for update in batch.end() {
///     update.run();
/// }
/// ```
pub struct Scheduler;

impl Scheduler {
    /// Install the dispatch function that moves an [`Update`] onto the
    /// consumer thread. It should run the update inline when already on that
    /// thread and queue it otherwise.
    ///
    /// Returns [`BindingError::AlreadyInitialized`] on a second call.
    pub fn initialize(dispatch: impl Fn(Update) + Send + Sync + 'static) -> Result<()> {
        DISPATCH
            .set(Box::new(dispatch))
            .map_err(|_| BindingError::AlreadyInitialized)?;
        tracing::debug!("update scheduler initialized");
        Ok(())
    }

    pub fn is_initialized() -> bool {
        DISPATCH.get().is_some()
    }

    /// Open a batch on the current thread.
    ///
    /// Batches nest. Each must be ended in reverse order of opening.
    ///
    /// # Panics
    ///
    /// Panics if the scheduler has not been initialized.
    pub fn begin() -> Batch {
        dispatcher();
        let depth = BATCHES.with(|batches| {
            let mut batches = batches.borrow_mut();
            batches.push(Vec::new());
            batches.len()
        });
        tracing::trace!(depth, "batch opened");
        Batch {
            depth,
            ended: false,
            _not_send: PhantomData,
        }
    }

    /// Run `f` inside a batch, then run every update it collected.
    pub fn batch<R>(f: impl FnOnce() -> R) -> R {
        let batch = Self::begin();
        let result = f();
        for update in batch.end() {
            update.run();
        }
        result
    }
}

fn dispatcher() -> &'static Dispatch {
    DISPATCH
        .get()
        .unwrap_or_else(|| panic!("{}", BindingError::NotInitialized))
}

/// Invalidate a computed: collect it into the innermost open batch, or
/// dispatch it. A computed with a recompute already pending is coalesced.
pub(crate) fn invalidate(id: ComputedId) {
    let dispatch = dispatcher();
    match storage::mark_dirty(id) {
        Mark::Marked => {}
        Mark::AlreadyDirty => {
            tracing::trace!(?id, "invalidation coalesced");
            return;
        }
        Mark::Released => return,
    }

    let update = Update::for_target(id);
    let unbatched = BATCHES.with(|batches| match batches.borrow_mut().last_mut() {
        Some(pending) => {
            pending.push(update);
            None
        }
        None => Some(update),
    });
    if let Some(update) = unbatched {
        dispatch(update);
    }
}

/// An open batching scope. See [`Scheduler::begin`].
#[must_use = "a batch collects updates until it is ended"]
pub struct Batch {
    depth: usize,
    ended: bool,
    _not_send: PhantomData<Rc<()>>,
}

impl Batch {
    /// Close the batch and return its updates in first-invalidated order.
    /// The caller is responsible for running them.
    ///
    /// # Panics
    ///
    /// Panics if a batch opened after this one is still open.
    #[must_use = "the returned updates must be run"]
    pub fn end(mut self) -> Vec<Update> {
        self.ended = true;
        self.take()
    }

    fn take(&self) -> Vec<Update> {
        let updates = BATCHES.with(|batches| {
            let mut batches = batches.borrow_mut();
            assert_eq!(
                batches.len(),
                self.depth,
                "batches must end in reverse order of begin"
            );
            batches.pop().unwrap_or_default()
        });
        tracing::trace!(depth = self.depth, pending = updates.len(), "batch closed");
        updates
    }
}

impl Drop for Batch {
    fn drop(&mut self) {
        if self.ended || std::thread::panicking() {
            return;
        }
        // An abandoned batch still owes its updates to the consumer thread.
        let dispatch = dispatcher();
        for update in self.take() {
            dispatch(update);
        }
    }
}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch").field("depth", &self.depth).finish()
    }
}
