//! A ready-made dispatch primitive for hosts that drive their own loop.

use crate::error::Result;
use crate::scheduler::{Scheduler, Update};
use futures::channel::mpsc;
use futures::{FutureExt, StreamExt};
use std::thread::{self, ThreadId};

/// Queue of updates for one consumer thread.
///
/// The dispatcher runs an update inline when called on the consumer thread
/// and queues it otherwise. The consumer drains the queue with
/// [`run_pending`](Self::run_pending) from its event loop, or awaits
/// [`run`](Self::run) on a local executor.
///
/// ```rust,no_run
/// use signal_bindings::ConsumerQueue;
///
/// let mut queue = ConsumerQueue::new();
/// queue.install().unwrap();
///
/// // once per turn of the host's event loop:
/// queue.run_pending();
/// ```
pub struct ConsumerQueue {
    sender: mpsc::UnboundedSender<Update>,
    receiver: mpsc::UnboundedReceiver<Update>,
    consumer: ThreadId,
}

impl ConsumerQueue {
    /// Create a queue whose consumer is the calling thread.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded();
        Self {
            sender,
            receiver,
            consumer: thread::current().id(),
        }
    }

    /// A dispatch function suitable for [`Scheduler::initialize`].
    ///
    /// Once the queue itself is dropped, updates sent from other threads are
    /// discarded. Their computeds keep the last delivered value until the
    /// next change reaches them on the consumer thread.
    pub fn dispatcher(&self) -> impl Fn(Update) + Send + Sync + 'static {
        let sender = self.sender.clone();
        let consumer = self.consumer;
        move |update| {
            if thread::current().id() == consumer {
                update.run();
            } else if let Err(err) = sender.unbounded_send(update) {
                // Dropping the update releases its pending mark.
                tracing::warn!(update = ?err.into_inner(), "consumer queue closed, dropping update");
            }
        }
    }

    /// Install this queue's dispatcher as the process-wide scheduler.
    pub fn install(&self) -> Result<()> {
        Scheduler::initialize(self.dispatcher())
    }

    /// Run every update queued so far. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Some(Some(update)) = self.receiver.next().now_or_never() {
            update.run();
            ran += 1;
        }
        if ran > 0 {
            tracing::trace!(ran, "ran queued updates");
        }
        ran
    }

    /// Run updates as they arrive until every dispatcher has been dropped.
    pub async fn run(self) {
        let Self {
            sender, mut receiver, ..
        } = self;
        drop(sender);
        while let Some(update) = receiver.next().await {
            update.run();
        }
    }
}

impl Default for ConsumerQueue {
    fn default() -> Self {
        Self::new()
    }
}
