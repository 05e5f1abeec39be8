//! Executor work queue of resumption requests.
//!
//! Wakers may fire from any thread, so this is the one synchronized piece of
//! the runtime. Pushing onto an empty queue pokes the reactor's wake-up pipe
//! so a blocked poll returns and the request is served.

use crate::reactor::notify::Notifier;
use crate::task::TaskId;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub(crate) struct TaskQueue {
    queue: Mutex<VecDeque<TaskId>>,
    stop: AtomicBool,
    notifier: Arc<Notifier>,
}

impl TaskQueue {
    pub(crate) fn new(notifier: Arc<Notifier>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            stop: AtomicBool::new(false),
            notifier,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<TaskId>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueues a resumption request for `id`.
    pub(crate) fn push(&self, id: TaskId) {
        let was_empty = {
            let mut queue = self.lock();
            let was_empty = queue.is_empty();
            queue.push_back(id);
            was_empty
        };

        if was_empty {
            self.notifier.notify();
        }
    }

    /// Takes every request queued so far. Requests pushed while the batch
    /// runs wait for the next turn, which keeps the reactor responsive.
    pub(crate) fn take_batch(&self) -> VecDeque<TaskId> {
        std::mem::take(&mut *self.lock())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Interrupts a blocked poll without queueing anything.
    pub(crate) fn notify(&self) {
        self.notifier.notify();
    }

    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.notifier.notify();
    }

    pub(crate) fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Consumes a pending stop request.
    pub(crate) fn take_stop(&self) -> bool {
        self.stop.swap(false, Ordering::SeqCst)
    }
}
