//! Wakers that turn a wake-up into a queued resumption request.

use crate::runtime::queue::TaskQueue;
use crate::task::TaskId;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::Wake;

/// Waker shared by every poll of one task.
///
/// `notified` collapses repeated wakes into a single queued request; it is
/// cleared right before the task is polled.
pub(crate) struct TaskWaker {
    id: TaskId,
    notified: AtomicBool,
    queue: Arc<TaskQueue>,
}

impl TaskWaker {
    pub(crate) fn new(id: TaskId, queue: Arc<TaskQueue>) -> Arc<Self> {
        Arc::new(Self {
            id,
            notified: AtomicBool::new(false),
            queue,
        })
    }

    pub(crate) fn clear(&self) {
        self.notified.store(false, Ordering::Release);
    }
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        if !self.notified.swap(true, Ordering::AcqRel) {
            self.queue.push(self.id);
        }
    }
}

/// Waker for the future driven by `Runtime::block_on`, which lives outside
/// the task arena.
pub(crate) struct MainWaker {
    notified: AtomicBool,
    queue: Arc<TaskQueue>,
}

impl MainWaker {
    pub(crate) fn new(queue: Arc<TaskQueue>) -> Arc<Self> {
        Arc::new(Self {
            // The main future gets its first poll without being woken.
            notified: AtomicBool::new(true),
            queue,
        })
    }

    pub(crate) fn take(&self) -> bool {
        self.notified.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn is_notified(&self) -> bool {
        self.notified.load(Ordering::Acquire)
    }
}

impl Wake for MainWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        if !self.notified.swap(true, Ordering::AcqRel) {
            self.queue.notify();
        }
    }
}
