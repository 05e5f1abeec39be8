//! Task handles: exclusive ownership of one suspended computation.
//!
//! A task is a `Future<Output = ()>` stored in the executor's arena under a
//! [`TaskId`]. It is created dormant by [`Handle::task`] and only ever runs
//! from the executor queue:
//!
//! ```ignore
//! let task = handle.task(async {
//!     println!("runs on a later executor turn");
//! });
//! task.schedule(); // returns immediately; nothing has run yet
//! ```
//!
//! Because every poll is deferred through the queue, a task that schedules
//! thousands of others from inside its own poll never nests their frames on
//! top of its own.
//!
//! [`Handle::task`]: crate::runtime::Handle::task

use crate::runtime::Handle;
use crate::runtime::waker::TaskWaker;
use crate::utils::slab::Key;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Waker;

/// Opaque identifier of a task in its runtime's arena.
///
/// Identifiers are generational: once a task finishes or is dropped, its id
/// never refers to another task.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub(crate) Key);

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({:?})", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task {:?}", self.0)
    }
}

pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = ()>>>;

/// Arena entry of one task.
pub(crate) struct TaskSlot {
    /// `None` while the future is being polled.
    pub(crate) future: Option<BoxFuture>,
    pub(crate) signal: Arc<TaskWaker>,
    pub(crate) waker: Waker,
}

impl TaskSlot {
    pub(crate) fn new(future: BoxFuture, signal: Arc<TaskWaker>) -> Self {
        let waker = Waker::from(signal.clone());
        Self {
            future: Some(future),
            signal,
            waker,
        }
    }
}

/// Sole owner of a task that has not been scheduled yet.
///
/// Not `Clone`. Dropping the handle releases the task's future without ever
/// polling it. [`schedule`](Self::schedule) hands the task over to the
/// executor, which releases it when the future completes.
#[must_use = "a task does nothing until it is scheduled"]
pub struct TaskHandle {
    id: TaskId,
    handle: Handle,
    dormant: bool,
}

impl TaskHandle {
    pub(crate) fn new(id: TaskId, handle: Handle) -> Self {
        Self {
            id,
            handle,
            dormant: true,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Queues the task's first poll on the executor that created it and
    /// returns immediately. The task never runs inside this call.
    pub fn schedule(mut self) {
        self.dormant = false;
        self.handle.schedule(self.id);
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("dormant", &self.dormant)
            .finish()
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if self.dormant {
            self.handle.release(self.id);
        }
    }
}
