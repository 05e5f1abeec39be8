//! Single-threaded runtime: task arena, executor queue and reactor.
//!
//! One executor turn runs the batch of queued resumptions, then one reactor
//! turn, then the completions that reactor turn produced. Completions only
//! wake tasks, and waking only queues a request, so no task is ever polled
//! from inside another task's poll or from inside a completion callback.

use crate::bridge::Bridge;
use crate::error::{Error, Result};
use crate::reactor::core::Reactor;
use crate::reactor::notify::Notifier;
use crate::reactor::operation::Operation;
use crate::runtime::context;
use crate::runtime::queue::TaskQueue;
use crate::runtime::waker::{MainWaker, TaskWaker};
use crate::task::{TaskHandle, TaskId, TaskSlot};
use crate::utils::slab::{Key, Slab};

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::io;
use std::pin::pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};
use std::time::Duration;

struct Shared {
    reactor: RefCell<Reactor>,
    tasks: RefCell<Slab<TaskSlot>>,
    queue: Arc<TaskQueue>,
}

/// Cheap, clonable reference to a runtime, used to create tasks and to
/// reach the reactor. Bound to the runtime's thread.
#[derive(Clone)]
pub struct Handle {
    shared: Rc<Shared>,
}

/// Thread-safe way to make [`Runtime::run`] return.
#[derive(Clone)]
pub struct StopHandle {
    queue: Arc<TaskQueue>,
}

impl StopHandle {
    /// Asks the runtime to stop once its current turn finishes.
    pub fn request_stop(&self) {
        log::debug!("stop requested");
        self.queue.request_stop();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.queue.is_stop_requested()
    }
}

impl fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopHandle")
            .field("stop_requested", &self.is_stop_requested())
            .finish()
    }
}

impl Handle {
    /// Returns the handle of the runtime driving the current thread.
    ///
    /// # Panics
    /// Panics outside of [`Runtime::run`] / [`Runtime::block_on`].
    pub fn current() -> Self {
        match context::try_current() {
            Some(handle) => handle,
            None => panic!("no runtime is running on this thread"),
        }
    }

    pub fn try_current() -> Option<Self> {
        context::try_current()
    }

    /// Stores `future` as a dormant task. Nothing runs until the returned
    /// handle is scheduled.
    pub fn task<F>(&self, future: F) -> TaskHandle
    where
        F: Future<Output = ()> + 'static,
    {
        let queue = self.shared.queue.clone();
        let key = self.shared.tasks.borrow_mut().insert_with(|key| {
            TaskSlot::new(Box::pin(future), TaskWaker::new(TaskId(key), queue))
        });

        TaskHandle::new(TaskId(key), self.clone())
    }

    /// Creates a task and schedules it right away.
    pub fn spawn<F>(&self, future: F) -> TaskId
    where
        F: Future<Output = ()> + 'static,
    {
        let task = self.task(future);
        let id = task.id();
        task.schedule();
        id
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            queue: self.shared.queue.clone(),
        }
    }

    /// Number of tasks alive in the arena, dormant ones included.
    pub fn active_tasks(&self) -> usize {
        self.shared.tasks.borrow().len()
    }

    /// Number of reactor operations waiting for an outcome.
    pub fn pending_operations(&self) -> usize {
        self.shared.reactor.borrow().pending()
    }

    pub(crate) fn register(&self, operation: Operation) -> Key {
        self.shared.reactor.borrow_mut().register(operation)
    }

    pub(crate) fn cancel(&self, key: Key) -> bool {
        self.shared.reactor.borrow_mut().cancel(key)
    }

    pub(crate) fn schedule(&self, id: TaskId) {
        let signal = self
            .shared
            .tasks
            .borrow()
            .get(id.0)
            .map(|slot| slot.signal.clone());

        match signal {
            Some(signal) => {
                log::trace!("{id} scheduled");
                signal.wake_by_ref();
            }
            None => log::debug!("{id} scheduled after it was released"),
        }
    }

    pub(crate) fn release(&self, id: TaskId) {
        // Dropped after the arena borrow ends: the future may own other tasks.
        let slot = self.shared.tasks.borrow_mut().remove(id.0);
        if slot.is_some() {
            log::trace!("{id} released before it was scheduled");
        }
    }

    fn resume(&self, id: TaskId) {
        let taken = {
            let mut tasks = self.shared.tasks.borrow_mut();
            match tasks.get_mut(id.0) {
                Some(slot) => slot.future.take().map(|future| {
                    slot.signal.clear();
                    (future, slot.waker.clone())
                }),
                None => None,
            }
        };

        let Some((mut future, waker)) = taken else {
            log::trace!("stale resumption of {id} ignored");
            return;
        };

        let mut cx = Context::from_waker(&waker);
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                let slot = self.shared.tasks.borrow_mut().remove(id.0);
                drop(slot);
                drop(future);
                log::trace!("{id} finished");
            }
            Poll::Pending => {
                let mut tasks = self.shared.tasks.borrow_mut();
                if let Some(slot) = tasks.get_mut(id.0) {
                    slot.future = Some(future);
                }
            }
        }
    }

    /// One executor turn followed by one reactor turn.
    ///
    /// With `park` set and nothing queued, the reactor may block until an
    /// operation completes, a timer fires or the queue is poked.
    fn turn(&self, park: bool) -> io::Result<()> {
        for id in self.shared.queue.take_batch() {
            self.resume(id);
        }

        let timeout = if park && self.shared.queue.is_empty() {
            None
        } else {
            Some(Duration::ZERO)
        };

        let ready = self.shared.reactor.borrow_mut().turn(timeout)?;
        for complete in ready {
            complete();
        }

        Ok(())
    }

    /// Suspends on a reactor timer until `deadline`.
    pub(crate) fn timer(&self, deadline: std::time::Instant) -> Bridge<()> {
        Bridge::new(self.clone(), move |complete| Operation::timer(deadline, complete))
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("active_tasks", &self.active_tasks())
            .finish()
    }
}

/// Owns the reactor and the executor. Not `Send`: a runtime lives and runs
/// on the thread that built it.
pub struct Runtime {
    handle: Handle,
}

impl Runtime {
    /// Builds a runtime with default settings.
    ///
    /// ```ignore
    /// let mut rt = Runtime::new()?;
    /// rt.block_on(async { 42 })?;
    /// ```
    pub fn new() -> Result<Self> {
        crate::builder::RuntimeBuilder::new().build()
    }

    pub(crate) fn with_capacity(event_capacity: usize) -> Result<Self> {
        let notifier = Arc::new(Notifier::new().map_err(Error::Poller)?);
        let reactor = Reactor::new(event_capacity, notifier.clone()).map_err(Error::Poller)?;
        let queue = Arc::new(TaskQueue::new(notifier));

        Ok(Self {
            handle: Handle {
                shared: Rc::new(Shared {
                    reactor: RefCell::new(reactor),
                    tasks: RefCell::new(Slab::new()),
                    queue,
                }),
            },
        })
    }

    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.handle.stop_handle()
    }

    /// Spawns a background task; it runs once the runtime is driven.
    pub fn spawn<F>(&self, future: F) -> TaskId
    where
        F: Future<Output = ()> + 'static,
    {
        self.handle.spawn(future)
    }

    /// Drives tasks and I/O until a stop is requested.
    ///
    /// The stop request is consumed, so the runtime can be run again.
    pub fn run(&mut self) -> Result<()> {
        let _enter = context::enter(self.handle.clone());
        log::debug!("runtime running");

        while !self.handle.shared.queue.is_stop_requested() {
            self.handle.turn(true)?;
        }

        self.handle.shared.queue.take_stop();
        log::debug!("runtime stopped with {} live tasks", self.handle.active_tasks());
        Ok(())
    }

    /// Drives `future` to completion along with every spawned task.
    ///
    /// Tasks that are ready when `future` completes get to run before this
    /// returns; tasks still waiting on I/O stay suspended. Returns
    /// [`Error::Stopped`] if a stop is requested first.
    pub fn block_on<F: Future>(&mut self, future: F) -> Result<F::Output> {
        let _enter = context::enter(self.handle.clone());

        let main = MainWaker::new(self.handle.shared.queue.clone());
        let waker = Waker::from(main.clone());
        let mut cx = Context::from_waker(&waker);
        let mut future = pin!(future);

        loop {
            if main.take() {
                if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
                    while !self.handle.shared.queue.is_empty() {
                        self.handle.turn(false)?;
                    }
                    return Ok(output);
                }
            }

            if self.handle.shared.queue.take_stop() {
                return Err(Error::Stopped);
            }

            self.handle.turn(!main.is_notified())?;
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        // Tasks hold handles back to the runtime; dropping them breaks the
        // cycle. Their pending bridges cancel themselves on the way out.
        loop {
            let tasks = self.handle.shared.tasks.borrow_mut().drain();
            if tasks.is_empty() {
                break;
            }
            drop(tasks);
        }

        let operations = self.handle.shared.reactor.borrow_mut().clear();
        drop(operations);
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime").field("handle", &self.handle).finish()
    }
}
