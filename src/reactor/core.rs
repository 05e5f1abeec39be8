//! Callback-based, single-threaded I/O reactor.
//!
//! The reactor keeps a table of pending one-shot [`Operation`]s. Each
//! registration is watched by the OS poller (or the timer heap) and, once the
//! operation has an outcome, is removed from the table and turned into a
//! [`Ready`] closure. [`Reactor::turn`] returns those closures instead of
//! running them so callbacks never execute while the reactor is borrowed.
//!
//! Guarantees:
//! - a completion never runs during [`Reactor::register`], only on a later turn;
//! - a completion runs at most once, and exactly once unless cancelled first;
//! - a cancelled operation drops its callback without calling it.

use crate::reactor::notify::Notifier;
use crate::reactor::operation::{Operation, Ready};
use crate::reactor::poller::{Event, Poller};
use crate::utils::slab::{Key, Slab};

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Token reserved for the wake-up pipe. Slab keys never reach it.
const WAKE_TOKEN: u64 = u64::MAX;

pub(crate) struct Reactor {
    poller: Poller,
    events: Vec<Event>,
    operations: Slab<Operation>,
    timers: BinaryHeap<Reverse<(Instant, Key)>>,
    /// Registrations the poller refused; completed with an error next turn.
    failed: Vec<Key>,
    notifier: Arc<Notifier>,
}

impl Reactor {
    pub(crate) fn new(capacity: usize, notifier: Arc<Notifier>) -> io::Result<Self> {
        let poller = Poller::new(capacity)?;
        poller.register(notifier.fd(), WAKE_TOKEN, super::poller::Interest::READABLE)?;

        Ok(Self {
            poller,
            events: Vec::with_capacity(capacity),
            operations: Slab::with_capacity(capacity),
            timers: BinaryHeap::new(),
            failed: Vec::new(),
            notifier,
        })
    }

    /// Number of operations still waiting for an outcome.
    pub(crate) fn pending(&self) -> usize {
        self.operations.len()
    }

    pub(crate) fn register(&mut self, operation: Operation) -> Key {
        let fd = operation.fd();
        let interest = operation.interest();
        let deadline = match &operation {
            Operation::Timer(timer) => Some(timer.deadline),
            _ => None,
        };
        let kind = operation.kind();
        let key = self.operations.insert(operation);

        if let Some(deadline) = deadline {
            self.timers.push(Reverse((deadline, key)));
        }

        if let Some(fd) = fd {
            if let Err(err) = self.poller.register(fd, key.to_token(), interest) {
                log::debug!("{kind} on fd {fd} could not be registered: {err}");
                if let Some(operation) = self.operations.get_mut(key) {
                    operation.fail(err);
                }
                self.failed.push(key);
            }
        }

        log::trace!("registered {kind} operation {key:?}");
        key
    }

    /// Removes a pending operation without running its completion.
    ///
    /// Returns `false` if the operation already completed or was cancelled.
    pub(crate) fn cancel(&mut self, key: Key) -> bool {
        let Some(operation) = self.operations.remove(key) else {
            return false;
        };

        log::trace!("cancelled {} operation {key:?}", operation.kind());
        // A refused registration never reached the poller; its descriptor
        // may be watched on behalf of another operation.
        match self.failed.iter().position(|failed| *failed == key) {
            Some(index) => {
                self.failed.swap_remove(index);
            }
            None => self.release(&operation),
        }
        true
    }

    /// Drops every pending operation and its callback.
    pub(crate) fn clear(&mut self) -> Vec<Operation> {
        let failed = std::mem::take(&mut self.failed);
        let operations = self.operations.drain();
        for (key, operation) in &operations {
            if !failed.contains(key) {
                self.release(operation);
            }
        }
        self.timers.clear();
        operations.into_iter().map(|(_, operation)| operation).collect()
    }

    fn release(&self, operation: &Operation) {
        if let Some(fd) = operation.fd() {
            if let Err(err) = self.poller.deregister(fd, operation.interest()) {
                log::trace!("deregistering fd {fd} failed: {err}");
            }
        }
    }

    fn next_deadline(&mut self) -> Option<Instant> {
        // Cancelled timers leave stale heap entries behind.
        while let Some(Reverse((deadline, key))) = self.timers.peek().copied() {
            if self.operations.contains(key) {
                return Some(deadline);
            }
            self.timers.pop();
        }
        None
    }

    /// Runs one reactor turn.
    ///
    /// Waits for readiness for at most `timeout` (shortened to the next timer
    /// deadline), performs the ready operations and returns the completions
    /// of those that finished. `None` waits indefinitely.
    pub(crate) fn turn(&mut self, timeout: Option<Duration>) -> io::Result<Vec<Ready>> {
        let mut ready = Vec::new();

        for key in std::mem::take(&mut self.failed) {
            if let Some(operation) = self.operations.remove(key) {
                ready.push(operation.into_ready());
            }
        }

        let timeout = if ready.is_empty() {
            let now = Instant::now();
            let until_timer = self
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(now));
            match (timeout, until_timer) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            }
        } else {
            Some(Duration::ZERO)
        };

        self.events.clear();
        self.poller.poll(&mut self.events, timeout)?;

        for index in 0..self.events.len() {
            let event = self.events[index];
            if event.token == WAKE_TOKEN {
                self.notifier.drain();
                continue;
            }

            log::trace!(
                "event for {:?} (readable: {}, writable: {}, closed: {})",
                Key::from_token(event.token),
                event.readable,
                event.writable,
                event.closed
            );
            self.dispatch(Key::from_token(event.token), &mut ready);
        }

        self.fire_timers(&mut ready);

        Ok(ready)
    }

    fn dispatch(&mut self, key: Key, ready: &mut Vec<Ready>) {
        let finished = match self.operations.get_mut(key) {
            Some(operation) => operation.attempt(),
            None => return,
        };

        if finished {
            if let Some(operation) = self.operations.remove(key) {
                self.release(&operation);
                ready.push(operation.into_ready());
            }
        }
    }

    fn fire_timers(&mut self, ready: &mut Vec<Ready>) {
        let now = Instant::now();
        while let Some(Reverse((deadline, key))) = self.timers.peek().copied() {
            if deadline > now {
                break;
            }
            self.timers.pop();
            if let Some(operation) = self.operations.remove(key) {
                ready.push(operation.into_ready());
            }
        }
    }
}
