//! Suspension bridge: one reactor callback turned into one `.await`.
//!
//! A [`Bridge`] carries the description of a single operation. Its first
//! poll registers the operation with the reactor and always returns
//! `Pending`, even when the descriptor is already ready. The completion
//! callback only captures the shared outcome slot: it stores the result and
//! wakes whatever waker the slot holds. The next poll takes the result out.
//!
//! Dropping a bridge whose operation is still pending cancels the
//! registration, so the callback can never fire into a released task.

use crate::reactor::operation::{Completion, Operation};
use crate::runtime::Handle;
use crate::utils::slab::Key;

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

struct Outcome<T> {
    value: Option<T>,
    waker: Option<Waker>,
}

type Request<T> = Box<dyn FnOnce(Completion<T>) -> Operation>;

#[must_use = "futures do nothing unless awaited"]
pub struct Bridge<T: 'static> {
    handle: Handle,
    request: Option<Request<T>>,
    /// Set while the operation is registered with the reactor.
    key: Option<Key>,
    slot: Rc<RefCell<Outcome<T>>>,
}

impl<T: 'static> Bridge<T> {
    /// `request` builds the operation around the completion callback it is
    /// given; it runs on the first poll.
    pub(crate) fn new<R>(handle: Handle, request: R) -> Self
    where
        R: FnOnce(Completion<T>) -> Operation + 'static,
    {
        Self {
            handle,
            request: Some(Box::new(request)),
            key: None,
            slot: Rc::new(RefCell::new(Outcome {
                value: None,
                waker: None,
            })),
        }
    }

    fn suspend(&mut self, request: Request<T>, waker: &Waker) {
        self.slot.borrow_mut().waker = Some(waker.clone());

        let slot = Rc::clone(&self.slot);
        let operation = request(Box::new(move |value| {
            let waker = {
                let mut outcome = slot.borrow_mut();
                outcome.value = Some(value);
                outcome.waker.take()
            };

            if let Some(waker) = waker {
                waker.wake();
            }
        }));

        self.key = Some(self.handle.register(operation));
    }
}

impl<T: 'static> Future for Bridge<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = self.get_mut();

        if let Some(request) = this.request.take() {
            this.suspend(request, cx.waker());
            return Poll::Pending;
        }

        let mut outcome = this.slot.borrow_mut();
        match outcome.value.take() {
            Some(value) => {
                this.key = None;
                Poll::Ready(value)
            }
            None => {
                let current = outcome.waker.as_ref();
                if !current.is_some_and(|waker| waker.will_wake(cx.waker())) {
                    outcome.waker = Some(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

impl<T: 'static> Drop for Bridge<T> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            if self.handle.cancel(key) {
                log::trace!("pending operation {key:?} cancelled by its bridge");
            }
        }
    }
}
