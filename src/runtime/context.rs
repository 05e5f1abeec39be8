//! Thread-local "current runtime" used by primitives that are not handed a
//! [`Handle`] explicitly, such as [`crate::time::sleep`] and
//! [`TcpListener::bind`](crate::net::TcpListener::bind).
//!
//! The context is entered for the duration of `Runtime::run` and
//! `Runtime::block_on`, so every task poll sees it. Entering nests: the
//! previous handle is restored when the guard drops.

use crate::runtime::Handle;

use std::cell::RefCell;

thread_local! {
    static CURRENT: RefCell<Option<Handle>> = const { RefCell::new(None) };
}

pub(crate) struct EnterGuard {
    previous: Option<Handle>,
}

pub(crate) fn enter(handle: Handle) -> EnterGuard {
    let previous = CURRENT.with(|current| current.borrow_mut().replace(handle));
    EnterGuard { previous }
}

impl Drop for EnterGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // The handle being replaced is dropped outside the borrow.
        let _left = CURRENT.with(|current| std::mem::replace(&mut *current.borrow_mut(), previous));
    }
}

pub(crate) fn try_current() -> Option<Handle> {
    CURRENT.with(|current| current.borrow().clone())
}
