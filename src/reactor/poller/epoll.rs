//! Level-triggered epoll backend (Linux).

use super::{Event, Interest, timeout_millis};

use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLLERR, EPOLLHUP, EPOLLIN, EPOLLOUT,
    EPOLLRDHUP, close, epoll_create1, epoll_ctl, epoll_event, epoll_wait,
};
use std::io;
use std::os::unix::io::RawFd;
use std::ptr;
use std::time::Duration;

/// Level-triggered epoll instance.
pub(crate) struct EpollPoller {
    epoll: RawFd,
    buffer: Vec<epoll_event>,
}

impl EpollPoller {
    pub(crate) fn new(capacity: usize) -> io::Result<Self> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            epoll,
            buffer: vec![epoll_event { events: 0, u64: 0 }; capacity.max(1)],
        })
    }

    pub(crate) fn register(&self, fd: RawFd, token: u64, interest: Interest) -> io::Result<()> {
        let mut events = 0;
        if interest.read {
            events |= EPOLLIN | EPOLLRDHUP;
        }
        if interest.write {
            events |= EPOLLOUT;
        }

        let mut event = epoll_event {
            events: events as u32,
            u64: token,
        };

        let ret = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_ADD, fd, &mut event) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    pub(crate) fn deregister(&self, fd: RawFd, _interest: Interest) -> io::Result<()> {
        let ret = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, ptr::null_mut()) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Waits for readiness and appends what was reported to `events`.
    ///
    /// An interrupted wait (a signal landed) reports nothing and succeeds.
    pub(crate) fn poll(&mut self, events: &mut Vec<Event>, timeout: Option<Duration>) -> io::Result<()> {
        let n = unsafe {
            epoll_wait(
                self.epoll,
                self.buffer.as_mut_ptr(),
                self.buffer.len() as i32,
                timeout_millis(timeout),
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        for raw in &self.buffer[..n as usize] {
            // Copy out: epoll_event is packed on some targets.
            let bits = raw.events as i32;
            let token = raw.u64;

            events.push(Event {
                token,
                readable: bits & (EPOLLIN | EPOLLRDHUP) != 0,
                writable: bits & EPOLLOUT != 0,
                closed: bits & (EPOLLERR | EPOLLHUP) != 0,
            });
        }

        Ok(())
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        unsafe {
            close(self.epoll);
        }
    }
}
