use super::{Event, Interest};

use libc::{
    EV_ADD, EV_DELETE, EV_ENABLE, EV_EOF, EV_ERROR, EVFILT_READ, EVFILT_WRITE, close, kevent,
    kqueue, timespec,
};
use std::io;
use std::mem;
use std::os::unix::io::RawFd;
use std::ptr;
use std::time::Duration;

pub(crate) struct KqueuePoller {
    kqueue: RawFd,
    buffer: Vec<kevent>,
}

fn change(fd: RawFd, filter: i16, flags: u16, token: u64) -> kevent {
    let mut event: kevent = unsafe { mem::zeroed() };
    event.ident = fd as usize;
    event.filter = filter;
    event.flags = flags;
    event.udata = token as usize as *mut _;
    event
}

impl KqueuePoller {
    pub(crate) fn new(capacity: usize) -> io::Result<Self> {
        let kqueue = unsafe { kqueue() };
        if kqueue < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            kqueue,
            buffer: vec![unsafe { mem::zeroed() }; capacity.max(1)],
        })
    }

    fn apply(&self, changes: &[kevent]) -> io::Result<()> {
        let ret = unsafe {
            kevent(
                self.kqueue,
                changes.as_ptr(),
                changes.len() as i32,
                ptr::null_mut(),
                0,
                ptr::null(),
            )
        };

        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    fn filters(interest: Interest) -> impl Iterator<Item = i16> {
        let read = interest.read.then_some(EVFILT_READ);
        let write = interest.write.then_some(EVFILT_WRITE);
        read.into_iter().chain(write)
    }

    pub(crate) fn register(&self, fd: RawFd, token: u64, interest: Interest) -> io::Result<()> {
        let changes: Vec<kevent> = Self::filters(interest)
            .map(|filter| change(fd, filter, EV_ADD | EV_ENABLE, token))
            .collect();

        self.apply(&changes)
    }

    pub(crate) fn deregister(&self, fd: RawFd, interest: Interest) -> io::Result<()> {
        let changes: Vec<kevent> = Self::filters(interest)
            .map(|filter| change(fd, filter, EV_DELETE, 0))
            .collect();

        self.apply(&changes)
    }

    pub(crate) fn poll(&mut self, events: &mut Vec<Event>, timeout: Option<Duration>) -> io::Result<()> {
        let ts = timeout.map(|duration| timespec {
            tv_sec: duration.as_secs().min(i64::MAX as u64) as _,
            tv_nsec: duration.subsec_nanos() as _,
        });
        let ts_ptr = ts.as_ref().map_or(ptr::null(), |ts| ts as *const timespec);

        let n = unsafe {
            kevent(
                self.kqueue,
                ptr::null(),
                0,
                self.buffer.as_mut_ptr(),
                self.buffer.len() as i32,
                ts_ptr,
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
            events.push(Event {
                token: raw.udata as usize as u64,
                readable: raw.filter == EVFILT_READ,
                writable: raw.filter == EVFILT_WRITE,
                closed: raw.flags & (EV_EOF | EV_ERROR) != 0,
            });
        }

        Ok(())
    }
}

impl Drop for KqueuePoller {
    fn drop(&mut self) {
        unsafe {
            close(self.kqueue);
        }
    }
}
