//! One-shot operations the reactor performs on behalf of a bridge.
//!
//! An operation owns everything the kernel touches while it is pending: the
//! transport (through an `Rc`, so the descriptor stays open) and the buffer.
//! Both are handed back through the completion callback.

use super::poller::Interest;

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::rc::Rc;
use std::time::Instant;

/// Completion callback invoked at most once with the operation's outcome.
pub(crate) type Completion<T> = Box<dyn FnOnce(T)>;

/// A completion bound to its outcome, ready to be run outside the reactor.
pub(crate) type Ready = Box<dyn FnOnce()>;

/// Outcome of a read or write: the transfer result and the buffer.
pub(crate) type Transferred = (io::Result<usize>, Vec<u8>);

pub(crate) type Accepted = io::Result<(TcpStream, SocketAddr)>;

/// Byte stream the reactor can read from and write to without blocking.
pub(crate) trait Source: AsRawFd {
    fn read_some(&self, buf: &mut [u8]) -> io::Result<usize>;
    fn write_some(&self, buf: &[u8]) -> io::Result<usize>;
}

impl Source for TcpStream {
    fn read_some(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&*self).read(buf)
    }

    fn write_some(&self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }
}

impl Source for UnixStream {
    fn read_some(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&*self).read(buf)
    }

    fn write_some(&self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }
}

pub(crate) struct Transfer {
    source: Rc<dyn Source>,
    buf: Vec<u8>,
    len: usize,
    done: usize,
    outcome: Option<io::Result<usize>>,
    complete: Completion<Transferred>,
}

pub(crate) struct Accept {
    listener: Rc<TcpListener>,
    outcome: Option<Accepted>,
    complete: Completion<Accepted>,
}

pub(crate) struct Timer {
    pub(crate) deadline: Instant,
    complete: Completion<()>,
}

pub(crate) enum Operation {
    /// Completes as soon as any bytes arrive.
    Read(Transfer),
    /// Completes once `buf[..len]` was fully written, or on error.
    Write(Transfer),
    Accept(Accept),
    Timer(Timer),
}

impl Operation {
    pub(crate) fn read(source: Rc<dyn Source>, buf: Vec<u8>, complete: Completion<Transferred>) -> Self {
        let len = buf.len();
        Self::Read(Transfer {
            source,
            buf,
            len,
            done: 0,
            outcome: None,
            complete,
        })
    }

    /// Writes the first `len` bytes of `buf` (clamped to its length).
    pub(crate) fn write(
        source: Rc<dyn Source>,
        buf: Vec<u8>,
        len: usize,
        complete: Completion<Transferred>,
    ) -> Self {
        let len = len.min(buf.len());
        Self::Write(Transfer {
            source,
            buf,
            len,
            done: 0,
            outcome: None,
            complete,
        })
    }

    pub(crate) fn accept(listener: Rc<TcpListener>, complete: Completion<Accepted>) -> Self {
        Self::Accept(Accept {
            listener,
            outcome: None,
            complete,
        })
    }

    pub(crate) fn timer(deadline: Instant, complete: Completion<()>) -> Self {
        Self::Timer(Timer { deadline, complete })
    }

    /// Descriptor to watch, or `None` for timers.
    pub(crate) fn fd(&self) -> Option<RawFd> {
        match self {
            Self::Read(t) | Self::Write(t) => Some(t.source.as_raw_fd()),
            Self::Accept(a) => Some(a.listener.as_raw_fd()),
            Self::Timer(_) => None,
        }
    }

    pub(crate) fn interest(&self) -> Interest {
        match self {
            Self::Write(_) => Interest::WRITABLE,
            _ => Interest::READABLE,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Read(_) => "read",
            Self::Write(_) => "write",
            Self::Accept(_) => "accept",
            Self::Timer(_) => "timer",
        }
    }

    /// Performs the non-blocking system call(s).
    ///
    /// Returns `true` once an outcome has been recorded; `false` means the
    /// descriptor would block and the operation stays registered.
    pub(crate) fn attempt(&mut self) -> bool {
        match self {
            Self::Read(t) => t.read(),
            Self::Write(t) => t.write(),
            Self::Accept(a) => a.accept(),
            Self::Timer(t) => Instant::now() >= t.deadline,
        }
    }

    /// Records `err` as the outcome; used when registration itself failed.
    pub(crate) fn fail(&mut self, err: io::Error) {
        match self {
            Self::Read(t) | Self::Write(t) => t.outcome = Some(Err(err)),
            Self::Accept(a) => a.outcome = Some(Err(err)),
            Self::Timer(_) => {}
        }
    }

    /// Binds the completion callback to the recorded outcome.
    pub(crate) fn into_ready(self) -> Ready {
        match self {
            Self::Read(t) | Self::Write(t) => {
                let Transfer {
                    buf,
                    outcome,
                    complete,
                    ..
                } = t;
                let result = outcome.unwrap_or_else(|| Err(abandoned()));
                Box::new(move || complete((result, buf)))
            }
            Self::Accept(a) => {
                let result = a.outcome.unwrap_or_else(|| Err(abandoned()));
                let complete = a.complete;
                Box::new(move || complete(result))
            }
            Self::Timer(t) => {
                let complete = t.complete;
                Box::new(move || complete(()))
            }
        }
    }
}

fn abandoned() -> io::Error {
    io::Error::other("operation completed without an outcome")
}

impl Transfer {
    fn read(&mut self) -> bool {
        loop {
            match self.source.read_some(&mut self.buf[..self.len]) {
                Ok(n) => {
                    self.outcome = Some(Ok(n));
                    return true;
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return false,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.outcome = Some(Err(err));
                    return true;
                }
            }
        }
    }

    fn write(&mut self) -> bool {
        while self.done < self.len {
            match self.source.write_some(&self.buf[self.done..self.len]) {
                Ok(0) => {
                    self.outcome = Some(Err(io::ErrorKind::WriteZero.into()));
                    return true;
                }
                Ok(n) => self.done += n,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return false,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.outcome = Some(Err(err));
                    return true;
                }
            }
        }

        self.outcome = Some(Ok(self.done));
        true
    }
}

impl Accept {
    fn accept(&mut self) -> bool {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    self.outcome = Some(stream.set_nonblocking(true).map(|()| (stream, peer)));
                    return true;
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return false,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.outcome = Some(Err(err));
                    return true;
                }
            }
        }
    }
}
