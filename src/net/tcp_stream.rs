//! Reactor-driven TCP connection with owned-buffer reads and writes.

use crate::bridge::Bridge;
use crate::reactor::operation::{Operation, Source};
use crate::runtime::Handle;

use std::io;
use std::net::{Shutdown, SocketAddr, ToSocketAddrs};
use std::os::unix::io::{AsRawFd, RawFd};
use std::rc::Rc;

/// A non-blocking TCP connection driven by the reactor.
///
/// Buffers are moved into each operation and handed back with its outcome,
/// so the same allocation can be reused across reads and writes. At most one
/// operation should be in flight per stream.
pub struct TcpStream {
    inner: Rc<std::net::TcpStream>,
    handle: Handle,
}

impl TcpStream {
    /// Wraps an already connected std stream, switching it to non-blocking mode.
    pub fn from_std(stream: std::net::TcpStream, handle: &Handle) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self::new(stream, handle.clone()))
    }

    pub(crate) fn new(stream: std::net::TcpStream, handle: Handle) -> Self {
        Self {
            inner: Rc::new(stream),
            handle,
        }
    }

    /// Connects with a blocking `connect(2)`, then hands the stream to the
    /// current runtime. Meant for clients and tests on a local network.
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = std::net::TcpStream::connect(addr)?;
        Self::from_std(stream, &Handle::current())
    }

    /// Reads whatever is available into `buf`, suspending until at least
    /// one byte arrives.
    ///
    /// The whole of `buf` is offered to the kernel; its length is never
    /// changed. End of stream is reported as [`io::ErrorKind::UnexpectedEof`]
    /// when `buf` is not empty.
    pub async fn read(&self, buf: Vec<u8>) -> (io::Result<usize>, Vec<u8>) {
        let source: Rc<dyn Source> = self.inner.clone();
        let (result, buf) = Bridge::new(self.handle.clone(), move |complete| {
            Operation::read(source, buf, complete)
        })
        .await;

        let result = match result {
            Ok(0) if !buf.is_empty() => Err(io::ErrorKind::UnexpectedEof.into()),
            other => other,
        };

        (result, buf)
    }

    /// Writes the first `len` bytes of `buf`, suspending until all of them
    /// were transferred or an error occurred. Partial writes are never
    /// reported.
    pub async fn write_all(&self, buf: Vec<u8>, len: usize) -> (io::Result<usize>, Vec<u8>) {
        let source: Rc<dyn Source> = self.inner.clone();
        Bridge::new(self.handle.clone(), move |complete| {
            Operation::write(source, buf, len, complete)
        })
        .await
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.inner.peer_addr()
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        self.inner.shutdown(how)
    }
}

impl AsRawFd for TcpStream {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

impl std::fmt::Debug for TcpStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpStream")
            .field("peer", &self.inner.peer_addr().ok())
            .finish()
    }
}
