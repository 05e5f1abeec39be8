//! TCP listener for accepting incoming connections.
//!
//! ```ignore
//! use reactor_echo::net::TcpListener;
//!
//! async fn server() -> reactor_echo::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8080".parse().unwrap())?;
//!     loop {
//!         let (stream, peer) = listener.accept().await?;
//!         println!("New connection from {peer}");
//!     }
//! }
//! ```

use crate::bridge::Bridge;
use crate::error::{Error, Result};
use crate::net::tcp_stream::TcpStream;
use crate::reactor::operation::{Accepted, Operation};
use crate::runtime::Handle;

use std::io;
use std::net::SocketAddr;
use std::os::unix::io::{AsRawFd, RawFd};
use std::rc::Rc;

/// A non-blocking TCP listener driven by the reactor.
pub struct TcpListener {
    inner: Rc<std::net::TcpListener>,
    handle: Handle,
}

impl TcpListener {
    /// Binds a listener on the current runtime.
    ///
    /// # Panics
    /// Panics when called outside of a running runtime.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        Self::bind_with(addr, &Handle::current())
    }

    /// Binds a listener driven by `handle`'s reactor.
    pub fn bind_with(addr: SocketAddr, handle: &Handle) -> Result<Self> {
        let bind = || -> io::Result<std::net::TcpListener> {
            let listener = std::net::TcpListener::bind(addr)?;
            listener.set_nonblocking(true)?;
            Ok(listener)
        };

        let listener = bind().map_err(|source| Error::Bind { addr, source })?;

        Ok(Self {
            inner: Rc::new(listener),
            handle: handle.clone(),
        })
    }

    /// Suspends until a connection arrives.
    pub async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        let listener = self.inner.clone();
        let accepted: Accepted = Bridge::new(self.handle.clone(), move |complete| {
            Operation::accept(listener, complete)
        })
        .await;

        let (stream, peer) = accepted?;
        Ok((TcpStream::new(stream, self.handle.clone()), peer))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

impl AsRawFd for TcpListener {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

impl std::fmt::Debug for TcpListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpListener")
            .field("addr", &self.inner.local_addr().ok())
            .finish()
    }
}
