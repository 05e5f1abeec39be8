//! Self-pipe used to interrupt a blocked poll from any thread.

use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;

pub(crate) struct Notifier {
    sender: UnixStream,
    receiver: UnixStream,
}

impl Notifier {
    pub(crate) fn new() -> io::Result<Self> {
        let (sender, receiver) = UnixStream::pair()?;
        sender.set_nonblocking(true)?;
        receiver.set_nonblocking(true)?;

        Ok(Self { sender, receiver })
    }

    /// Makes the receiving end readable. Safe to call from any thread.
    pub(crate) fn notify(&self) {
        // A full pipe already guarantees a pending wake-up.
        if let Err(err) = (&self.sender).write(&[1]) {
            if err.kind() != io::ErrorKind::WouldBlock {
                log::warn!("failed to notify the reactor: {err}");
            }
        }
    }

    /// Consumes every pending notification.
    pub(crate) fn drain(&self) {
        let mut buf = [0u8; 64];
        loop {
            match (&self.receiver).read(&mut buf) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    }

    pub(crate) fn fd(&self) -> RawFd {
        self.receiver.as_raw_fd()
    }
}
