//! Accept loop and its error policy.

use super::session::session;
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::net::TcpListener;
use crate::runtime::Handle;
use crate::time;

use std::io;
use std::time::Duration;

/// How the accept loop reacts to a failed `accept(2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AcceptFailure {
    /// The pending connection died before it was accepted; try the next one.
    Transient,
    /// Out of descriptors, buffers or memory; wait before trying again.
    Exhausted,
    Fatal,
}

pub(crate) fn classify(err: &io::Error) -> AcceptFailure {
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => return AcceptFailure::Transient,
        _ => {}
    }

    match err.raw_os_error() {
        Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM) => AcceptFailure::Exhausted,
        // Linux passes pending network errors of the new socket through accept.
        Some(
            libc::EPROTO
            | libc::ENOPROTOOPT
            | libc::EHOSTDOWN
            | libc::EHOSTUNREACH
            | libc::EOPNOTSUPP
            | libc::ENETUNREACH
            | libc::ENETDOWN,
        ) => AcceptFailure::Transient,
        _ => AcceptFailure::Fatal,
    }
}

/// Accepts connections forever, running each as its own session task on
/// `handle`.
///
/// Returns only when accepting fails in a way retrying cannot fix.
pub async fn listen(handle: Handle, listener: TcpListener, config: ServerConfig) -> Result<()> {
    let mut backoff = config.accept_backoff;

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                backoff = config.accept_backoff;
                let task = handle.task(session(stream, config.buffer_size));
                log::debug!("accepted {peer} as {}", task.id());
                task.schedule();
            }
            Err(err) => match classify(&err) {
                AcceptFailure::Transient => {
                    log::debug!("accept failed, retrying: {err}");
                }
                AcceptFailure::Exhausted => {
                    log::warn!("accept failed, retrying in {backoff:?}: {err}");
                    time::sleep(backoff).await;
                    backoff = next_backoff(backoff, config.max_accept_backoff);
                }
                AcceptFailure::Fatal => return Err(Error::Accept(err)),
            },
        }
    }
}

fn next_backoff(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vanished_peers_are_transient() {
        for kind in [
            io::ErrorKind::ConnectionAborted,
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::Interrupted,
            io::ErrorKind::WouldBlock,
        ] {
            assert_eq!(classify(&io::Error::from(kind)), AcceptFailure::Transient);
        }

        let proto = io::Error::from_raw_os_error(libc::EPROTO);
        assert_eq!(classify(&proto), AcceptFailure::Transient);
    }

    #[test]
    fn descriptor_exhaustion_backs_off() {
        for errno in [libc::EMFILE, libc::ENFILE, libc::ENOBUFS, libc::ENOMEM] {
            let err = io::Error::from_raw_os_error(errno);
            assert_eq!(classify(&err), AcceptFailure::Exhausted);
        }
    }

    #[test]
    fn everything_else_is_fatal() {
        assert_eq!(classify(&io::Error::from_raw_os_error(libc::EBADF)), AcceptFailure::Fatal);
        assert_eq!(classify(&io::Error::from_raw_os_error(libc::EINVAL)), AcceptFailure::Fatal);
        assert_eq!(classify(&io::Error::other("boom")), AcceptFailure::Fatal);
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let max = Duration::from_millis(100);
        let mut delay = Duration::from_millis(10);
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(delay.as_millis());
            delay = next_backoff(delay, max);
        }
        assert_eq!(seen, [10, 20, 40, 80, 100, 100]);
    }
}
