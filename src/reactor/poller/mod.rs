//! OS readiness notification backends.
//!
//! Both backends expose the same shape: register a descriptor under a token
//! with a read or write interest, deregister it, and wait for readiness with
//! an optional timeout. The reactor never learns which one it is talking to.

#[cfg(target_os = "linux")]
mod epoll;
#[cfg(target_os = "macos")]
mod kqueue;

#[cfg(target_os = "linux")]
pub(crate) use epoll::EpollPoller as Poller;
#[cfg(target_os = "macos")]
pub(crate) use kqueue::KqueuePoller as Poller;

use std::time::Duration;

/// Readiness a registration is waiting for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Interest {
    pub(crate) read: bool,
    pub(crate) write: bool,
}

impl Interest {
    pub(crate) const READABLE: Self = Self {
        read: true,
        write: false,
    };

    pub(crate) const WRITABLE: Self = Self {
        read: false,
        write: true,
    };
}

/// One readiness notification reported by the poller.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Event {
    pub(crate) token: u64,
    pub(crate) readable: bool,
    pub(crate) writable: bool,
    /// Error or hang-up condition on the descriptor.
    pub(crate) closed: bool,
}

// Rounds up so a sub-millisecond deadline does not turn into a busy loop.
fn timeout_millis(timeout: Option<Duration>) -> i32 {
    match timeout {
        None => -1,
        Some(duration) => {
            let millis = duration.as_nanos().div_ceil(1_000_000);
            millis.min(i32::MAX as u128) as i32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_rounds_up_to_whole_millis() {
        assert_eq!(timeout_millis(None), -1);
        assert_eq!(timeout_millis(Some(Duration::ZERO)), 0);
        assert_eq!(timeout_millis(Some(Duration::from_micros(10))), 1);
        assert_eq!(timeout_millis(Some(Duration::from_millis(25))), 25);
        assert_eq!(timeout_millis(Some(Duration::from_secs(u64::MAX))), i32::MAX);
    }
}
