//! Echo server settings.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3386;
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Settings for [`serve`](crate::serve).
///
/// # Example
/// ```ignore
/// let config = ServerConfig::default()
///     .with_addr("127.0.0.1:0".parse()?)
///     .with_buffer_size(4096);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Endpoint to listen on.
    pub addr: SocketAddr,
    /// Size of the per-session echo buffer. Never zero.
    pub buffer_size: usize,
    /// First delay after the listener runs out of descriptors or memory.
    pub accept_backoff: Duration,
    /// Upper bound for the doubling accept backoff.
    pub max_accept_backoff: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            buffer_size: DEFAULT_BUFFER_SIZE,
            accept_backoff: Duration::from_millis(10),
            max_accept_backoff: Duration::from_secs(1),
        }
    }
}

impl ServerConfig {
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    /// Values below 1 are raised to 1.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Sets the initial and maximum accept backoff. The maximum is raised
    /// to `initial` when smaller.
    pub fn with_accept_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.accept_backoff = initial;
        self.max_accept_backoff = max.max(initial);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_published_endpoint() {
        let config = ServerConfig::default();
        assert_eq!(config.addr.to_string(), "127.0.0.1:3386");
        assert_eq!(config.buffer_size, 1024);
    }

    #[test]
    fn zero_buffer_is_raised() {
        assert_eq!(ServerConfig::default().with_buffer_size(0).buffer_size, 1);
    }

    #[test]
    fn backoff_maximum_never_below_initial() {
        let config = ServerConfig::default()
            .with_accept_backoff(Duration::from_millis(50), Duration::from_millis(5));
        assert_eq!(config.max_accept_backoff, Duration::from_millis(50));
    }
}
