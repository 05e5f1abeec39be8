//! Event-driven I/O reactor module.
//!
//! - [`core`]: the reactor, a table of pending one-shot operations
//! - [`operation`]: read / write / accept / timer operations and their callbacks
//! - [`poller`]: epoll (Linux) and kqueue (macOS) backends
//! - [`notify`]: self-pipe that interrupts a blocked poll

pub(crate) mod core;
pub(crate) mod notify;
pub(crate) mod operation;
pub(crate) mod poller;
