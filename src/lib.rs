//! Single-threaded callback reactor with a small task runtime on top, and a
//! TCP echo server built from it.
//!
//! # Architecture
//!
//! - **Reactor**: one-shot operations (read, write, accept, timer) whose
//!   completion callbacks run on a later turn, never during registration
//! - **Bridge**: turns one reactor operation into a future that suspends on
//!   its first poll and resolves on the poll after the callback fired
//! - **Runtime**: task arena plus a deferred resumption queue; every poll of
//!   every task starts from that queue
//! - **TaskHandle**: a dormant task that only runs once scheduled
//! - **Server**: the accept loop and the per-connection echo session
//!
//! ```ignore
//! use reactor_echo::{Runtime, ServerConfig, serve, signal};
//!
//! let mut runtime = Runtime::new()?;
//! let handle = runtime.handle();
//! signal::stop_on_shutdown(&handle)?;
//! serve(&handle, ServerConfig::default())?;
//! runtime.run()?;
//! ```

mod bridge;
mod builder;
mod config;
mod error;
mod reactor;
mod runtime;
mod server;
mod task;
mod utils;

pub mod net;
pub mod signal;
pub mod time;

pub use builder::RuntimeBuilder;
pub use config::ServerConfig;
pub use error::{Error, Result};
pub use runtime::{Handle, Runtime, StopHandle};
pub use server::{listen, serve, serve_listener, session};
pub use task::{TaskHandle, TaskId};
