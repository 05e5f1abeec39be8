//! Crate-level error type.
//!
//! Transport failures inside a running session never show up here: bridges
//! hand back plain [`std::io::Result`]s and the session just stops. This type
//! covers setup and the few failures that end a routine for good.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The OS readiness poller or its wake-up pipe could not be created.
    #[error("failed to create the reactor poller: {0}")]
    Poller(#[source] io::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to install shutdown signal handlers: {0}")]
    Signal(#[source] io::Error),

    /// The listener gave up after an accept error it cannot recover from.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// A stop request arrived before `block_on` could finish its future.
    #[error("runtime stopped before the future completed")]
    Stopped,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
