//! Error types for the dispatcher and the pid guard.
//!
//! # Design
//! Every dispatcher failure is tagged with the phase it happened in so a
//! caller reading the message (or matching on [`Phase`]) can tell a bad URL
//! from a refused connection from a stream that died halfway through the
//! body. Nothing here is logged; the embedding application decides that.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The stage of a dispatch in which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Validation,
    Construction,
    Serialization,
    Dispatch,
    Read,
}

/// Errors returned by `Dispatcher::send_*`.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// An input was rejected before any I/O (unsupported body shape,
    /// non-finite number).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The wire request could not be built from the inputs (malformed
    /// method, URL or header).
    #[error("request construction failed: {0}")]
    Construction(String),

    /// The JSON body could not be encoded.
    #[error("body serialization failed: {0}")]
    Serialization(String),

    /// The request never produced a response: refused connection, DNS
    /// failure, TLS failure or timeout expiry.
    #[error("dispatch to {url} failed: {source}")]
    Dispatch {
        url: String,
        #[source]
        source: ureq::Error,
    },

    /// The response headers arrived but the body could not be drained.
    #[error("response read failed: {0}")]
    Read(String),
}

impl DispatchError {
    pub fn phase(&self) -> Phase {
        match self {
            DispatchError::Validation(_) => Phase::Validation,
            DispatchError::Construction(_) => Phase::Construction,
            DispatchError::Serialization(_) => Phase::Serialization,
            DispatchError::Dispatch { .. } => Phase::Dispatch,
            DispatchError::Read(_) => Phase::Read,
        }
    }
}

/// Errors returned by the pid guard.
#[derive(Debug, Error)]
pub enum PidError {
    /// A live process already owns the pid file.
    #[error("pid already running: {pid}")]
    AlreadyRunning { pid: u32 },

    /// The pid file could not be created, locked or written.
    #[error("failed to write pid file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
