//! Outbound HTTP request helpers and a pid-file guard.
//!
//! # Overview
//! - [`Dispatcher`] sends one form, JSON or XML request per call and returns
//!   the fully read response as a [`ResponseRecord`]. Calls block until the
//!   round-trip completes or the per-encoding timeout expires.
//! - [`write_pid_file`] and [`PidLock`] keep a second copy of a process from
//!   running against the same pid file.
//!
//! # Design
//! - The dispatcher is stateless apart from its configuration; each call uses
//!   its own connection and nothing is retried.
//! - Each dispatch is split into `prepare_*` (builds the wire request, no
//!   I/O) and `send_*` (executes it), so the encoding rules can be checked
//!   without a server.
//! - Errors name the phase that failed. The library never logs errors; it
//!   only emits `debug`/`trace` events through `tracing`.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod pid;
pub mod types;

pub use client::{send_form, send_json, send_xml, Dispatcher};
pub use config::DispatcherConfig;
pub use error::{DispatchError, Phase, PidError};
pub use http::{BodyEncoding, RequestDescriptor, ResponseRecord, XmlRequest};
pub use pid::{is_process_running, read_pid_file, write_pid_file, PidLock};
pub use types::BodyValue;
