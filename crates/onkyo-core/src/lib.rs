//! onkyo-core: Core traits, types, and error definitions for onkyo.
//!
//! This crate defines the transport-agnostic pieces shared by the eISCP
//! session layer and its test harness. Applications that only need to talk
//! about receivers (zones, power, volume) depend on it without pulling in
//! the session machinery.
//!
//! # Key types
//!
//! - [`Transport`] / [`Connector`] -- an open eISCP session and its factory
//! - [`Command`] / [`Response`] -- what goes to the receiver and what comes back
//! - [`response`] -- tolerant parsing of loosely-typed responses
//! - [`VolumeScale`] -- receiver-scale volume to fraction conversion
//! - [`ReceiverEvent`] -- asynchronous state and connection notifications
//! - [`Error`] / [`Result`] / [`FailureKind`] -- error handling

pub mod error;
pub mod events;
pub mod response;
pub mod transport;
pub mod types;
pub mod volume;

// Re-export key types at crate root for ergonomic `use onkyo_core::*`.
pub use error::{Error, FailureKind, Result};
pub use events::{ReceiverEvent, UpdateKind};
pub use transport::{Blocking, BlockingTransport, Connector, EventSender, Transport};
pub use types::*;
pub use volume::{VolumeResolution, VolumeScale};
