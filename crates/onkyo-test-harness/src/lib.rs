//! onkyo-test-harness: Test utilities and mock transports for onkyo.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! the session layer without a real receiver, and [`MockConnector`] for
//! exercising setup, reconnect, and push-update paths.

pub mod mock_connector;
pub mod mock_transport;

pub use mock_connector::MockConnector;
pub use mock_transport::{Failure, MockTransport};
