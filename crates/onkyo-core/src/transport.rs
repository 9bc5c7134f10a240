//! Transport traits for receiver communication.
//!
//! The [`Transport`] trait abstracts over an open eISCP session: it takes a
//! [`Command`] and returns whatever loosely-typed [`Response`] the receiver
//! produced. Packet framing lives entirely behind this trait. A
//! [`Connector`] opens transports and hands each one the session's event
//! sender so unsolicited updates can be published.
//!
//! Many eISCP clients are synchronous. Wrap one in [`Blocking`] to run
//! every call on tokio's blocking pool instead of the async scheduler.
//!
//! Session logic is tested against `MockTransport` and `MockConnector`
//! from the `onkyo-test-harness` crate.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::{Error, Result};
use crate::events::ReceiverEvent;
use crate::types::{Command, Response};

/// Sender half of a session's event channel.
pub type EventSender = broadcast::Sender<ReceiverEvent>;

/// An open session to one receiver.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a command and wait for the receiver's response.
    async fn send(&mut self, command: &Command) -> Result<Response>;

    /// Close the session.
    ///
    /// After calling `close()`, subsequent `send()` calls should return
    /// [`Error::NotConnected`].
    async fn close(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Model name reported by the receiver during discovery, if known.
    fn model_name(&self) -> Option<String> {
        None
    }
}

/// Opens [`Transport`]s to a receiver.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a session to `host`.
    ///
    /// `events` is the owning session's event sender. Implementations that
    /// receive unsolicited updates publish them as
    /// [`ReceiverEvent::Update`].
    async fn connect(&self, host: &str, events: EventSender) -> Result<Box<dyn Transport>>;
}

/// A synchronous eISCP client.
pub trait BlockingTransport: Send + Sync + 'static {
    /// Send a rendered command string and block until the response arrives.
    fn send(&mut self, command: &str) -> Result<Response>;

    fn close(&mut self) -> Result<()>;

    fn model_name(&self) -> Option<String> {
        None
    }
}

/// Adapter running a [`BlockingTransport`] on tokio's blocking pool.
///
/// The client moves into each blocking task and comes back with its
/// result. A panic inside the client loses it, and the adapter then
/// reports [`Error::NotConnected`].
pub struct Blocking<T> {
    inner: Option<T>,
    model_name: Option<String>,
}

impl<T: BlockingTransport> Blocking<T> {
    pub fn new(client: T) -> Self {
        let model_name = client.model_name();
        Blocking {
            inner: Some(client),
            model_name,
        }
    }
}

#[async_trait]
impl<T: BlockingTransport> Transport for Blocking<T> {
    async fn send(&mut self, command: &Command) -> Result<Response> {
        let mut client = self.inner.take().ok_or(Error::NotConnected)?;
        let wire = command.to_string();
        let (client, result) = tokio::task::spawn_blocking(move || {
            let result = client.send(&wire);
            (client, result)
        })
        .await
        .map_err(|e| Error::Unknown(format!("blocking transport task failed: {e}")))?;
        self.inner = Some(client);
        result
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut client) = self.inner.take() else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || client.close())
            .await
            .map_err(|e| Error::Unknown(format!("blocking transport task failed: {e}")))?
    }

    fn is_connected(&self) -> bool {
        self.inner.is_some()
    }

    fn model_name(&self) -> Option<String> {
        self.model_name.clone()
    }
}
