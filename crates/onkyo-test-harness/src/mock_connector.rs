//! Mock connector that hands out scripted transports.
//!
//! [`MockConnector`] implements [`Connector`] on top of a shared
//! [`MockTransport`] script. Every successful `connect()` returns a fresh
//! clone of that script, so reconnect logic sees the same expectations as
//! the original session. Connect attempts can be made to fail, and pushed
//! updates can be injected onto the event channel of the most recent
//! session.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use onkyo_core::error::Result;
use onkyo_core::events::{ReceiverEvent, UpdateKind};
use onkyo_core::transport::{Connector, EventSender, Transport};
use onkyo_core::types::{Response, Zone};

use crate::mock_transport::{Failure, MockTransport};

#[derive(Debug, Default)]
struct ConnectState {
    /// One-shot failures consumed by the next connect attempts.
    queued_failures: VecDeque<Failure>,
    /// When set, every connect attempt fails this way.
    refuse: Option<Failure>,
    /// Hosts passed to `connect()`, oldest first.
    hosts: Vec<String>,
    events: Option<EventSender>,
}

/// A mock [`Connector`] for testing setup and reconnect paths.
#[derive(Debug, Clone)]
pub struct MockConnector {
    transport: MockTransport,
    state: Arc<Mutex<ConnectState>>,
}

impl MockConnector {
    /// Create a connector whose sessions all follow `transport`'s script.
    pub fn new(transport: MockTransport) -> Self {
        MockConnector {
            transport,
            state: Arc::new(Mutex::new(ConnectState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, ConnectState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The shared transport script.
    pub fn transport(&self) -> &MockTransport {
        &self.transport
    }

    /// Fail the next connect attempt with `failure`.
    pub fn fail_next_connect(&self, failure: Failure) {
        self.state().queued_failures.push_back(failure);
    }

    /// Fail every connect attempt with `failure` until [`accept()`](Self::accept).
    pub fn refuse(&self, failure: Failure) {
        self.state().refuse = Some(failure);
    }

    pub fn accept(&self) {
        self.state().refuse = None;
    }

    /// Number of connect attempts so far, successful or not.
    pub fn connect_attempts(&self) -> usize {
        self.state().hosts.len()
    }

    pub fn hosts(&self) -> Vec<String> {
        self.state().hosts.clone()
    }

    /// Publish an unsolicited update as the receiver would.
    ///
    /// `command` is the eISCP command name, e.g. `system-power` or `volume`.
    /// Returns `false` if no session has connected yet or nobody is
    /// subscribed.
    pub fn push(&self, zone: Zone, command: &str, value: impl Into<Response>) -> bool {
        let Some(events) = self.state().events.clone() else {
            return false;
        };
        events
            .send(ReceiverEvent::Update {
                zone,
                kind: UpdateKind::from_command(command),
                value: value.into(),
            })
            .is_ok()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, host: &str, events: EventSender) -> Result<Box<dyn Transport>> {
        {
            let mut state = self.state();
            state.hosts.push(host.to_string());
            if let Some(failure) = state.queued_failures.pop_front() {
                return Err(failure.to_error());
            }
            if let Some(failure) = state.refuse {
                return Err(failure.to_error());
            }
            state.events = Some(events);
        }
        self.transport.set_connected(true);
        Ok(Box::new(self.transport.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onkyo_core::error::Error;
    use onkyo_core::types::Command;
    use tokio::sync::broadcast;

    #[tokio::test]
    async fn connect_returns_scripted_transport() {
        let mock = MockTransport::new();
        mock.stub("system-power=query", "on");
        let connector = MockConnector::new(mock.clone());
        let (tx, _rx) = broadcast::channel(8);

        let mut transport = connector.connect("192.168.1.20", tx).await.unwrap();
        let resp = transport
            .send(&Command::named(Zone::Main, "system-power", "query"))
            .await
            .unwrap();

        assert_eq!(resp, Response::from("on"));
        assert_eq!(connector.hosts(), vec!["192.168.1.20"]);
        assert_eq!(mock.sent_commands(), vec!["system-power=query"]);
    }

    #[tokio::test]
    async fn connect_reopens_closed_transport() {
        let mock = MockTransport::new();
        let connector = MockConnector::new(mock.clone());
        let (tx, _rx) = broadcast::channel(8);

        let mut first = connector.connect("host", tx.clone()).await.unwrap();
        first.close().await.unwrap();
        assert!(!mock.is_connected());

        let second = connector.connect("host", tx).await.unwrap();
        assert!(second.is_connected());
    }

    #[tokio::test]
    async fn queued_connect_failures_are_consumed() {
        let connector = MockConnector::new(MockTransport::new());
        connector.fail_next_connect(Failure::Timeout);
        let (tx, _rx) = broadcast::channel(8);

        let err = connector.connect("host", tx.clone()).await.err().unwrap();
        assert!(matches!(err, Error::Timeout));
        assert!(connector.connect("host", tx).await.is_ok());
        assert_eq!(connector.connect_attempts(), 2);
    }

    #[tokio::test]
    async fn refuse_until_accept() {
        let connector = MockConnector::new(MockTransport::new());
        connector.refuse(Failure::Refused);
        let (tx, _rx) = broadcast::channel(8);

        for _ in 0..2 {
            let err = connector.connect("host", tx.clone()).await.err().unwrap();
            assert!(matches!(err, Error::ConnectionRefused));
        }

        connector.accept();
        assert!(connector.connect("host", tx).await.is_ok());
    }

    #[tokio::test]
    async fn push_reaches_subscribers() {
        let connector = MockConnector::new(MockTransport::new());
        assert!(!connector.push(Zone::Main, "system-power", "on"));

        let (tx, mut rx) = broadcast::channel(8);
        connector.connect("host", tx).await.unwrap();

        assert!(connector.push(Zone::Zone2, "volume", 30_i64));
        match rx.try_recv().unwrap() {
            ReceiverEvent::Update { zone, kind, value } => {
                assert_eq!(zone, Zone::Zone2);
                assert_eq!(kind, UpdateKind::Volume);
                assert_eq!(value, Response::Number(30));
            }
            other => panic!("expected Update, got {other:?}"),
        }
    }
}
