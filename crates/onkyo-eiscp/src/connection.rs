//! Serialized, rate-limited, self-healing access to one receiver.
//!
//! A [`ConnectionManager`] owns the only [`Transport`] for a receiver. Every
//! command from every zone goes through [`ConnectionManager::execute`],
//! which holds one async mutex for the whole exchange:
//!
//! 1. wait until [`ConnectionConfig::command_spacing`] has passed since the
//!    previous dispatch started
//! 2. reconnect first if the session is marked disconnected
//! 3. send, bounded by [`ConnectionConfig::command_timeout`]
//! 4. on failure, mark the session disconnected and dispose of the
//!    transport, so the next call reconnects
//!
//! Reconnects back off exponentially
//! ([`ConnectionConfig::backoff_delay`]) and the attempt counter only
//! resets after a successful probe or command, so a dead receiver is
//! retried with ever longer pauses instead of in a hot loop.
//!
//! [`ConnectionManager::send`] is the non-failing variant: it returns
//! `None` for anything that went wrong.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

use onkyo_core::error::{Error, Result};
use onkyo_core::events::ReceiverEvent;
use onkyo_core::transport::{Connector, Transport};
use onkyo_core::types::{Command, Response, Zone};

use crate::commands;
use crate::config::ConnectionConfig;

/// Capacity of the session event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// State guarded by the session lock.
struct Session {
    transport: Option<Box<dyn Transport>>,
    /// Start of the most recent dispatch.
    last_dispatch: Option<Instant>,
    model_name: Option<String>,
    /// Set by [`ConnectionManager::close`]; no further I/O after this.
    shutdown: bool,
}

/// The single point of access to one receiver.
pub struct ConnectionManager {
    host: String,
    connector: Arc<dyn Connector>,
    config: ConnectionConfig,
    session: Mutex<Session>,
    connected: AtomicBool,
    reconnect_attempt: AtomicU32,
    event_tx: broadcast::Sender<ReceiverEvent>,
}

impl ConnectionManager {
    /// Create a manager in the disconnected state. No I/O happens until
    /// [`connect()`](Self::connect) or the first command.
    pub fn new(host: impl Into<String>, connector: Arc<dyn Connector>, config: ConnectionConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        ConnectionManager {
            host: host.into(),
            connector,
            config,
            session: Mutex::new(Session {
                transport: None,
                last_dispatch: None,
                model_name: None,
                shutdown: false,
            }),
            connected: AtomicBool::new(false),
            reconnect_attempt: AtomicU32::new(0),
            event_tx,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Consecutive failed reconnect attempts.
    pub fn reconnect_attempt(&self) -> u32 {
        self.reconnect_attempt.load(Ordering::SeqCst)
    }

    /// Subscribe to session events: pushed updates and connection changes.
    pub fn subscribe(&self) -> broadcast::Receiver<ReceiverEvent> {
        self.event_tx.subscribe()
    }

    /// Model name reported by the transport, if any session has provided one.
    pub async fn model_name(&self) -> Option<String> {
        self.session.lock().await.model_name.clone()
    }

    /// Open the session and verify it with a power query.
    ///
    /// Unlike [`execute()`](Self::execute) this does not back off; it is the
    /// setup-time attempt. On failure the manager stays disconnected and the
    /// first command will go through the reconnect path.
    pub async fn connect(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.shutdown {
            return Err(Error::NotConnected);
        }
        match self.open(&mut session).await {
            Ok(()) => {
                info!(host = %self.host, "connected to receiver");
                Ok(())
            }
            Err(e) => {
                warn!(host = %self.host, error = %e, "initial connection failed");
                self.drop_transport(&mut session).await;
                Err(e)
            }
        }
    }

    /// Send one command and return the raw response.
    ///
    /// Errors are returned to the caller after the session has been marked
    /// disconnected.
    pub async fn execute(&self, command: &Command) -> Result<Response> {
        let mut session = self.session.lock().await;
        if session.shutdown {
            return Err(Error::NotConnected);
        }
        self.wait_for_spacing(&session).await;
        self.check_transport(&mut session).await;
        if !self.is_connected() {
            self.reconnect(&mut session).await?;
        }

        match self.dispatch(&mut session, command).await {
            Ok(response) => {
                self.reconnect_attempt.store(0, Ordering::SeqCst);
                Ok(response)
            }
            Err(e) => {
                warn!(host = %self.host, %command, error = %e, "command failed, marking disconnected");
                self.drop_transport(&mut session).await;
                Err(e)
            }
        }
    }

    /// Send one command on the current session only.
    ///
    /// Never reconnects: a disconnected session is `NotConnected`. A failed
    /// command is returned without tearing the session down, unless the
    /// transport reports that it lost its connection. Used for setup-time
    /// probes where an error is an answer, not a session fault.
    pub async fn execute_on_session(&self, command: &Command) -> Result<Response> {
        let mut session = self.session.lock().await;
        if session.shutdown {
            return Err(Error::NotConnected);
        }
        self.wait_for_spacing(&session).await;
        self.check_transport(&mut session).await;
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let result = self.dispatch(&mut session, command).await;
        if let Err(e) = &result {
            debug!(host = %self.host, %command, error = %e, "command failed, keeping session");
            self.check_transport(&mut session).await;
        }
        result
    }

    /// Send one command; `None` means it could not be completed.
    pub async fn send(&self, command: &Command) -> Option<Response> {
        match self.execute(command).await {
            Ok(response) => Some(response),
            Err(e) => {
                debug!(host = %self.host, %command, error = %e, "command produced no result");
                None
            }
        }
    }

    /// Release the transport and refuse further commands. Idempotent.
    pub async fn close(&self) {
        let mut session = self.session.lock().await;
        if !session.shutdown {
            debug!(host = %self.host, "closing receiver session");
        }
        session.shutdown = true;
        self.drop_transport(&mut session).await;
    }

    // -----------------------------------------------------------------
    // Internals (all called with the session lock held)
    // -----------------------------------------------------------------

    async fn wait_for_spacing(&self, session: &Session) {
        if let Some(last) = session.last_dispatch {
            let elapsed = last.elapsed();
            if elapsed < self.config.command_spacing {
                tokio::time::sleep(self.config.command_spacing - elapsed).await;
            }
        }
    }

    /// Drop a transport that lost its connection behind our back.
    async fn check_transport(&self, session: &mut Session) {
        let transport_alive = session
            .transport
            .as_ref()
            .is_some_and(|t| t.is_connected());
        if self.is_connected() && !transport_alive {
            debug!(host = %self.host, "transport dropped its connection");
            self.drop_transport(session).await;
        }
    }

    async fn dispatch(&self, session: &mut Session, command: &Command) -> Result<Response> {
        session.last_dispatch = Some(Instant::now());
        debug!(host = %self.host, %command, "dispatching command");
        match session.transport.as_mut() {
            Some(transport) => match timeout(self.config.command_timeout, transport.send(command)).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout),
            },
            None => Err(Error::NotConnected),
        }
    }

    async fn reconnect(&self, session: &mut Session) -> Result<()> {
        let attempt = self.reconnect_attempt.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        let delay = self.config.backoff_delay(attempt);
        debug!(
            host = %self.host,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "reconnecting to receiver"
        );
        let _ = self.event_tx.send(ReceiverEvent::Reconnecting { attempt });
        tokio::time::sleep(delay).await;

        match self.open(session).await {
            Ok(()) => {
                info!(host = %self.host, attempt, "reconnected to receiver");
                self.reconnect_attempt.store(0, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                if attempt >= self.config.escalate_after {
                    error!(host = %self.host, attempt, error = %e, "receiver still unreachable");
                } else {
                    warn!(host = %self.host, attempt, error = %e, "reconnect failed");
                }
                self.drop_transport(session).await;
                Err(e)
            }
        }
    }

    /// Connect if there is no transport, then probe with a power query.
    async fn open(&self, session: &mut Session) -> Result<()> {
        if session.transport.is_none() {
            let connect = self.connector.connect(&self.host, self.event_tx.clone());
            let transport = match timeout(self.config.connect_timeout, connect).await {
                Ok(result) => result?,
                Err(_) => return Err(Error::Timeout),
            };
            if let Some(name) = transport.model_name() {
                session.model_name = Some(name);
            }
            session.transport = Some(transport);
        }

        let probe = commands::cmd_query_power(Zone::Main);
        let transport = session.transport.as_mut().ok_or(Error::NotConnected)?;
        let response = match timeout(self.config.command_timeout, transport.send(&probe)).await {
            Ok(result) => result?,
            Err(_) => return Err(Error::Timeout),
        };
        if response.is_empty() {
            return Err(Error::Protocol("probe returned no result".into()));
        }

        self.connected.store(true, Ordering::SeqCst);
        let _ = self.event_tx.send(ReceiverEvent::Connected);
        Ok(())
    }

    /// Mark disconnected and close the transport, ignoring close errors.
    async fn drop_transport(&self, session: &mut Session) {
        let was_connected = self.connected.swap(false, Ordering::SeqCst);
        if let Some(mut transport) = session.transport.take() {
            if let Err(e) = transport.close().await {
                debug!(host = %self.host, error = %e, "ignoring error while closing transport");
            }
        }
        if was_connected {
            let _ = self.event_tx.send(ReceiverEvent::Disconnected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use onkyo_core::transport::EventSender;
    use onkyo_test_harness::{Failure, MockConnector, MockTransport};

    const HOST: &str = "192.168.1.40";

    fn volume_query() -> Command {
        commands::cmd_query_volume(Zone::Main)
    }

    fn make_manager(mock: &MockTransport) -> (ConnectionManager, MockConnector) {
        mock.stub("system-power=query", Response::pair("system-power", "on"));
        let connector = MockConnector::new(mock.clone());
        let manager = ConnectionManager::new(
            HOST,
            Arc::new(connector.clone()),
            ConnectionConfig::default(),
        );
        (manager, connector)
    }

    async fn connected_manager(mock: &MockTransport) -> (ConnectionManager, MockConnector) {
        let (manager, connector) = make_manager(mock);
        manager.connect().await.unwrap();
        mock.clear_sent();
        (manager, connector)
    }

    // ---- connect ----

    #[tokio::test]
    async fn connect_probes_power() {
        let mock = MockTransport::new();
        mock.set_model_name("TX-NR686");
        let (manager, connector) = make_manager(&mock);

        manager.connect().await.unwrap();

        assert!(manager.is_connected());
        assert_eq!(connector.hosts(), vec![HOST]);
        assert_eq!(mock.sent_commands(), vec!["system-power=query"]);
        assert_eq!(manager.model_name().await.as_deref(), Some("TX-NR686"));
    }

    #[tokio::test]
    async fn connect_failure_leaves_disconnected() {
        let mock = MockTransport::new();
        let (manager, connector) = make_manager(&mock);
        connector.fail_next_connect(Failure::Timeout);

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, Error::Timeout));
        assert!(!manager.is_connected());
        assert_eq!(manager.reconnect_attempt(), 0);
    }

    #[tokio::test]
    async fn empty_probe_is_a_failure() {
        let mock = MockTransport::new();
        let connector = MockConnector::new(mock.clone());
        mock.stub("system-power=query", Response::Tuple(vec![]));
        let manager = ConnectionManager::new(HOST, Arc::new(connector), ConnectionConfig::default());

        assert!(matches!(manager.connect().await, Err(Error::Protocol(_))));
        assert!(!manager.is_connected());
        assert_eq!(mock.close_count(), 1);
    }

    // ---- execute / send ----

    #[tokio::test(start_paused = true)]
    async fn execute_returns_raw_response() {
        let mock = MockTransport::new();
        let (manager, _connector) = connected_manager(&mock).await;
        mock.expect("master-volume=query", Response::pair("master-volume", 40_i64));

        let resp = manager.execute(&volume_query()).await.unwrap();
        assert_eq!(resp, Response::pair("master-volume", 40_i64));
        assert_eq!(mock.sent_commands(), vec!["master-volume=query"]);
    }

    #[tokio::test(start_paused = true)]
    async fn send_swallows_failures_and_disconnects() {
        let mock = MockTransport::new();
        let (manager, _connector) = connected_manager(&mock).await;
        let mut events = manager.subscribe();
        mock.fail_all(Failure::Io(std::io::ErrorKind::BrokenPipe));

        assert!(manager.send(&volume_query()).await.is_none());
        assert!(!manager.is_connected());
        assert_eq!(mock.close_count(), 1);
        assert!(matches!(events.try_recv(), Ok(ReceiverEvent::Disconnected)));

        // Still no result (and no panic) once reconnects start failing too.
        assert!(manager.send(&volume_query()).await.is_none());
        assert!(!manager.is_connected());
        assert_eq!(manager.reconnect_attempt(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn execute_propagates_error() {
        let mock = MockTransport::new();
        let (manager, _connector) = connected_manager(&mock).await;
        mock.expect_failure("master-volume=query", Failure::Refused);

        let err = manager.execute(&volume_query()).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionRefused));
        assert!(!manager.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn commands_are_spaced() {
        let mock = MockTransport::new();
        let (manager, _connector) = connected_manager(&mock).await;
        mock.stub("master-volume=query", 40_i64);

        manager.execute(&volume_query()).await.unwrap();
        let start = Instant::now();
        manager.execute(&volume_query()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(150));

        tokio::time::sleep(Duration::from_millis(500)).await;
        let start = Instant::now();
        manager.execute(&volume_query()).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_serialized() {
        let mock = MockTransport::new();
        let (manager, _connector) = connected_manager(&mock).await;
        mock.stub("master-volume=query", 40_i64);
        mock.stub("zone2.volume=query", 20_i64);
        mock.stub("zone3.volume=query", 10_i64);
        let manager = Arc::new(manager);

        let start = Instant::now();
        let mut handles = Vec::new();
        for zone in Zone::ALL {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                manager.execute(&commands::cmd_query_volume(zone)).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(mock.sent_commands().len(), 3);
        // Three dispatches need two full spacing gaps.
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn command_timeout_disconnects() {
        struct Hanging;

        #[async_trait]
        impl Transport for Hanging {
            async fn send(&mut self, command: &Command) -> Result<Response> {
                if command.to_string() == "system-power=query" {
                    return Ok(Response::from("on"));
                }
                std::future::pending().await
            }
            async fn close(&mut self) -> Result<()> {
                Ok(())
            }
            fn is_connected(&self) -> bool {
                true
            }
        }

        struct HangingConnector;

        #[async_trait]
        impl Connector for HangingConnector {
            async fn connect(&self, _host: &str, _events: EventSender) -> Result<Box<dyn Transport>> {
                Ok(Box::new(Hanging))
            }
        }

        let manager = ConnectionManager::new(HOST, Arc::new(HangingConnector), ConnectionConfig::default());
        manager.connect().await.unwrap();

        let start = Instant::now();
        let err = manager.execute(&volume_query()).await.unwrap_err();
        assert!(matches!(err, Error::Timeout));
        assert!(start.elapsed() >= Duration::from_secs(10));
        assert!(!manager.is_connected());
    }

    // ---- reconnect ----

    #[tokio::test(start_paused = true)]
    async fn reconnects_after_failure() {
        let mock = MockTransport::new();
        let (manager, connector) = connected_manager(&mock).await;
        let mut events = manager.subscribe();
        mock.expect_failure("master-volume=query", Failure::Network);
        mock.stub("master-volume=query", 40_i64);

        assert!(manager.execute(&volume_query()).await.is_err());

        let start = Instant::now();
        let resp = manager.execute(&volume_query()).await.unwrap();
        assert_eq!(resp, Response::Number(40));
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert!(manager.is_connected());
        assert_eq!(manager.reconnect_attempt(), 0);
        assert_eq!(connector.connect_attempts(), 2);
        assert_eq!(
            mock.sent_commands(),
            vec!["master-volume=query", "system-power=query", "master-volume=query"]
        );

        assert!(matches!(events.try_recv(), Ok(ReceiverEvent::Disconnected)));
        assert!(matches!(
            events.try_recv(),
            Ok(ReceiverEvent::Reconnecting { attempt: 1 })
        ));
        assert!(matches!(events.try_recv(), Ok(ReceiverEvent::Connected)));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_reconnects_back_off() {
        let mock = MockTransport::new();
        let (manager, connector) = connected_manager(&mock).await;
        mock.stub("master-volume=query", 40_i64);
        mock.expect_failure("master-volume=query", Failure::Timeout);
        assert!(manager.send(&volume_query()).await.is_none());

        connector.refuse(Failure::Refused);
        let mut events = manager.subscribe();
        let mut total = Duration::ZERO;
        // Past escalate_after (5) the delays keep growing to the cap.
        for (attempt, delay_secs) in [(1, 1), (2, 2), (3, 4), (4, 8), (5, 16), (6, 32), (7, 60)] {
            let start = Instant::now();
            let err = manager.execute(&volume_query()).await.unwrap_err();
            let elapsed = start.elapsed();
            total += elapsed;

            assert!(matches!(err, Error::ConnectionRefused));
            assert_eq!(manager.reconnect_attempt(), attempt);
            assert!(!manager.is_connected());
            assert!(elapsed >= Duration::from_secs(delay_secs));
            assert!(elapsed < Duration::from_secs(delay_secs + 1));
        }
        // 1 + 2 + 4 + 8 + 16 + 32 + 60
        assert!(total >= Duration::from_secs(123));
        assert_eq!(connector.connect_attempts(), 8);

        let mut announced = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let ReceiverEvent::Reconnecting { attempt } = event {
                announced.push(attempt);
            }
        }
        assert_eq!(announced, vec![1, 2, 3, 4, 5, 6, 7]);

        connector.accept();
        let start = Instant::now();
        assert!(manager.execute(&volume_query()).await.is_ok());
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert!(manager.is_connected());
        assert_eq!(manager.reconnect_attempt(), 0);

        // The next failure starts over at the base delay.
        mock.expect_failure("master-volume=query", Failure::Timeout);
        assert!(manager.send(&volume_query()).await.is_none());
        connector.refuse(Failure::Refused);
        let start = Instant::now();
        assert!(manager.execute(&volume_query()).await.is_err());
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(manager.reconnect_attempt(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn session_only_execute_never_reconnects() {
        let mock = MockTransport::new();
        let (manager, connector) = make_manager(&mock);
        mock.stub("master-volume=query", 40_i64);

        let err = manager.execute_on_session(&volume_query()).await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
        assert_eq!(connector.connect_attempts(), 0);

        manager.connect().await.unwrap();
        mock.expect_failure("master-volume=query", Failure::Timeout);
        assert!(manager.execute_on_session(&volume_query()).await.is_err());
        assert!(manager.is_connected());
        assert_eq!(mock.close_count(), 0);

        assert_eq!(
            manager.execute_on_session(&volume_query()).await.unwrap(),
            Response::Number(40)
        );
        assert_eq!(connector.connect_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnected_start_reconnects_on_first_command() {
        let mock = MockTransport::new();
        let (manager, connector) = make_manager(&mock);
        mock.stub("master-volume=query", 40_i64);

        assert_eq!(manager.send(&volume_query()).await, Some(Response::Number(40)));
        assert!(manager.is_connected());
        assert_eq!(connector.connect_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_that_drops_is_replaced() {
        let mock = MockTransport::new();
        let (manager, connector) = connected_manager(&mock).await;
        mock.stub("master-volume=query", 40_i64);
        mock.set_connected(false);

        assert!(manager.execute(&volume_query()).await.is_ok());
        assert_eq!(connector.connect_attempts(), 2);
    }

    // ---- close ----

    #[tokio::test]
    async fn close_is_idempotent() {
        let mock = MockTransport::new();
        let (manager, _connector) = connected_manager(&mock).await;

        manager.close().await;
        manager.close().await;

        assert!(!manager.is_connected());
        assert_eq!(mock.close_count(), 1);
        assert!(matches!(
            manager.execute(&volume_query()).await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(manager.connect().await, Err(Error::NotConnected)));
    }
}
