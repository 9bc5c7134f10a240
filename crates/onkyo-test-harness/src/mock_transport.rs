//! Mock transport for deterministic testing of the session layer.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! command/response pairs. This lets you test command generation, response
//! normalization, and reconnect handling without a receiver on the network.
//!
//! Clones share one script, so a test can keep a clone to inspect what was
//! sent after the original has been boxed and handed to a session.
//!
//! # Example
//!
//! ```
//! use onkyo_core::Response;
//! use onkyo_test_harness::MockTransport;
//!
//! let mock = MockTransport::new();
//! // Pre-load: when the session sends this command, return this response.
//! mock.expect("system-power=query", Response::pair("system-power", "on"));
//! // Answer this command every time it is sent, in any order.
//! mock.stub("master-volume=query", Response::pair("master-volume", 40_i64));
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use onkyo_core::error::{Error, Result};
use onkyo_core::transport::Transport;
use onkyo_core::types::{Command, Response};

/// A scripted failure.
///
/// Stored instead of an [`Error`] so that one script entry can fail any
/// number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Timeout,
    Refused,
    Network,
    Io(std::io::ErrorKind),
    Protocol,
    Unknown,
}

impl Failure {
    pub fn to_error(self) -> Error {
        match self {
            Failure::Timeout => Error::Timeout,
            Failure::Refused => Error::ConnectionRefused,
            Failure::Network => Error::Network("mock network failure".into()),
            Failure::Io(kind) => Error::Io(std::io::Error::new(kind, "mock I/O failure")),
            Failure::Protocol => Error::Protocol("mock protocol failure".into()),
            Failure::Unknown => Error::Unknown("mock failure".into()),
        }
    }
}

type Reply = std::result::Result<Response, Failure>;

/// A pre-loaded command/reply pair.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact rendered command we expect to be sent.
    command: String,
    reply: Reply,
}

#[derive(Debug)]
struct Script {
    /// Ordered queue of expected command/reply pairs.
    expectations: VecDeque<Expectation>,
    /// Replies used whenever the queue head does not match.
    stubs: HashMap<String, Reply>,
    /// When set, every send fails this way.
    fail_all: Option<Failure>,
    connected: bool,
    model_name: Option<String>,
    /// Log of every rendered command sent through this transport.
    sent_log: Vec<String>,
    close_count: usize,
}

/// A mock [`Transport`] for testing without hardware.
///
/// On `send()` the rendered command is recorded and then answered by, in
/// order of preference: a blanket failure set with
/// [`fail_all()`](Self::fail_all), the next queued expectation if it
/// matches, or a stub registered for that command. A queued expectation
/// that does not match is consumed and reported as a protocol error, as is
/// a command with no expectation or stub at all.
#[derive(Debug, Clone)]
pub struct MockTransport {
    script: Arc<Mutex<Script>>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            script: Arc::new(Mutex::new(Script {
                expectations: VecDeque::new(),
                stubs: HashMap::new(),
                fail_all: None,
                connected: true,
                model_name: None,
                sent_log: Vec::new(),
                close_count: 0,
            })),
        }
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue an expected command and the response to return for it.
    pub fn expect(&self, command: &str, response: impl Into<Response>) {
        self.script().expectations.push_back(Expectation {
            command: command.to_string(),
            reply: Ok(response.into()),
        });
    }

    /// Queue an expected command that fails.
    pub fn expect_failure(&self, command: &str, failure: Failure) {
        self.script().expectations.push_back(Expectation {
            command: command.to_string(),
            reply: Err(failure),
        });
    }

    /// Answer `command` with `response` every time it is sent.
    pub fn stub(&self, command: &str, response: impl Into<Response>) {
        self.script()
            .stubs
            .insert(command.to_string(), Ok(response.into()));
    }

    /// Fail `command` every time it is sent.
    pub fn stub_failure(&self, command: &str, failure: Failure) {
        self.script().stubs.insert(command.to_string(), Err(failure));
    }

    /// Make every subsequent send fail, regardless of the script.
    pub fn fail_all(&self, failure: Failure) {
        self.script().fail_all = Some(failure);
    }

    /// Undo [`fail_all()`](Self::fail_all).
    pub fn recover(&self) {
        self.script().fail_all = None;
    }

    /// Report this model name from [`Transport::model_name`].
    pub fn set_model_name(&self, name: &str) {
        self.script().model_name = Some(name.to_string());
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent `send()` calls return
    /// [`Error::NotConnected`].
    pub fn set_connected(&self, connected: bool) {
        self.script().connected = connected;
    }

    /// Every rendered command sent so far, oldest first.
    pub fn sent_commands(&self) -> Vec<String> {
        self.script().sent_log.clone()
    }

    /// Number of sends for one exact rendered command.
    pub fn sent_count(&self, command: &str) -> usize {
        self.script()
            .sent_log
            .iter()
            .filter(|c| c.as_str() == command)
            .count()
    }

    pub fn clear_sent(&self) {
        self.script().sent_log.clear();
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.script().expectations.len()
    }

    /// How many times `close()` has been called.
    pub fn close_count(&self) -> usize {
        self.script().close_count
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, command: &Command) -> Result<Response> {
        let rendered = command.to_string();
        let mut script = self.script();

        if !script.connected {
            return Err(Error::NotConnected);
        }

        script.sent_log.push(rendered.clone());

        if let Some(failure) = script.fail_all {
            return Err(failure.to_error());
        }

        let head_matches = script
            .expectations
            .front()
            .is_some_and(|e| e.command == rendered);
        let reply = if head_matches {
            script.expectations.pop_front().map(|e| e.reply)
        } else if let Some(reply) = script.stubs.get(&rendered) {
            Some(reply.clone())
        } else if let Some(expectation) = script.expectations.pop_front() {
            return Err(Error::Protocol(format!(
                "unexpected command: expected {:?}, got {:?}",
                expectation.command, rendered
            )));
        } else {
            None
        };

        match reply {
            Some(Ok(response)) => Ok(response),
            Some(Err(failure)) => Err(failure.to_error()),
            None => Err(Error::Protocol(format!(
                "no expectation or stub for {rendered:?} in mock transport"
            ))),
        }
    }

    async fn close(&mut self) -> Result<()> {
        let mut script = self.script();
        script.connected = false;
        script.close_count += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.script().connected
    }

    fn model_name(&self) -> Option<String> {
        self.script().model_name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onkyo_core::types::Zone;

    fn power_query() -> Command {
        Command::named(Zone::Main, "system-power", "query")
    }

    #[tokio::test]
    async fn mock_transport_basic_send() {
        let mut mock = MockTransport::new();
        mock.expect("system-power=query", Response::pair("system-power", "on"));

        let resp = mock.send(&power_query()).await.unwrap();
        assert_eq!(resp, Response::pair("system-power", "on"));
        assert_eq!(mock.remaining_expectations(), 0);
    }

    #[tokio::test]
    async fn mock_transport_tracks_sent_commands() {
        let mut mock = MockTransport::new();
        mock.expect("system-power=query", "on");
        mock.expect("zone2.power=query", "standby");

        mock.send(&power_query()).await.unwrap();
        mock.send(&Command::named(Zone::Zone2, "power", "query"))
            .await
            .unwrap();

        assert_eq!(
            mock.sent_commands(),
            vec!["system-power=query", "zone2.power=query"]
        );
        assert_eq!(mock.sent_count("zone2.power=query"), 1);
    }

    #[tokio::test]
    async fn mock_transport_wrong_command_errors() {
        let mut mock = MockTransport::new();
        mock.expect("master-volume=query", "40");

        let result = mock.send(&power_query()).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
        // The mismatched expectation is consumed.
        assert_eq!(mock.remaining_expectations(), 0);
    }

    #[tokio::test]
    async fn mock_transport_no_expectations_errors() {
        let mut mock = MockTransport::new();
        let result = mock.send(&power_query()).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn mock_transport_stub_repeats() {
        let mut mock = MockTransport::new();
        mock.stub("system-power=query", "on");

        for _ in 0..3 {
            assert_eq!(mock.send(&power_query()).await.unwrap(), Response::from("on"));
        }
        assert_eq!(mock.sent_count("system-power=query"), 3);
    }

    #[tokio::test]
    async fn mock_transport_queue_takes_precedence_over_stub() {
        let mut mock = MockTransport::new();
        mock.stub("system-power=query", "standby");
        mock.expect("system-power=query", "on");

        assert_eq!(mock.send(&power_query()).await.unwrap(), Response::from("on"));
        assert_eq!(
            mock.send(&power_query()).await.unwrap(),
            Response::from("standby")
        );
    }

    #[tokio::test]
    async fn mock_transport_scripted_failures() {
        let mut mock = MockTransport::new();
        mock.expect_failure("system-power=query", Failure::Timeout);
        mock.stub_failure("zone3.power=query", Failure::Refused);

        assert!(matches!(
            mock.send(&power_query()).await,
            Err(Error::Timeout)
        ));
        assert!(matches!(
            mock.send(&Command::named(Zone::Zone3, "power", "query")).await,
            Err(Error::ConnectionRefused)
        ));
    }

    #[tokio::test]
    async fn mock_transport_fail_all_and_recover() {
        let mut mock = MockTransport::new();
        mock.stub("system-power=query", "on");
        mock.fail_all(Failure::Network);

        assert!(matches!(
            mock.send(&power_query()).await,
            Err(Error::Network(_))
        ));

        mock.recover();
        assert!(mock.send(&power_query()).await.is_ok());
    }

    #[tokio::test]
    async fn mock_transport_disconnect() {
        let mut mock = MockTransport::new();
        assert!(mock.is_connected());

        mock.close().await.unwrap();
        assert!(!mock.is_connected());
        assert_eq!(mock.close_count(), 1);

        let result = mock.send(&power_query()).await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn clones_share_the_script() {
        let observer = MockTransport::new();
        observer.stub("system-power=query", "on");

        let mut boxed: Box<dyn Transport> = Box::new(observer.clone());
        boxed.send(&power_query()).await.unwrap();

        assert_eq!(observer.sent_commands(), vec!["system-power=query"]);
    }

    #[test]
    fn failure_maps_to_error() {
        assert!(matches!(Failure::Timeout.to_error(), Error::Timeout));
        assert!(matches!(
            Failure::Io(std::io::ErrorKind::ConnectionReset).to_error(),
            Error::Io(_)
        ));
    }
}
