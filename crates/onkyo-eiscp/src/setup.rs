//! Setup-time checks: connection probe and zone detection.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, info};

use onkyo_core::error::{Error, FailureKind};
use onkyo_core::transport::Connector;
use onkyo_core::types::Zone;

use crate::commands;
use crate::connection::ConnectionManager;

/// Outcome of [`probe_connection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionCheck {
    /// The receiver answered a power query.
    Connected { model_name: Option<String> },
    Failed { kind: FailureKind },
}

impl ConnectionCheck {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionCheck::Connected { .. })
    }

    /// Whether configuration may proceed. Recoverable failures allow
    /// setting up a receiver that is currently off the network.
    pub fn allows_setup(&self) -> bool {
        match self {
            ConnectionCheck::Connected { .. } => true,
            ConnectionCheck::Failed { kind } => kind.allows_setup(),
        }
    }

    pub fn model_name(&self) -> Option<&str> {
        match self {
            ConnectionCheck::Connected { model_name } => model_name.as_deref(),
            ConnectionCheck::Failed { .. } => None,
        }
    }
}

/// Connect to `host`, ask for the power state and disconnect again.
///
/// Both the connect and the query are bounded by `limit`. The transport is
/// closed on every path that opened it.
pub async fn probe_connection(connector: &dyn Connector, host: &str, limit: Duration) -> ConnectionCheck {
    // Nobody listens to pushes during a probe.
    let (events, _) = broadcast::channel(1);

    let mut transport = match timeout(limit, connector.connect(host, events)).await {
        Ok(Ok(transport)) => transport,
        Ok(Err(e)) => return failed(host, &e),
        Err(_) => return failed(host, &Error::Timeout),
    };

    let probe = commands::cmd_query_power(Zone::Main);
    let result = match timeout(limit, transport.send(&probe)).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout),
    };
    let model_name = transport.model_name();
    if let Err(e) = transport.close().await {
        debug!(host, error = %e, "ignoring error while closing probe transport");
    }

    match result {
        Ok(_) => {
            info!(host, model = ?model_name, "receiver answered connection probe");
            ConnectionCheck::Connected { model_name }
        }
        Err(e) => failed(host, &e),
    }
}

fn failed(host: &str, error: &Error) -> ConnectionCheck {
    let kind = error.kind();
    debug!(host, error = %error, %kind, "connection probe failed");
    ConnectionCheck::Failed { kind }
}

/// Find the zones a receiver has.
///
/// The main zone is always present. Zone 2 and zone 3 are each probed with
/// a power query and count as present when the query succeeds with a
/// non-empty answer; a failed probe only rules out its own zone. Probes
/// run on the current session without reconnecting, so a zone that does
/// not answer neither tears the session down nor delays the next probe
/// with a reconnect backoff.
pub async fn detect_zones(manager: &ConnectionManager) -> Vec<Zone> {
    let mut zones = vec![Zone::Main];
    for zone in [Zone::Zone2, Zone::Zone3] {
        match manager.execute_on_session(&commands::cmd_query_power(zone)).await {
            Ok(resp) if !resp.is_empty() => zones.push(zone),
            Ok(_) => debug!(%zone, "zone probe returned nothing"),
            Err(e) => debug!(%zone, error = %e, "zone probe failed"),
        }
    }
    info!(host = manager.host(), ?zones, "detected zones");
    zones
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use onkyo_core::types::Response;
    use onkyo_test_harness::{Failure, MockConnector, MockTransport};

    use crate::config::ConnectionConfig;

    const LIMIT: Duration = Duration::from_secs(10);

    // ---- probe_connection ----

    #[tokio::test]
    async fn probe_reports_model_and_disconnects() {
        let mock = MockTransport::new();
        mock.set_model_name("TX-NR609(Ether)");
        mock.expect("system-power=query", Response::pair("system-power", "standby"));
        let connector = MockConnector::new(mock.clone());

        let check = probe_connection(&connector, "192.168.1.40", LIMIT).await;

        assert_eq!(
            check,
            ConnectionCheck::Connected {
                model_name: Some("TX-NR609(Ether)".into())
            }
        );
        assert!(check.allows_setup());
        assert_eq!(check.model_name(), Some("TX-NR609(Ether)"));
        assert_eq!(mock.close_count(), 1);
    }

    #[tokio::test]
    async fn probe_classifies_failures() {
        let cases = [
            (Failure::Timeout, FailureKind::Timeout, true),
            (Failure::Refused, FailureKind::ConnectionRefused, true),
            (Failure::Io(std::io::ErrorKind::ConnectionReset), FailureKind::Network, true),
            (Failure::Unknown, FailureKind::Unknown, false),
        ];
        for (failure, kind, allows) in cases {
            let connector = MockConnector::new(MockTransport::new());
            connector.fail_next_connect(failure);

            let check = probe_connection(&connector, "host", LIMIT).await;
            assert_eq!(check, ConnectionCheck::Failed { kind });
            assert_eq!(check.allows_setup(), allows);
            assert!(!check.is_connected());
        }
    }

    #[tokio::test]
    async fn probe_query_failure_still_closes() {
        let mock = MockTransport::new();
        mock.expect_failure("system-power=query", Failure::Network);
        let connector = MockConnector::new(mock.clone());

        let check = probe_connection(&connector, "host", LIMIT).await;
        assert_eq!(
            check,
            ConnectionCheck::Failed {
                kind: FailureKind::Network
            }
        );
        assert_eq!(mock.close_count(), 1);
    }

    // ---- detect_zones ----

    async fn manager_for(mock: &MockTransport) -> ConnectionManager {
        mock.stub("system-power=query", Response::pair("system-power", "on"));
        let connector = MockConnector::new(mock.clone());
        let manager = ConnectionManager::new("host", Arc::new(connector), ConnectionConfig::default());
        manager.connect().await.unwrap();
        manager
    }

    #[tokio::test(start_paused = true)]
    async fn all_zones_answer() {
        let mock = MockTransport::new();
        let manager = manager_for(&mock).await;
        mock.stub("zone2.power=query", Response::pair("power", "standby"));
        mock.stub("zone3.power=query", Response::pair("power", "on"));

        assert_eq!(
            detect_zones(&manager).await,
            vec![Zone::Main, Zone::Zone2, Zone::Zone3]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failing_probes_leave_main_only() {
        let mock = MockTransport::new();
        let manager = manager_for(&mock).await;
        mock.stub_failure("zone2.power=query", Failure::Timeout);
        mock.stub_failure("zone3.power=query", Failure::Timeout);

        assert_eq!(detect_zones(&manager).await, vec![Zone::Main]);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_zone_keeps_session_for_next_probe() {
        let mock = MockTransport::new();
        let manager = manager_for(&mock).await;
        mock.stub_failure("zone2.power=query", Failure::Timeout);
        mock.stub("zone3.power=query", Response::pair("power", "standby"));

        let start = tokio::time::Instant::now();
        assert_eq!(detect_zones(&manager).await, vec![Zone::Main, Zone::Zone3]);

        // Only command spacing, no reconnect backoff.
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(manager.is_connected());
        assert_eq!(manager.reconnect_attempt(), 0);
        assert_eq!(mock.close_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_answer_is_absent() {
        let mock = MockTransport::new();
        let manager = manager_for(&mock).await;
        mock.stub("zone2.power=query", Response::Text(String::new()));
        mock.stub("zone3.power=query", "on");

        assert_eq!(detect_zones(&manager).await, vec![Zone::Main, Zone::Zone3]);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_receiver_gets_main_zone() {
        let mock = MockTransport::new();
        let connector = MockConnector::new(mock.clone());
        connector.refuse(Failure::Refused);
        let manager = ConnectionManager::new("host", Arc::new(connector.clone()), ConnectionConfig::default());

        assert_eq!(detect_zones(&manager).await, vec![Zone::Main]);
        assert_eq!(connector.connect_attempts(), 0);
    }
}
