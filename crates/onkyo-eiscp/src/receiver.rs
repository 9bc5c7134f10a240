//! ReceiverBuilder -- fluent builder for a connected [`Receiver`].
//!
//! Collects the receiver's address, the persisted options, and the runtime
//! tunables, then connects, detects zones, and starts one [`ZoneDevice`]
//! per zone on a shared [`ConnectionManager`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use onkyo_eiscp::receiver::ReceiverBuilder;
//! # use onkyo_core::transport::Connector;
//!
//! # async fn example(connector: Arc<dyn Connector>) -> onkyo_core::Result<()> {
//! let receiver = ReceiverBuilder::new("192.168.1.40")
//!     .name("Living Room")
//!     .connector(connector)
//!     .build()
//!     .await?;
//!
//! if let Some(main) = receiver.zone(onkyo_core::Zone::Main) {
//!     main.set_volume(0.3).await?;
//! }
//! receiver.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{info, warn};

use onkyo_core::error::{Error, Result};
use onkyo_core::events::ReceiverEvent;
use onkyo_core::transport::Connector;
use onkyo_core::types::Zone;

use crate::catalog::{reverse_mapping, CommandCatalog};
use crate::config::{ConnectionConfig, ReceiverConfig, ReceiverOptions, ZoneTiming};
use crate::connection::ConnectionManager;
use crate::setup::detect_zones;
use crate::zone::ZoneDevice;

/// Name used when none is configured.
pub const DEFAULT_NAME: &str = "Onkyo Receiver";

/// Fluent builder for [`Receiver`].
pub struct ReceiverBuilder {
    host: String,
    name: Option<String>,
    model_name: Option<String>,
    options: Option<ReceiverOptions>,
    connection: ConnectionConfig,
    timing: ZoneTiming,
    catalog: &'static CommandCatalog,
    connector: Option<Arc<dyn Connector>>,
    poll_interval: Option<Duration>,
}

impl ReceiverBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        ReceiverBuilder {
            host: host.into(),
            name: None,
            model_name: None,
            options: None,
            connection: ConnectionConfig::default(),
            timing: ZoneTiming::default(),
            catalog: CommandCatalog::builtin(),
            connector: None,
            poll_interval: None,
        }
    }

    /// Start from a persisted configuration entry.
    pub fn from_config(config: &ReceiverConfig) -> Self {
        let builder = ReceiverBuilder::new(config.host.clone()).name(&config.name);
        match &config.model_name {
            Some(model) => builder.model_name(model),
            None => builder,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Model name to use when the transport does not report one.
    pub fn model_name(mut self, model: &str) -> Self {
        self.model_name = Some(model.to_string());
        self
    }

    /// Options to use instead of the model defaults.
    pub fn options(mut self, options: ReceiverOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn connection_config(mut self, config: ConnectionConfig) -> Self {
        self.connection = config;
        self
    }

    pub fn zone_timing(mut self, timing: ZoneTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn catalog(mut self, catalog: &'static CommandCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// The eISCP client factory. Required.
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Poll every zone at this interval in addition to pushed updates.
    /// Off by default.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Connect and set up every zone.
    ///
    /// A receiver that cannot be reached for a recoverable reason (timeout,
    /// refusal, network error) is still returned, disconnected and with only
    /// its main zone; commands reconnect on demand. Any other connection
    /// failure is returned as an error.
    pub async fn build(self) -> Result<Receiver> {
        let connector = self
            .connector
            .ok_or_else(|| Error::LibraryMissing("no eISCP connector configured".into()))?;
        if self.host.trim().is_empty() {
            return Err(Error::InvalidParameter("host is required".into()));
        }
        if let Some(options) = &self.options {
            options.validate()?;
        }

        let manager = Arc::new(ConnectionManager::new(
            self.host.clone(),
            connector,
            self.connection,
        ));
        if let Err(e) = manager.connect().await {
            let kind = e.kind();
            if !kind.allows_setup() {
                manager.close().await;
                return Err(e);
            }
            warn!(host = %self.host, %kind, "receiver unreachable, continuing disconnected");
        }

        let model_name = match manager.model_name().await {
            Some(reported) => Some(reported),
            None => self.model_name,
        };
        let options = match self.options {
            Some(options) => options,
            None => ReceiverOptions::for_model(self.catalog, model_name.as_deref()),
        };

        let zones = if manager.is_connected() {
            detect_zones(&manager).await
        } else {
            vec![Zone::Main]
        };

        let scale = options.scale();
        let devices: Vec<ZoneDevice> = zones
            .into_iter()
            .map(|zone| {
                let device = ZoneDevice::new(zone, manager.clone(), scale, self.timing);
                device.start();
                if let Some(interval) = self.poll_interval {
                    device.start_polling(interval);
                }
                device
            })
            .collect();

        let name = self.name.unwrap_or_else(|| DEFAULT_NAME.to_string());
        info!(
            host = %self.host,
            name = %name,
            model = ?model_name,
            zones = devices.len(),
            "receiver ready"
        );

        Ok(Receiver {
            name,
            model_name,
            options,
            manager,
            zones: devices,
        })
    }
}

/// A set-up receiver: one session shared by all of its zones.
pub struct Receiver {
    name: String,
    model_name: Option<String>,
    options: ReceiverOptions,
    manager: Arc<ConnectionManager>,
    zones: Vec<ZoneDevice>,
}

impl Receiver {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        self.manager.host()
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    pub fn options(&self) -> &ReceiverOptions {
        &self.options
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    pub fn zones(&self) -> &[ZoneDevice] {
        &self.zones
    }

    pub fn zone(&self, zone: Zone) -> Option<&ZoneDevice> {
        self.zones.iter().find(|d| d.zone() == zone)
    }

    /// Display name for one zone: the receiver name, plus the zone for
    /// secondary zones.
    pub fn zone_name(&self, zone: Zone) -> String {
        if zone.is_main() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, zone)
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReceiverEvent> {
        self.manager.subscribe()
    }

    /// Resolve a configured source by code or by display label.
    pub fn source_code(&self, code_or_label: &str) -> Option<String> {
        if self.options.sources.contains_key(code_or_label) {
            return Some(code_or_label.to_string());
        }
        let by_label: BTreeMap<String, String> = reverse_mapping(self.options.sources.iter());
        by_label.get(code_or_label).cloned()
    }

    /// Refresh every zone.
    pub async fn refresh_all(&self) {
        for zone in &self.zones {
            zone.refresh_all().await;
        }
    }

    /// Unload every zone and close the session.
    pub async fn shutdown(&self) {
        for zone in &self.zones {
            zone.unload();
        }
        self.manager.close().await;
        info!(host = %self.host(), "receiver shut down");
    }
}
