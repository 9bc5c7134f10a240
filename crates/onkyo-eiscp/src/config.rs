//! Receiver configuration.
//!
//! Two layers live here:
//!
//! - [`ReceiverConfig`] and [`ReceiverOptions`] are the persisted shape an
//!   embedding application stores per receiver. Both are serde types whose
//!   field names match the stored keys.
//! - [`ConnectionConfig`] and [`ZoneTiming`] are runtime tunables for the
//!   connection manager and the zone devices. They have defaults matching
//!   real receiver behavior and are normally only changed by tests.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use onkyo_core::error::{Error, Result};
use onkyo_core::volume::{
    VolumeResolution, VolumeScale, DEFAULT_MAX_VOLUME_PERCENT, DEFAULT_RECEIVER_MAX_VOLUME,
};

use crate::catalog::CommandCatalog;
use crate::profiles;

/// Where a receiver lives and what to call it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    pub host: String,
    pub name: String,
    /// Model string reported by the receiver at setup, if it answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

/// Operator-tunable options for one receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverOptions {
    /// The receiver's own absolute volume ceiling, 1..=200.
    pub receiver_max_volume: u32,
    /// Volume steps the receiver exposes.
    pub volume_resolution: VolumeResolution,
    /// Operator ceiling as a percent of the usable range, 1..=100.
    #[serde(rename = "max_volume")]
    pub max_volume_percent: u8,
    /// Source code to display label.
    pub sources: BTreeMap<String, String>,
}

impl Default for ReceiverOptions {
    fn default() -> Self {
        ReceiverOptions {
            receiver_max_volume: DEFAULT_RECEIVER_MAX_VOLUME,
            volume_resolution: VolumeResolution::default(),
            max_volume_percent: DEFAULT_MAX_VOLUME_PERCENT,
            sources: BTreeMap::new(),
        }
    }
}

impl ReceiverOptions {
    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if !(1..=200).contains(&self.receiver_max_volume) {
            return Err(Error::InvalidParameter(format!(
                "receiver_max_volume must be 1..=200, got {}",
                self.receiver_max_volume
            )));
        }
        if !(1..=100).contains(&self.max_volume_percent) {
            return Err(Error::InvalidParameter(format!(
                "max_volume must be 1..=100, got {}",
                self.max_volume_percent
            )));
        }
        Ok(())
    }

    /// The volume scaling law these options describe.
    pub fn scale(&self) -> VolumeScale {
        VolumeScale::new(
            self.receiver_max_volume,
            self.volume_resolution,
            self.max_volume_percent,
        )
    }

    /// Default options for a newly configured receiver.
    ///
    /// Models with a [`ReceiverProfile`](crate::profiles::ReceiverProfile)
    /// take its volume ceiling, resolution and curated sources. Everything
    /// else gets the catalog's sources for the model, which falls back to
    /// the full source list for unknown models.
    pub fn for_model(catalog: &CommandCatalog, model: Option<&str>) -> Self {
        let profile = model.and_then(profiles::lookup);
        match profile {
            Some(profile) => ReceiverOptions {
                volume_resolution: profile.volume_resolution.unwrap_or_default(),
                max_volume_percent: profile.max_volume_percent,
                sources: profile.source_pairs().into_iter().collect(),
                ..Default::default()
            },
            None => ReceiverOptions {
                sources: catalog.sources_for_model(model).into_iter().collect(),
                ..Default::default()
            },
        }
    }
}

/// Connection manager tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Minimum time between the start of successive commands.
    pub command_spacing: Duration,
    /// First reconnect delay; doubled on every further attempt.
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    /// Consecutive failed reconnects after which failures log at `error`.
    pub escalate_after: u32,
    pub connect_timeout: Duration,
    /// Upper bound on a single command round trip.
    pub command_timeout: Duration,
}

impl ConnectionConfig {
    /// Delay before reconnect attempt `attempt` (1-based):
    /// `min(base * 2^(attempt - 1), cap)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.backoff_base
            .checked_mul(1u32 << exponent)
            .map_or(self.backoff_cap, |delay| delay.min(self.backoff_cap))
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            command_spacing: Duration::from_millis(150),
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(60),
            escalate_after: 5,
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(10),
        }
    }
}

/// Zone device polling tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneTiming {
    /// Power polls after a turn-on before refreshing anyway.
    pub turn_on_polls: u32,
    pub turn_on_poll_delay: Duration,
    /// Source polls waiting for the tuner before sending a preset.
    pub preset_confirm_polls: u32,
    pub preset_confirm_delay: Duration,
    /// Periodic polls between source/listening-mode list refreshes.
    pub list_refresh_every: u32,
}

impl Default for ZoneTiming {
    fn default() -> Self {
        ZoneTiming {
            turn_on_polls: 3,
            turn_on_poll_delay: Duration::from_millis(500),
            preset_confirm_polls: 3,
            preset_confirm_delay: Duration::from_millis(500),
            list_refresh_every: 100,
        }
    }
}
