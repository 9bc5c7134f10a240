//! Asynchronous receiver event types.
//!
//! A connection manager owns one [`tokio::sync::broadcast`] channel per
//! session. Transports publish unsolicited receiver updates on it, and the
//! manager publishes connection lifecycle changes. Zone devices subscribe
//! and keep only the updates addressed to their own zone.

use crate::types::{Response, Zone};

/// Which attribute an unsolicited update refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    Power,
    Volume,
    Muting,
    InputSelector,
    /// Any attribute the zone model does not track.
    Other(String),
}

impl UpdateKind {
    /// Map an eISCP command name (zone-qualified or not) to an update kind.
    ///
    /// Main-zone and sub-zone names both map, so `system-power` and
    /// `power` are each [`UpdateKind::Power`].
    pub fn from_command(name: &str) -> Self {
        match name {
            "system-power" | "power" => UpdateKind::Power,
            "master-volume" | "volume" => UpdateKind::Volume,
            "audio-muting" | "muting" => UpdateKind::Muting,
            "input-selector" | "selector" => UpdateKind::InputSelector,
            other => UpdateKind::Other(other.to_string()),
        }
    }
}

/// An event published on a session's broadcast channel.
///
/// Delivery is best effort: a subscriber that falls behind the channel
/// capacity misses the oldest events.
#[derive(Debug, Clone)]
pub enum ReceiverEvent {
    /// The receiver pushed a state change without being asked.
    Update {
        zone: Zone,
        kind: UpdateKind,
        /// The raw pushed value, without the command name.
        value: Response,
    },

    /// The session is connected (initially or after a reconnect).
    Connected,

    /// The session was marked disconnected after a failure.
    Disconnected,

    /// A reconnect attempt is about to start.
    Reconnecting {
        /// The reconnection attempt number (1-based).
        attempt: u32,
    },
}
