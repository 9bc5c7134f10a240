//! eISCP session layer for Onkyo, Pioneer, and Integra receivers.
//!
//! This crate turns a raw eISCP client (anything implementing
//! [`Connector`](onkyo_core::Connector)) into a set of zone devices with
//! cached, observable state. It provides:
//!
//! - **Connection manager** ([`connection`]) -- one serialized session per
//!   receiver with command spacing, a per-command timeout, and reconnection
//!   with exponential backoff.
//! - **Zone devices** ([`zone`]) -- per-zone control operations, background
//!   refresh, and handling of pushed updates.
//! - **Command builders** ([`commands`]) -- pure constructors for every
//!   command the zone devices send.
//! - **Catalog** ([`catalog`], [`models`], [`profiles`]) -- source and
//!   listening-mode tables, per-model source sets, and Pioneer receiver
//!   profiles.
//! - **Configuration** ([`config`]) -- persisted per-receiver options and
//!   runtime tunables.
//! - **Setup** ([`setup`], [`receiver`]) -- connection probing, zone
//!   detection, and the [`ReceiverBuilder`] that ties it all together.
//!
//! # Command names
//!
//! Commands are sent in the client's symbolic form, `<zone>.<name>=<arg>`
//! for secondary zones and `<name>=<arg>` for the main zone:
//!
//! | Operation      | Main zone                | Zone 2                  |
//! |----------------|--------------------------|-------------------------|
//! | power on       | `system-power=on`        | `zone2.power=on`        |
//! | set volume     | `master-volume=40`       | `zone2.volume=40`       |
//! | mute           | `audio-muting=on`        | `zone2.muting=on`       |
//! | select source  | `input-selector=dvd`     | `zone2.selector=dvd`    |
//!
//! # Example
//!
//! ```
//! use onkyo_core::Zone;
//! use onkyo_eiscp::commands::{cmd_set_power, cmd_set_volume};
//!
//! assert_eq!(cmd_set_power(Zone::Main, true).to_string(), "system-power=on");
//! assert_eq!(cmd_set_volume(Zone::Zone2, 40).to_string(), "zone2.volume=40");
//! ```

pub mod catalog;
pub mod commands;
pub mod config;
pub mod connection;
pub mod models;
pub mod profiles;
pub mod receiver;
pub mod setup;
pub mod zone;

pub use catalog::CommandCatalog;
pub use config::{ConnectionConfig, ReceiverConfig, ReceiverOptions, ZoneTiming};
pub use connection::ConnectionManager;
pub use profiles::ReceiverProfile;
pub use receiver::{Receiver, ReceiverBuilder};
pub use setup::{detect_zones, probe_connection, ConnectionCheck};
pub use zone::{ZoneDevice, ZoneState};
