//! # onkyo -- Async control of Onkyo, Pioneer, and Integra receivers
//!
//! `onkyo` drives network-attached AV receivers over eISCP. It keeps one
//! serialized session per receiver, reconnects with backoff when the
//! receiver drops off the network, and exposes each zone (main, zone 2,
//! zone 3) as a device with cached, observable state.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use onkyo::{ReceiverBuilder, Zone};
//! # use onkyo::Connector;
//!
//! # async fn example(connector: Arc<dyn Connector>) -> anyhow::Result<()> {
//! let receiver = ReceiverBuilder::new("192.168.1.40")
//!     .name("Living Room")
//!     .connector(connector)
//!     .build()
//!     .await?;
//!
//! let main = receiver.zone(Zone::Main).expect("main zone always exists");
//! main.turn_on().await?;
//! main.set_volume(0.25).await?;
//! println!("{:?}", main.state());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! | Crate                | Purpose                                          |
//! |----------------------|--------------------------------------------------|
//! | `onkyo-core`         | Transport traits, commands, responses, errors    |
//! | `onkyo-eiscp`        | Session manager, zone devices, catalog, setup    |
//! | `onkyo-test-harness` | Scripted mock transport for tests                |
//! | **`onkyo`**          | This facade crate -- re-exports everything       |
//!
//! The eISCP wire client itself is not part of this workspace. Anything
//! implementing [`Connector`] and [`Transport`] can be plugged in, and
//! [`Blocking`] adapts a synchronous client.
//!
//! ## Observing state
//!
//! Every [`ZoneDevice`] publishes its [`ZoneState`] on a watch channel.
//! Session-level events (pushed updates and connection changes) are
//! available from [`Receiver::subscribe`]:
//!
//! ```no_run
//! use onkyo::ReceiverEvent;
//! # async fn example(receiver: &onkyo::Receiver) {
//! let mut events = receiver.subscribe();
//! while let Ok(event) = events.recv().await {
//!     match event {
//!         ReceiverEvent::Reconnecting { attempt } => println!("reconnecting ({attempt})"),
//!         other => println!("{other:?}"),
//!     }
//! }
//! # }
//! ```

use std::collections::BTreeSet;

pub use onkyo_core::*;

/// The eISCP session layer.
///
/// Everything in [`onkyo_eiscp`], including the command builders, the
/// source catalog and the Pioneer profiles.
pub mod eiscp {
    pub use onkyo_eiscp::*;
}

pub use onkyo_eiscp::{
    probe_connection, CommandCatalog, ConnectionCheck, ConnectionConfig, Receiver,
    ReceiverBuilder, ReceiverConfig, ReceiverOptions, ZoneDevice, ZoneState, ZoneTiming,
};

/// Every model name with a curated source list or a receiver profile,
/// sorted and without duplicates.
///
/// Models not listed here still work; they get the full source catalog.
///
/// # Example
///
/// ```
/// let models = onkyo::supported_models();
/// assert!(models.iter().any(|m| m == "TX-NR609(Ether)"));
/// ```
pub fn supported_models() -> Vec<String> {
    let mut models: BTreeSet<String> = onkyo_eiscp::models::MODEL_SOURCES
        .iter()
        .map(|m| m.model.to_string())
        .collect();
    models.extend(
        onkyo_eiscp::profiles::all_profiles()
            .iter()
            .map(|p| p.model.to_string()),
    );
    models.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_models_merges_both_tables() {
        let models = supported_models();
        assert!(models.iter().any(|m| m == "TX-NR609(Ether)"));
        assert!(models.iter().any(|m| m == "VSX-LX101"));

        let mut sorted = models.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(models, sorted);
    }

    #[test]
    fn facade_reexports_resolve() {
        let options = ReceiverOptions::default();
        assert_eq!(options.scale().resolution(), VolumeResolution::R80);
        assert_eq!(eiscp::commands::cmd_query_power(Zone::Zone3).to_string(), "zone3.power=query");
    }
}
