//! Per-zone receiver state machine.
//!
//! A [`ZoneDevice`] is the logical device for one zone of a receiver. Many
//! zone devices share one [`ConnectionManager`]. The device keeps a cached
//! [`ZoneState`] in a [`watch`] channel and updates it from three places:
//!
//! - control operations ([`turn_on`](ZoneDevice::turn_on),
//!   [`set_volume`](ZoneDevice::set_volume), ...), which return the
//!   underlying error when the receiver did not accept the command
//! - background refreshes ([`refresh_all`](ZoneDevice::refresh_all),
//!   [`update`](ZoneDevice::update), the list fetches), which never fail and
//!   degrade the affected fields to unknown or empty instead
//! - pushed updates from the session's event channel, received by the
//!   listener started with [`start`](ZoneDevice::start)
//!
//! Every parse goes through [`onkyo_core::response`]; a value that does not
//! parse leaves the cached field as it was.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use onkyo_core::error::{Error, Result};
use onkyo_core::events::{ReceiverEvent, UpdateKind};
use onkyo_core::response;
use onkyo_core::types::{Command, HdmiOutput, PowerState, Response, Zone};
use onkyo_core::volume::VolumeScale;

use crate::commands;
use crate::config::ZoneTiming;
use crate::connection::ConnectionManager;

/// Source selected before recalling a radio preset.
pub const TUNER_SOURCE: &str = "tuner";

/// Highest preset slot a receiver stores.
pub const MAX_PRESET: u8 = 40;

/// Source names and codes that mean the tuner is playing.
const TUNER_SOURCES: &[&str] = &["tuner", "fm", "am", "dab", "radio", "24", "25", "26", "33"];

/// Normalized state of one zone.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ZoneState {
    pub power: PowerState,
    /// Volume as a fraction of the usable range, always within `0.0..=1.0`.
    pub volume: Option<f64>,
    pub muted: Option<bool>,
    pub source: Option<String>,
    pub source_list: Vec<String>,
    pub listening_modes: Vec<String>,
    /// Last HDMI output selected through this device (main zone only).
    pub hdmi_output: Option<HdmiOutput>,
    /// Whether the last power read succeeded.
    pub available: bool,
}

struct Inner {
    zone: Zone,
    manager: Arc<ConnectionManager>,
    scale: VolumeScale,
    timing: ZoneTiming,
    state: watch::Sender<ZoneState>,
    /// Cancels the listener, the poller and any spawned refresh.
    cancel: CancellationToken,
    listening: AtomicBool,
    /// Periodic updates since the source and mode lists were fetched.
    polls_since_lists: AtomicU32,
}

/// One zone of a receiver.
///
/// Cloning is cheap; clones share state and background tasks.
#[derive(Clone)]
pub struct ZoneDevice {
    inner: Arc<Inner>,
}

impl ZoneDevice {
    pub fn new(
        zone: Zone,
        manager: Arc<ConnectionManager>,
        scale: VolumeScale,
        timing: ZoneTiming,
    ) -> Self {
        let (state, _) = watch::channel(ZoneState::default());
        ZoneDevice {
            inner: Arc::new(Inner {
                zone,
                manager,
                scale,
                timing,
                state,
                cancel: CancellationToken::new(),
                listening: AtomicBool::new(false),
                polls_since_lists: AtomicU32::new(0),
            }),
        }
    }

    pub fn zone(&self) -> Zone {
        self.inner.zone
    }

    pub fn scale(&self) -> &VolumeScale {
        &self.inner.scale
    }

    /// Snapshot of the cached state.
    pub fn state(&self) -> ZoneState {
        self.inner.state.borrow().clone()
    }

    /// Observe state changes.
    pub fn watch(&self) -> watch::Receiver<ZoneState> {
        self.inner.state.subscribe()
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Subscribe to the session's pushed updates.
    ///
    /// The subscription is taken before this returns, so no update sent
    /// afterwards is missed. Calling `start` again has no effect.
    pub fn start(&self) {
        if self.inner.listening.swap(true, Ordering::SeqCst) || self.inner.cancel.is_cancelled() {
            return;
        }
        let mut events = self.inner.manager.subscribe();
        let device = self.clone();
        let cancel = self.inner.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(ReceiverEvent::Update { zone, kind, value }) => {
                            device.on_receiver_event(zone, &kind, &value);
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(missed)) => {
                            debug!(zone = %device.zone(), missed, "zone listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!(zone = %device.zone(), "zone listener stopped");
        });
    }

    /// Call [`update()`](Self::update) every `interval` until unloaded.
    pub fn start_polling(&self, interval: Duration) {
        let device = self.clone();
        self.spawn_background(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                device.update().await;
            }
        });
    }

    /// Stop the listener and every background task of this zone.
    pub fn unload(&self) {
        self.inner.cancel.cancel();
        debug!(zone = %self.zone(), "zone unloaded");
    }

    // -----------------------------------------------------------------
    // Control operations
    // -----------------------------------------------------------------

    /// Power on, mark on right away, then confirm and refresh in the
    /// background.
    pub async fn turn_on(&self) -> Result<()> {
        self.execute(commands::cmd_set_power(self.zone(), true)).await?;
        self.modify(|s| s.power = PowerState::On);

        let device = self.clone();
        self.spawn_background(async move {
            device.confirm_power_on().await;
            device.refresh_all().await;
        });
        Ok(())
    }

    pub async fn turn_off(&self) -> Result<()> {
        self.execute(commands::cmd_set_power(self.zone(), false)).await?;
        self.modify(|s| s.power = PowerState::Off);
        Ok(())
    }

    /// Set the volume as a fraction of the usable range.
    pub async fn set_volume(&self, fraction: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(Error::InvalidParameter(format!(
                "volume must be within 0.0..=1.0, got {fraction}"
            )));
        }
        let level = self.inner.scale.to_receiver(fraction);
        self.execute(commands::cmd_set_volume(self.zone(), level)).await?;
        self.modify(|s| s.volume = Some(fraction));
        Ok(())
    }

    pub async fn volume_up(&self) -> Result<()> {
        self.step_volume(true).await
    }

    pub async fn volume_down(&self) -> Result<()> {
        self.step_volume(false).await
    }

    async fn step_volume(&self, up: bool) -> Result<()> {
        self.execute(commands::cmd_step_volume(self.zone(), up)).await?;
        self.refresh_volume().await;
        Ok(())
    }

    pub async fn mute(&self, muted: bool) -> Result<()> {
        self.execute(commands::cmd_set_mute(self.zone(), muted)).await?;
        self.modify(|s| s.muted = Some(muted));
        Ok(())
    }

    pub async fn select_source(&self, code: &str) -> Result<()> {
        if code.is_empty() {
            return Err(Error::InvalidParameter("empty source code".into()));
        }
        self.execute(commands::cmd_select_source(self.zone(), code)).await?;
        self.modify(|s| s.source = Some(code.to_string()));
        Ok(())
    }

    /// Recall a tuner preset.
    ///
    /// Only the `radio` media type (any case) does anything; other types
    /// return `Ok` without I/O. The tuner is selected first and the source
    /// is polled a few times for confirmation, but the preset is sent
    /// whether or not confirmation arrives.
    pub async fn play_preset(&self, media_type: &str, preset: u8) -> Result<()> {
        if !media_type.eq_ignore_ascii_case("radio") {
            debug!(zone = %self.zone(), media_type, "unsupported media type, ignoring");
            return Ok(());
        }
        if !(1..=MAX_PRESET).contains(&preset) {
            return Err(Error::InvalidParameter(format!(
                "preset must be 1..={MAX_PRESET}, got {preset}"
            )));
        }

        self.select_source(TUNER_SOURCE).await?;
        if !self.wait_for_tuner().await {
            debug!(zone = %self.zone(), "tuner not confirmed, sending preset anyway");
        }
        self.execute(commands::cmd_select_preset(self.zone(), preset)).await?;
        Ok(())
    }

    /// Route HDMI output. Main zone only; other zones ignore the request
    /// without looking at the code. On the main zone an unknown code is
    /// rejected before anything is sent.
    pub async fn select_hdmi_output(&self, code: &str) -> Result<()> {
        if !self.zone().is_main() {
            debug!(zone = %self.zone(), code, "HDMI output selection is main zone only");
            return Ok(());
        }
        let output: HdmiOutput = code
            .parse()
            .map_err(|e| Error::InvalidParameter(format!("{e}")))?;
        self.execute(commands::cmd_select_hdmi_output(output)).await?;
        self.modify(|s| s.hdmi_output = Some(output));
        Ok(())
    }

    // -----------------------------------------------------------------
    // Background refresh
    // -----------------------------------------------------------------

    /// Fetch power, volume, source, mute, then both lists.
    ///
    /// Each fetch is independent: a failed one leaves its field as it was
    /// (power becomes unknown) and the rest still run.
    pub async fn refresh_all(&self) {
        self.refresh_power().await;
        self.refresh_volume().await;
        self.refresh_source().await;
        self.refresh_mute().await;
        self.fetch_source_list().await;
        self.fetch_listening_modes().await;
        self.inner.polls_since_lists.store(0, Ordering::SeqCst);
    }

    /// Periodic poll: power always; the rest only while powered on. The
    /// lists are refetched when empty or every
    /// [`list_refresh_every`](ZoneTiming::list_refresh_every) polls.
    pub async fn update(&self) {
        if self.refresh_power().await != Some(PowerState::On) {
            return;
        }
        self.refresh_volume().await;
        self.refresh_source().await;
        self.refresh_mute().await;

        let polls = self.inner.polls_since_lists.fetch_add(1, Ordering::SeqCst) + 1;
        let lists_empty = self.inner.state.borrow().source_list.is_empty();
        if polls > self.inner.timing.list_refresh_every || lists_empty {
            self.fetch_source_list().await;
            self.fetch_listening_modes().await;
            self.inner.polls_since_lists.store(0, Ordering::SeqCst);
        }
    }

    /// Query the receiver's own source table. Empty on any failure.
    pub async fn fetch_source_list(&self) -> Vec<String> {
        let list = self.fetch_list(commands::cmd_query_source_list()).await;
        if list.is_empty() {
            info!(zone = %self.zone(), "no source list returned");
        }
        self.modify(|s| s.source_list = list.clone());
        list
    }

    /// Query the receiver's listening modes. Empty on any failure.
    pub async fn fetch_listening_modes(&self) -> Vec<String> {
        let list = self.fetch_list(commands::cmd_query_listening_modes()).await;
        if list.is_empty() {
            info!(zone = %self.zone(), "no listening modes returned");
        }
        self.modify(|s| s.listening_modes = list.clone());
        list
    }

    async fn refresh_power(&self) -> Option<PowerState> {
        match self.query(commands::cmd_query_power(self.zone())).await {
            Some(resp) => match response::parse_power(&resp) {
                Some(power) => {
                    self.modify(|s| {
                        s.power = power;
                        s.available = true;
                    });
                    Some(power)
                }
                None => {
                    debug!(zone = %self.zone(), ?resp, "unrecognised power response");
                    None
                }
            },
            None => {
                self.modify(|s| {
                    s.power = PowerState::Unknown;
                    s.available = false;
                });
                None
            }
        }
    }

    async fn refresh_volume(&self) {
        let Some(resp) = self.query(commands::cmd_query_volume(self.zone())).await else {
            return;
        };
        match response::parse_volume(&resp) {
            Some(level) => self.apply_volume(level),
            None => debug!(zone = %self.zone(), ?resp, "unrecognised volume response"),
        }
    }

    async fn refresh_source(&self) {
        let Some(resp) = self.query(commands::cmd_query_source(self.zone())).await else {
            return;
        };
        match response::parse_source(&resp) {
            Some(source) => self.modify(|s| s.source = Some(source)),
            None => debug!(zone = %self.zone(), ?resp, "unrecognised source response"),
        }
    }

    async fn refresh_mute(&self) {
        let Some(resp) = self.query(commands::cmd_query_mute(self.zone())).await else {
            return;
        };
        match response::parse_mute(&resp) {
            Some(muted) => self.modify(|s| s.muted = Some(muted)),
            None => debug!(zone = %self.zone(), ?resp, "unrecognised mute response"),
        }
    }

    // -----------------------------------------------------------------
    // Pushed updates
    // -----------------------------------------------------------------

    /// Apply one pushed update.
    ///
    /// Updates for other zones are ignored. A power change from off to on
    /// schedules a full refresh; no other update does.
    pub fn on_receiver_event(&self, zone: Zone, kind: &UpdateKind, value: &Response) {
        if zone != self.zone() {
            return;
        }
        debug!(zone = %zone, ?kind, ?value, "pushed update");
        let scalar = response::extract_pushed(value);

        match kind {
            UpdateKind::Power => {
                let Some(power) = scalar.and_then(response::power) else {
                    debug!(zone = %zone, ?value, "unrecognised pushed power value");
                    return;
                };
                let previous = self.inner.state.borrow().power;
                self.modify(|s| {
                    s.power = power;
                    s.available = true;
                });
                if previous == PowerState::Off && power == PowerState::On {
                    let device = self.clone();
                    self.spawn_background(async move { device.refresh_all().await });
                }
            }
            UpdateKind::Volume => match scalar.and_then(response::volume) {
                Some(level) => self.apply_volume(level),
                None => debug!(zone = %zone, ?value, "invalid pushed volume"),
            },
            UpdateKind::Muting => {
                if let Some(muted) = scalar.and_then(response::muted) {
                    self.modify(|s| s.muted = Some(muted));
                }
            }
            UpdateKind::InputSelector => {
                if let Some(source) = scalar.and_then(response::source) {
                    self.modify(|s| s.source = Some(source));
                }
            }
            UpdateKind::Other(_) => {}
        }
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    async fn execute(&self, command: Command) -> Result<Response> {
        self.inner.manager.execute(&command).await.map_err(|e| {
            warn!(zone = %self.zone(), %command, error = %e, "receiver command failed");
            e
        })
    }

    async fn query(&self, command: Command) -> Option<Response> {
        self.inner.manager.send(&command).await
    }

    async fn fetch_list(&self, command: Command) -> Vec<String> {
        match self.query(command).await {
            Some(resp) => list_entries(&resp),
            None => Vec::new(),
        }
    }

    /// Poll power until it reads on, at most `turn_on_polls` times.
    async fn confirm_power_on(&self) {
        let timing = self.inner.timing;
        for _ in 0..timing.turn_on_polls {
            tokio::time::sleep(timing.turn_on_poll_delay).await;
            if let Some(resp) = self.query(commands::cmd_query_power(self.zone())).await {
                if response::parse_power(&resp) == Some(PowerState::On) {
                    return;
                }
            }
        }
        debug!(zone = %self.zone(), "power-on not confirmed, refreshing anyway");
    }

    /// Poll the source until it is tuner-like. Returns whether it was.
    async fn wait_for_tuner(&self) -> bool {
        let timing = self.inner.timing;
        for _ in 0..timing.preset_confirm_polls {
            tokio::time::sleep(timing.preset_confirm_delay).await;
            let source = self
                .query(commands::cmd_query_source(self.zone()))
                .await
                .and_then(|resp| response::parse_source(&resp));
            if let Some(source) = source {
                if is_tuner(&source) {
                    return true;
                }
            }
        }
        false
    }

    fn apply_volume(&self, level: u32) {
        let fraction = self.inner.scale.to_fraction(level);
        self.modify(|s| s.volume = Some(fraction));
    }

    fn modify(&self, f: impl FnOnce(&mut ZoneState)) {
        self.inner.state.send_modify(f);
    }

    fn spawn_background<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = self.inner.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = task => {}
            }
        });
    }
}

fn is_tuner(source: &str) -> bool {
    TUNER_SOURCES.iter().any(|t| t.eq_ignore_ascii_case(source))
}

/// Entry names from a catalog query response, deduplicated in order.
fn list_entries(resp: &Response) -> Vec<String> {
    let names: Vec<String> = match response::parse_table(resp) {
        Some(table) => table.iter().map(|(code, _)| code.clone()).collect(),
        None => match resp {
            Response::Tuple(items) => items
                .iter()
                .filter_map(|item| response::extract_pushed(item).and_then(response::source))
                .collect(),
            _ => Vec::new(),
        },
    };

    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}
