//! eISCP command builders.
//!
//! This module provides functions to construct the zone-qualified
//! [`Command`]s used by the zone state machine. The main zone and the
//! secondary zones use different command names for the same function:
//!
//! | Function  | Main zone              | zone2 / zone3 |
//! |-----------|------------------------|---------------|
//! | power     | `system-power`         | `power`       |
//! | volume    | `master-volume`        | `volume`      |
//! | mute      | `audio-muting`         | `muting`      |
//! | input     | `input-selector`       | `selector`    |
//! | preset    | `preset`               | `preset`      |
//! | HDMI out  | `hdmi-output-selector` | (main only)   |
//!
//! All functions are pure. Rendering with `to_string()` yields the wire
//! grammar `<zone-prefix.>?<name>=<argument>`.

use onkyo_core::types::{Command, HdmiOutput, Zone};

/// Argument asking the receiver for the current value.
pub const QUERY: &str = "query";

/// Raw ISCP query returning the receiver's own source table.
pub const SOURCE_LIST_QUERY: &str = "SLIQSTN";
/// Raw ISCP query returning the receiver's listening-mode table.
pub const LISTENING_MODE_QUERY: &str = "LMQSTN";

// ---------------------------------------------------------------
// Per-zone command names
// ---------------------------------------------------------------

fn power_name(zone: Zone) -> &'static str {
    if zone.is_main() {
        "system-power"
    } else {
        "power"
    }
}

fn volume_name(zone: Zone) -> &'static str {
    if zone.is_main() {
        "master-volume"
    } else {
        "volume"
    }
}

fn mute_name(zone: Zone) -> &'static str {
    if zone.is_main() {
        "audio-muting"
    } else {
        "muting"
    }
}

fn selector_name(zone: Zone) -> &'static str {
    if zone.is_main() {
        "input-selector"
    } else {
        "selector"
    }
}

// ---------------------------------------------------------------
// Command builders
// ---------------------------------------------------------------

/// `system-power=on` / `zone2.power=standby`.
pub fn cmd_set_power(zone: Zone, on: bool) -> Command {
    Command::named(zone, power_name(zone), if on { "on" } else { "standby" })
}

pub fn cmd_query_power(zone: Zone) -> Command {
    Command::named(zone, power_name(zone), QUERY)
}

/// `master-volume=<level>` with a receiver-scale level.
pub fn cmd_set_volume(zone: Zone, level: u32) -> Command {
    Command::named(zone, volume_name(zone), level.to_string())
}

/// Relative volume step: `level-up` or `level-down`.
pub fn cmd_step_volume(zone: Zone, up: bool) -> Command {
    Command::named(
        zone,
        volume_name(zone),
        if up { "level-up" } else { "level-down" },
    )
}

pub fn cmd_query_volume(zone: Zone) -> Command {
    Command::named(zone, volume_name(zone), QUERY)
}

pub fn cmd_set_mute(zone: Zone, muted: bool) -> Command {
    Command::named(zone, mute_name(zone), if muted { "on" } else { "off" })
}

pub fn cmd_query_mute(zone: Zone) -> Command {
    Command::named(zone, mute_name(zone), QUERY)
}

/// `input-selector=<code>`; the code is passed through verbatim.
pub fn cmd_select_source(zone: Zone, code: &str) -> Command {
    Command::named(zone, selector_name(zone), code)
}

pub fn cmd_query_source(zone: Zone) -> Command {
    Command::named(zone, selector_name(zone), QUERY)
}

pub fn cmd_select_preset(zone: Zone, preset: u8) -> Command {
    Command::named(zone, "preset", preset.to_string())
}

/// HDMI output routing. Only meaningful on the main zone.
pub fn cmd_select_hdmi_output(output: HdmiOutput) -> Command {
    Command::named(Zone::Main, "hdmi-output-selector", output.as_str())
}

pub fn cmd_query_source_list() -> Command {
    Command::raw(SOURCE_LIST_QUERY)
}

pub fn cmd_query_listening_modes() -> Command {
    Command::raw(LISTENING_MODE_QUERY)
}
