//! Pioneer receiver profiles.
//!
//! Some Pioneer receivers share the Onkyo firmware but ship with a much
//! louder amplifier stage and a curated input panel. A [`ReceiverProfile`]
//! captures the defaults that make such a receiver usable out of the box:
//! a lower volume ceiling, the labelled sources actually on the back panel,
//! and the listening modes worth exposing.
//!
//! Profiles are defined as factory functions (e.g. [`vsx_932()`]) that
//! return a fully populated [`ReceiverProfile`]; [`lookup()`] finds one by
//! the model string the receiver reports.
//!
//! | Model      | Max vol % | Zones        | Tuners    |
//! |------------|-----------|--------------|-----------|
//! | VSX-831    | 55        | main         | FM, AM    |
//! | VSX-832    | 55        | main         | FM, AM    |
//! | VSX-S520D  | 50        | main         | FM, DAB   |
//! | VSX-932    | 55        | main         | FM, AM    |
//! | VSX-933    | 55        | main, zone2  | FM, AM    |
//! | VSX-LX101  | 60        | main         | FM, AM    |

use onkyo_core::types::Zone;
use onkyo_core::volume::VolumeResolution;

/// Broadcast tuners fitted to a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tuners {
    pub fm: bool,
    pub am: bool,
    pub dab: bool,
}

/// Static defaults for one receiver model.
#[derive(Debug, Clone)]
pub struct ReceiverProfile {
    /// Model string as reported by the receiver (e.g. "VSX-932").
    pub model: &'static str,
    pub brand: &'static str,
    /// Zones physically present on the unit.
    pub zones: &'static [Zone],
    pub tuners: Tuners,
    /// Default operator ceiling as a percent of the receiver's range.
    pub max_volume_percent: u8,
    /// Volume resolution, if it differs from the Onkyo default.
    pub volume_resolution: Option<VolumeResolution>,
    /// Source code to display label, in panel order.
    pub sources: &'static [(&'static str, &'static str)],
    pub listening_modes: &'static [&'static str],
}

impl ReceiverProfile {
    pub fn has_zone(&self, zone: Zone) -> bool {
        self.zones.contains(&zone)
    }

    /// Sources as owned `(code, label)` pairs.
    pub fn source_pairs(&self) -> Vec<(String, String)> {
        self.sources
            .iter()
            .map(|(code, label)| (code.to_string(), label.to_string()))
            .collect()
    }
}

const MAIN_ONLY: &[Zone] = &[Zone::Main];
const MAIN_AND_ZONE2: &[Zone] = &[Zone::Main, Zone::Zone2];

const FM_AM: Tuners = Tuners {
    fm: true,
    am: true,
    dab: false,
};

const BASIC_MODES: &[&str] = &["Stereo", "Direct", "Dolby Surround", "All Channel Stereo"];
const NEURAL_X_MODES: &[&str] = &[
    "Stereo",
    "Direct",
    "Dolby Surround",
    "DTS Neural:X",
    "All Channel Stereo",
];

const VSX_9XX_SOURCES: &[(&str, &str)] = &[
    ("bd", "Blu-ray"),
    ("cbl/sat", "Set-top Box"),
    ("game", "Game Console"),
    ("pc", "PC"),
    ("tv", "TV (ARC)"),
    ("net", "Network"),
    ("fm", "FM Radio"),
    ("am", "AM Radio"),
    ("phono", "Phono"),
    ("usb", "USB"),
    ("bluetooth", "Bluetooth"),
    ("cd", "CD Player"),
];

pub fn vsx_831() -> ReceiverProfile {
    ReceiverProfile {
        model: "VSX-831",
        brand: "Pioneer",
        zones: MAIN_ONLY,
        tuners: FM_AM,
        max_volume_percent: 55,
        volume_resolution: None,
        sources: &[
            ("bd", "Blu-ray"),
            ("cbl/sat", "Set-top Box"),
            ("game", "Game"),
            ("tv", "TV (ARC)"),
            ("net", "Network"),
            ("fm", "FM"),
            ("am", "AM"),
            ("phono", "Phono"),
            ("bluetooth", "Bluetooth"),
            ("cd", "CD"),
        ],
        listening_modes: BASIC_MODES,
    }
}

pub fn vsx_832() -> ReceiverProfile {
    ReceiverProfile {
        model: "VSX-832",
        brand: "Pioneer",
        zones: MAIN_ONLY,
        tuners: FM_AM,
        max_volume_percent: 55,
        volume_resolution: None,
        sources: &[
            ("bd", "Blu-ray"),
            ("cbl/sat", "Set-top Box"),
            ("strm box", "Streaming Box"),
            ("game", "Game"),
            ("tv", "TV (ARC)"),
            ("net", "Network"),
            ("fm", "FM"),
            ("am", "AM"),
            ("phono", "Phono"),
            ("bluetooth", "Bluetooth"),
            ("cd", "CD"),
        ],
        listening_modes: BASIC_MODES,
    }
}

/// Compact soundbar-style receiver with DAB instead of AM.
pub fn vsx_s520d() -> ReceiverProfile {
    ReceiverProfile {
        model: "VSX-S520D",
        brand: "Pioneer",
        zones: MAIN_ONLY,
        tuners: Tuners {
            fm: true,
            am: false,
            dab: true,
        },
        max_volume_percent: 50,
        volume_resolution: None,
        sources: &[
            ("bd", "Blu-ray"),
            ("cbl/sat", "Set-top Box"),
            ("strm box", "Streaming Box"),
            ("game", "Game"),
            ("tv", "TV (ARC)"),
            ("net", "Network"),
            ("dab", "DAB Radio"),
            ("fm", "FM Radio"),
            ("phono", "Phono"),
            ("usb", "USB"),
            ("bluetooth", "Bluetooth"),
            ("cd", "CD Player"),
        ],
        listening_modes: BASIC_MODES,
    }
}

pub fn vsx_932() -> ReceiverProfile {
    ReceiverProfile {
        model: "VSX-932",
        brand: "Pioneer",
        zones: MAIN_ONLY,
        tuners: FM_AM,
        max_volume_percent: 55,
        volume_resolution: None,
        sources: VSX_9XX_SOURCES,
        listening_modes: NEURAL_X_MODES,
    }
}

/// Same panel as the VSX-932 plus a powered zone 2.
pub fn vsx_933() -> ReceiverProfile {
    ReceiverProfile {
        model: "VSX-933",
        brand: "Pioneer",
        zones: MAIN_AND_ZONE2,
        tuners: FM_AM,
        max_volume_percent: 55,
        volume_resolution: None,
        sources: VSX_9XX_SOURCES,
        listening_modes: NEURAL_X_MODES,
    }
}

pub fn vsx_lx101() -> ReceiverProfile {
    ReceiverProfile {
        model: "VSX-LX101",
        brand: "Pioneer",
        zones: MAIN_ONLY,
        tuners: FM_AM,
        max_volume_percent: 60,
        volume_resolution: None,
        sources: &[
            ("bd", "Blu-ray"),
            ("cbl/sat", "Set-top Box"),
            ("game", "Game"),
            ("pc", "PC"),
            ("tv", "TV (ARC)"),
            ("net", "Network"),
            ("fm", "FM"),
            ("am", "AM"),
            ("phono", "Phono"),
            ("bluetooth", "Bluetooth"),
            ("cd", "CD"),
        ],
        listening_modes: NEURAL_X_MODES,
    }
}

/// Every known profile.
pub fn all_profiles() -> Vec<ReceiverProfile> {
    vec![
        vsx_831(),
        vsx_832(),
        vsx_s520d(),
        vsx_932(),
        vsx_933(),
        vsx_lx101(),
    ]
}

/// Find the profile for a reported model string (exact match).
pub fn lookup(model: &str) -> Option<ReceiverProfile> {
    all_profiles().into_iter().find(|p| p.model == model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_and_unknown() {
        assert_eq!(lookup("VSX-831").map(|p| p.max_volume_percent), Some(55));
        assert_eq!(lookup("VSX-LX101").map(|p| p.max_volume_percent), Some(60));
        assert!(lookup("TX-NR609").is_none());
        assert!(lookup("vsx-831").is_none());
    }

    #[test]
    fn profile_sources_keep_panel_order() {
        let p = vsx_lx101();
        let pairs = p.source_pairs();
        assert_eq!(pairs[0], ("bd".to_string(), "Blu-ray".to_string()));
        assert!(pairs.iter().any(|(c, l)| c == "tv" && l == "TV (ARC)"));
        assert!(!pairs.iter().any(|(c, _)| c == "video1"));
    }

    #[test]
    fn zones_and_tuners() {
        assert!(vsx_933().has_zone(Zone::Zone2));
        assert!(!vsx_932().has_zone(Zone::Zone2));
        let s520 = vsx_s520d();
        assert!(s520.tuners.dab);
        assert!(!s520.tuners.am);
    }

    #[test]
    fn every_profile_is_sane() {
        for p in all_profiles() {
            assert_eq!(p.brand, "Pioneer");
            assert!(p.has_zone(Zone::Main), "{} has no main zone", p.model);
            assert!((1..=100).contains(&p.max_volume_percent));
            assert!(!p.sources.is_empty());
            assert!(p.listening_modes.contains(&"Stereo"));
        }
    }
}
