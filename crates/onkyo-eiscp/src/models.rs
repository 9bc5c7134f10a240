//! Per-model supported source tables.
//!
//! Each entry lists the input selector names (first `SLI` aliases) that a
//! model's firmware accepts. Many models share a source set, so sets are
//! defined once and referenced by model. The name is matched exactly
//! against the model string the receiver reports, including suffixes such
//! as `(Ether)`.
//!
//! | Set             | Typical hardware                              |
//! |-----------------|-----------------------------------------------|
//! | `LEGACY_AV`     | 2010-2011 receivers without networking        |
//! | `LEGACY_NET`    | 2011-2013 networked receivers                 |
//! | `NET_BT`        | 2014-2016 receivers with Bluetooth            |
//! | `STREAMING`     | 2017+ receivers with STRM BOX input           |
//! | `STEREO_NET`    | networked stereo receivers                    |
//! | `PIONEER_2017`  | Pioneer VSX models sharing Onkyo firmware     |

/// Supported sources for one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSources {
    pub model: &'static str,
    pub sources: &'static [&'static str],
}

const LEGACY_AV: &[&str] = &[
    "am", "cd", "dvd", "fm", "multi-ch", "phono", "tape-1", "tuner", "universal-port", "usb",
    "video1", "video2", "video3", "video4", "video5", "video6",
];

const LEGACY_NET: &[&str] = &[
    "am", "cd", "dvd", "fm", "internet-radio", "multi-ch", "music-server", "network", "phono",
    "tape-1", "universal-port", "usb", "usb(rear)", "video1", "video2", "video3", "video4",
    "video5", "video6",
];

const NET_BT: &[&str] = &[
    "am", "bluetooth", "cd", "dvd", "fm", "network", "phono", "tv", "usb", "video1", "video2",
    "video3", "video4", "video5", "video6",
];

const STREAMING: &[&str] = &[
    "am", "bluetooth", "cd", "dvd", "fm", "network", "phono", "strm-box", "tv", "usb", "video1",
    "video2", "video3", "video4", "video6", "video7",
];

const STEREO_NET: &[&str] = &[
    "am", "bluetooth", "cd", "fm", "line", "line2", "network", "optical", "coaxial", "phono",
    "tv", "usb", "video1", "video2", "video3", "video4",
];

const PIONEER_2017: &[&str] = &[
    "am", "bluetooth", "cd", "dvd", "fm", "network", "phono", "tv", "usb", "video2", "video3",
    "video6",
];

/// Model to source-set table used by the built-in catalog.
pub static MODEL_SOURCES: &[ModelSources] = &[
    ModelSources { model: "HT-R558", sources: LEGACY_AV },
    ModelSources { model: "TX-SR608", sources: LEGACY_AV },
    ModelSources { model: "TX-NR509", sources: LEGACY_AV },
    ModelSources { model: "TX-NR609", sources: LEGACY_NET },
    ModelSources { model: "TX-NR609(Ether)", sources: LEGACY_NET },
    ModelSources { model: "TX-NR616", sources: LEGACY_NET },
    ModelSources { model: "TX-NR717", sources: LEGACY_NET },
    ModelSources { model: "TX-NR818", sources: LEGACY_NET },
    ModelSources { model: "TX-NR535", sources: NET_BT },
    ModelSources { model: "TX-NR636", sources: NET_BT },
    ModelSources { model: "TX-NR646", sources: NET_BT },
    ModelSources { model: "TX-RZ900", sources: NET_BT },
    ModelSources { model: "TX-NR686", sources: STREAMING },
    ModelSources { model: "TX-NR696", sources: STREAMING },
    ModelSources { model: "TX-RZ50", sources: STREAMING },
    ModelSources { model: "TX-RZ840", sources: STREAMING },
    ModelSources { model: "TX-8270", sources: STEREO_NET },
    ModelSources { model: "TX-8250", sources: STEREO_NET },
    ModelSources { model: "VSX-831", sources: PIONEER_2017 },
    ModelSources { model: "VSX-832", sources: STREAMING },
    ModelSources { model: "VSX-932", sources: STREAMING },
    ModelSources { model: "VSX-933", sources: STREAMING },
    ModelSources { model: "VSX-LX101", sources: PIONEER_2017 },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SOURCES;

    #[test]
    fn model_names_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for m in MODEL_SOURCES {
            assert!(seen.insert(m.model), "duplicate model {}", m.model);
        }
    }

    #[test]
    fn every_listed_source_exists_in_catalog() {
        for m in MODEL_SOURCES {
            for source in m.sources {
                assert!(
                    SOURCES.iter().any(|e| e.names.first() == Some(source)),
                    "{} lists unknown source {}",
                    m.model,
                    source
                );
            }
        }
    }
}
