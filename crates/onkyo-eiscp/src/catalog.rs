//! Source and listening-mode catalog resolution.
//!
//! A [`CommandCatalog`] bundles three immutable tables: every input
//! selector (`SLI`) value, every listening mode (`LMD`) value, and the
//! per-model lists of supported source names. The built-in catalog is a
//! `static`, so callers pass `&'static CommandCatalog` around instead of
//! touching global state.
//!
//! Resolution rules:
//!
//! - navigation entries (`up`, `down`, `query`) and the reserved codes
//!   `07`, `08`, `09` never appear as sources
//! - a known model restricts the sources to its supported list
//! - an unknown or absent model gets the whole catalog
//! - listening modes are deduplicated, formatted for display and sorted

use std::collections::{BTreeMap, HashSet};

use crate::models::{ModelSources, MODEL_SOURCES};

/// One value of an eISCP command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    /// ISCP parameter code, e.g. `"2B"`.
    pub code: &'static str,
    /// Named aliases, most specific first.
    pub names: &'static [&'static str],
    /// Human description as written in the command reference.
    pub description: &'static str,
}

const fn entry(
    code: &'static str,
    names: &'static [&'static str],
    description: &'static str,
) -> CatalogEntry {
    CatalogEntry {
        code,
        names,
        description,
    }
}

/// Source names that are never offered as selectable inputs.
const EXCLUDED_SOURCES: [&str; 6] = ["07", "08", "09", "up", "down", "query"];
/// Listening-mode names that are never offered.
const EXCLUDED_MODES: [&str; 3] = ["up", "down", "query"];

/// Input selector (`SLI`) values.
pub static SOURCES: &[CatalogEntry] = &[
    entry("00", &["video1", "vcr/dvr"], "sets VIDEO1, VCR/DVR"),
    entry("01", &["video2", "cbl/sat"], "sets VIDEO2, CBL/SAT"),
    entry("02", &["video3", "game/tv", "game"], "sets VIDEO3, GAME/TV, GAME"),
    entry("03", &["video4", "aux1"], "sets VIDEO4, AUX1(AUX)"),
    entry("04", &["video5", "aux2"], "sets VIDEO5, AUX2"),
    entry("05", &["video6", "pc"], "sets VIDEO6, PC"),
    entry("06", &["video7"], "sets VIDEO7"),
    entry("07", &["07"], "sets Hidden1"),
    entry("08", &["08"], "sets Hidden2"),
    entry("09", &["09"], "sets Hidden3"),
    entry("10", &["dvd", "bd/dvd"], "sets DVD, BD/DVD"),
    entry("11", &["strm-box"], "sets STRM BOX"),
    entry("12", &["tv"], "sets TV"),
    entry("20", &["tape-1", "tv/tape"], "sets TAPE(1), TV/TAPE"),
    entry("21", &["tape2"], "sets TAPE2"),
    entry("22", &["phono"], "sets PHONO"),
    entry("23", &["cd", "tv/cd"], "sets CD, TV/CD"),
    entry("24", &["fm"], "sets FM"),
    entry("25", &["am"], "sets AM"),
    entry("26", &["tuner"], "sets TUNER"),
    entry("27", &["music-server", "p4s", "dlna"], "sets MUSIC SERVER, P4S, DLNA"),
    entry("28", &["internet-radio", "iradio-favorite"], "sets INTERNET RADIO, iRadio Favorite"),
    entry("29", &["usb", "usb(front)"], "sets USB/USB(Front)"),
    entry("2A", &["usb(rear)"], "sets USB(Rear)"),
    entry("2B", &["network", "net"], "sets NETWORK, NET"),
    entry("2C", &["usb(toggle)"], "sets USB(toggle)"),
    entry("2D", &["airplay"], "sets Airplay"),
    entry("2E", &["bluetooth"], "sets Bluetooth"),
    entry("2F", &["usb-dac-in"], "sets USB DAC In"),
    entry("30", &["multi-ch"], "sets MULTI CH"),
    entry("31", &["xm"], "sets XM"),
    entry("32", &["sirius"], "sets SIRIUS"),
    entry("33", &["dab"], "sets DAB"),
    entry("40", &["universal-port"], "sets Universal PORT"),
    entry("41", &["line"], "sets LINE"),
    entry("42", &["line2"], "sets LINE2"),
    entry("44", &["optical"], "sets OPTICAL"),
    entry("45", &["coaxial"], "sets COAXIAL"),
    entry("55", &["hdmi-5"], "sets HDMI 5"),
    entry("56", &["hdmi-6"], "sets HDMI 6"),
    entry("57", &["hdmi-7"], "sets HDMI 7"),
    entry("80", &["main-source"], "sets Main Source"),
    entry("UP", &["up"], "sets Selector Position Wrap-Around Up"),
    entry("DOWN", &["down"], "sets Selector Position Wrap-Around Down"),
    entry("QSTN", &["query"], "gets The Selector Position"),
];

/// Listening mode (`LMD`) values.
///
/// For modes the display name is the *last* alias: it is the newest
/// marketing name for the mode.
pub static SOUND_MODES: &[CatalogEntry] = &[
    entry("00", &["stereo"], "sets STEREO"),
    entry("01", &["direct"], "sets DIRECT"),
    entry("02", &["surround"], "sets SURROUND"),
    entry("03", &["film", "game-rpg"], "sets FILM, Game-RPG"),
    entry("04", &["thx"], "sets THX"),
    entry("05", &["action", "game-action"], "sets ACTION, Game-Action"),
    entry("06", &["musical", "game-rock"], "sets MUSICAL, Game-Rock"),
    entry("07", &["mono-movie"], "sets MONO MOVIE"),
    entry("08", &["orchestra"], "sets ORCHESTRA"),
    entry("09", &["unplugged"], "sets UNPLUGGED"),
    entry("0A", &["studio-mix"], "sets STUDIO-MIX"),
    entry("0B", &["tv-logic"], "sets TV LOGIC"),
    entry("0C", &["all-ch-stereo"], "sets ALL CH STEREO"),
    entry("0D", &["theater-dimensional"], "sets THEATER-DIMENSIONAL"),
    entry("0E", &["enhanced-7", "enhance", "game-sports"], "sets ENHANCED 7/ENHANCE, Game-Sports"),
    entry("0F", &["mono"], "sets MONO"),
    entry("11", &["pure-audio"], "sets PURE AUDIO"),
    entry("12", &["multiplex"], "sets MULTIPLEX"),
    entry("13", &["full-mono"], "sets FULL MONO"),
    entry("14", &["dolby-virtual"], "sets DOLBY VIRTUAL"),
    entry("15", &["dts-surround-sensation"], "sets DTS Surround Sensation"),
    entry("16", &["audyssey-dsx"], "sets Audyssey DSX"),
    entry("1F", &["whole-house"], "sets Whole House Mode"),
    entry("40", &["straight-decode"], "sets Straight Decode"),
    entry("41", &["dolby-ex"], "sets Dolby EX"),
    entry("42", &["thx-cinema"], "sets THX Cinema"),
    entry("43", &["thx-surround-ex"], "sets THX Surround EX"),
    entry("44", &["thx-music"], "sets THX Music"),
    entry("45", &["thx-games"], "sets THX Games"),
    entry("50", &["thx-u2", "s2", "cinema2"], "sets THX U2/S2/I/S Cinema/Cinema2"),
    entry("51", &["thx-musicmode", "thx-music"], "sets THX MusicMode"),
    entry("52", &["thx-u2", "thx-games"], "sets THX U2/S2/I/S Games"),
    entry("80", &["plii", "pliix-movie", "dolby-atmos", "dolby-surround"], "sets PLII/PLIIx Movie, Dolby Atmos/Dolby Surround"),
    entry("81", &["plii", "pliix-music"], "sets PLII/PLIIx Music"),
    entry("82", &["neo-6", "neo-x-cinema", "dts-x", "neural-x"], "sets Neo:6/Neo:X Cinema, DTS:X/Neural:X"),
    entry("83", &["neo-6", "neo-x-music"], "sets Neo:6/Neo:X Music"),
    entry("84", &["plii", "pliix-thx-cinema", "dolby-surround-thx-cinema"], "sets PLII/PLIIx THX Cinema, Dolby Surround THX Cinema"),
    entry("86", &["plii", "pliix-game"], "sets PLII/PLIIx Game"),
    entry("87", &["neural-surr"], "sets Neural Surr"),
    entry("88", &["neural-thx", "neural-surround"], "sets Neural THX/Neural Surround"),
    entry("8B", &["plii", "pliix-thx-music", "dolby-surround-thx-music"], "sets PLII/PLIIx THX Music, Dolby Surround THX Music"),
    entry("90", &["pliiz-height"], "sets PLIIz Height"),
    entry("93", &["neural-digital-music"], "sets Neural Digital Music"),
    entry("FF", &["auto-surround"], "sets Auto Surround"),
    entry("UP", &["up"], "sets Listening Mode Wrap-Around Up"),
    entry("DOWN", &["down"], "sets Listening Mode Wrap-Around Down"),
    entry("QSTN", &["query"], "gets The Listening Mode"),
];

/// Immutable lookup tables for source and listening-mode resolution.
#[derive(Debug)]
pub struct CommandCatalog {
    sources: &'static [CatalogEntry],
    sound_modes: &'static [CatalogEntry],
    models: &'static [ModelSources],
}

static BUILTIN: CommandCatalog = CommandCatalog::new(SOURCES, SOUND_MODES, MODEL_SOURCES);

impl CommandCatalog {
    pub const fn new(
        sources: &'static [CatalogEntry],
        sound_modes: &'static [CatalogEntry],
        models: &'static [ModelSources],
    ) -> Self {
        CommandCatalog {
            sources,
            sound_modes,
            models,
        }
    }

    /// The catalog compiled into this crate.
    pub fn builtin() -> &'static CommandCatalog {
        &BUILTIN
    }

    /// Supported source names for `model`, if the model is known.
    pub fn model_sources(&self, model: &str) -> Option<&'static [&'static str]> {
        self.models
            .iter()
            .find(|m| m.model == model)
            .map(|m| m.sources)
    }

    /// Resolve the selectable sources as `(name, description)` pairs in
    /// catalog order.
    ///
    /// The name is the first alias; the description has its `sets ` verb
    /// stripped. Unknown and absent models both yield the full list.
    pub fn sources_for_model(&self, model: Option<&str>) -> Vec<(String, String)> {
        let supported: Option<HashSet<&str>> = model
            .and_then(|m| self.model_sources(m))
            .map(|names| names.iter().copied().collect());

        let mut resolved: Vec<(String, String)> = Vec::new();
        for entry in self.sources {
            let Some(&name) = entry.names.first() else {
                continue;
            };
            if EXCLUDED_SOURCES.contains(&name) {
                continue;
            }
            if let Some(supported) = &supported {
                if !supported.contains(name) {
                    continue;
                }
            }
            let description = entry.description.replace("sets ", "");
            match resolved.iter_mut().find(|(n, _)| n.as_str() == name) {
                Some(existing) => existing.1 = description,
                None => resolved.push((name.to_string(), description)),
            }
        }
        resolved
    }

    /// Every listening mode as `name -> display label`, sorted by name.
    ///
    /// ```
    /// use onkyo_eiscp::catalog::CommandCatalog;
    ///
    /// let modes = CommandCatalog::builtin().sound_modes();
    /// assert_eq!(modes["all-ch-stereo"], "All Ch Stereo");
    /// ```
    pub fn sound_modes(&self) -> BTreeMap<String, String> {
        self.sound_modes
            .iter()
            .filter_map(|entry| entry.names.last().copied())
            .filter(|name| !EXCLUDED_MODES.contains(name))
            .map(|name| (name.to_string(), display_name(name)))
            .collect()
    }

    /// The full source list restricted to `keys`.
    pub fn selected_sources<S: AsRef<str>>(&self, keys: &[S]) -> Vec<(String, String)> {
        self.sources_for_model(None)
            .into_iter()
            .filter(|(name, _)| keys.iter().any(|k| k.as_ref() == name))
            .collect()
    }

    /// The listening-mode map restricted to `keys`.
    pub fn selected_sound_modes<S: AsRef<str>>(&self, keys: &[S]) -> BTreeMap<String, String> {
        self.sound_modes()
            .into_iter()
            .filter(|(name, _)| keys.iter().any(|k| k.as_ref() == name))
            .collect()
    }
}

/// Swap keys and values, e.g. to map display labels back to codes.
///
/// When two keys share a value the last one in iteration order wins.
pub fn reverse_mapping<'a, I>(pairs: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (v.clone(), k.clone()))
        .collect()
}

/// `all-ch-stereo` -> `All Ch Stereo`.
///
/// Hyphens become spaces; a letter is upper-cased when it follows a
/// non-letter and lower-cased otherwise.
pub fn display_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_is_letter = false;
    for ch in name.chars() {
        let ch = if ch == '-' { ' ' } else { ch };
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = false;
        }
    }
    out
}
