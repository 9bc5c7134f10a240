//! Core types used throughout onkyo.
//!
//! These types describe the receiver independently of how a transport
//! encodes eISCP on the wire: zones, power state, HDMI output routing, the
//! command envelope handed to a transport, and the loosely-typed responses
//! a transport hands back.

use std::fmt;
use std::str::FromStr;

/// An independently powered and controlled output of one receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Zone {
    /// The main listening zone.
    Main,
    /// Second zone (powered or line-level).
    Zone2,
    /// Third zone.
    Zone3,
}

impl Zone {
    /// All zones in detection order.
    pub const ALL: [Zone; 3] = [Zone::Main, Zone::Zone2, Zone::Zone3];

    /// Stable identifier used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Main => "main",
            Zone::Zone2 => "zone2",
            Zone::Zone3 => "zone3",
        }
    }

    /// Command prefix for this zone, or `None` for the main zone whose
    /// commands are unqualified.
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            Zone::Main => None,
            Zone::Zone2 => Some("zone2"),
            Zone::Zone3 => Some("zone3"),
        }
    }

    pub fn is_main(&self) -> bool {
        matches!(self, Zone::Main)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string cannot be parsed into a [`Zone`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseZoneError(String);

impl fmt::Display for ParseZoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown zone: {}", self.0)
    }
}

impl std::error::Error for ParseZoneError {}

impl FromStr for Zone {
    type Err = ParseZoneError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "main" => Ok(Zone::Main),
            "zone2" => Ok(Zone::Zone2),
            "zone3" => Ok(Zone::Zone3),
            _ => Err(ParseZoneError(s.to_string())),
        }
    }
}

/// Power state of a zone as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PowerState {
    On,
    Off,
    /// The last status query failed or has not run yet.
    #[default]
    Unknown,
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PowerState::On => "on",
            PowerState::Off => "off",
            PowerState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// HDMI output routing on the main zone.
///
/// The set is fixed by the receiver firmware; anything outside it is
/// rejected before a command is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HdmiOutput {
    No,
    Analog,
    Yes,
    Out,
    OutSub,
    Sub,
    HdBaseT,
    Both,
    Up,
}

impl HdmiOutput {
    /// Every accepted output code, in firmware order.
    pub const ALL: [HdmiOutput; 9] = [
        HdmiOutput::No,
        HdmiOutput::Analog,
        HdmiOutput::Yes,
        HdmiOutput::Out,
        HdmiOutput::OutSub,
        HdmiOutput::Sub,
        HdmiOutput::HdBaseT,
        HdmiOutput::Both,
        HdmiOutput::Up,
    ];

    /// The wire argument for this output.
    pub fn as_str(&self) -> &'static str {
        match self {
            HdmiOutput::No => "no",
            HdmiOutput::Analog => "analog",
            HdmiOutput::Yes => "yes",
            HdmiOutput::Out => "out",
            HdmiOutput::OutSub => "out-sub",
            HdmiOutput::Sub => "sub",
            HdmiOutput::HdBaseT => "hdbaset",
            HdmiOutput::Both => "both",
            HdmiOutput::Up => "up",
        }
    }
}

impl fmt::Display for HdmiOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the [`HdmiOutput`] codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseHdmiOutputError(String);

impl fmt::Display for ParseHdmiOutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown HDMI output: {}", self.0)
    }
}

impl std::error::Error for ParseHdmiOutputError {}

impl FromStr for HdmiOutput {
    type Err = ParseHdmiOutputError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        HdmiOutput::ALL
            .into_iter()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| ParseHdmiOutputError(s.to_string()))
    }
}

/// A command handed to a transport.
///
/// `Named` commands render to the eISCP text grammar
/// `<zone-prefix.>?<name>=<argument>`, e.g. `zone2.power=query` or
/// `master-volume=40`. `Raw` carries a literal ISCP code such as `SLIQSTN`
/// for queries that have no named form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    Named {
        zone: Zone,
        name: &'static str,
        argument: String,
    },
    Raw(String),
}

impl Command {
    pub fn named(zone: Zone, name: &'static str, argument: impl Into<String>) -> Self {
        Command::Named {
            zone,
            name,
            argument: argument.into(),
        }
    }

    pub fn raw(code: impl Into<String>) -> Self {
        Command::Raw(code.into())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Named {
                zone,
                name,
                argument,
            } => match zone.prefix() {
                Some(prefix) => write!(f, "{prefix}.{name}={argument}"),
                None => write!(f, "{name}={argument}"),
            },
            Command::Raw(code) => f.write_str(code),
        }
    }
}

/// A raw response as produced by a transport.
///
/// eISCP clients return loosely-typed values: a bare string, a number, a
/// `(command, value)` pair whose value may itself be a `(code, label)`
/// pair, or a code-to-label table for catalog queries. The
/// [`response`](crate::response) module interprets these shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Text(String),
    Number(i64),
    Tuple(Vec<Response>),
    /// Code-to-label mapping returned by catalog queries.
    Table(Vec<(String, String)>),
}

impl Response {
    /// Build a two-element tuple response.
    pub fn pair(first: impl Into<Response>, second: impl Into<Response>) -> Self {
        Response::Tuple(vec![first.into(), second.into()])
    }

    /// Whether the response carries nothing at all.
    ///
    /// A session probe treats an empty response the same as a failure.
    pub fn is_empty(&self) -> bool {
        match self {
            Response::Text(s) => s.is_empty(),
            Response::Number(_) => false,
            Response::Tuple(items) => items.is_empty(),
            Response::Table(entries) => entries.is_empty(),
        }
    }
}

impl From<&str> for Response {
    fn from(s: &str) -> Self {
        Response::Text(s.to_string())
    }
}

impl From<String> for Response {
    fn from(s: String) -> Self {
        Response::Text(s)
    }
}

impl From<i64> for Response {
    fn from(n: i64) -> Self {
        Response::Number(n)
    }
}

impl From<Vec<Response>> for Response {
    fn from(items: Vec<Response>) -> Self {
        Response::Tuple(items)
    }
}
