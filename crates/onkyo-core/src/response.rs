//! Tolerant interpretation of raw receiver responses.
//!
//! A query such as `input-selector=query` may come back as a bare value,
//! as a `(command, value)` pair, or as a pair whose value is itself a
//! `(code, label)` tuple. The same rules apply to power, volume, mute and
//! source parsing:
//!
//! - a 2-tuple yields its second element as the candidate
//! - a bare scalar is its own candidate
//! - a tuple candidate yields its first element (the code, dropping the
//!   label); an empty tuple yields nothing
//!
//! Unsolicited push values arrive without the command name, so
//! [`extract_pushed`] applies only the last rule.
//!
//! Every parser returns `None` for input it does not recognise. Callers
//! leave their cached state untouched in that case.

use crate::types::{PowerState, Response};

/// Resolve a query response to its scalar value.
pub fn extract(response: &Response) -> Option<&Response> {
    match response {
        Response::Tuple(items) if items.len() == 2 => extract_pushed(&items[1]),
        Response::Tuple(_) | Response::Table(_) => None,
        scalar => Some(scalar),
    }
}

/// Resolve a pushed value (no command name attached) to its scalar value.
pub fn extract_pushed(value: &Response) -> Option<&Response> {
    match value {
        Response::Tuple(items) => match items.first() {
            Some(first @ (Response::Text(_) | Response::Number(_))) => Some(first),
            _ => None,
        },
        Response::Table(_) => None,
        scalar => Some(scalar),
    }
}

/// Interpret a scalar as a power token: `on` or `standby`.
pub fn power(value: &Response) -> Option<PowerState> {
    match value {
        Response::Text(s) if s.eq_ignore_ascii_case("on") => Some(PowerState::On),
        Response::Text(s) if s.eq_ignore_ascii_case("standby") => Some(PowerState::Off),
        _ => None,
    }
}

/// Interpret a scalar as a receiver-scale volume level.
pub fn volume(value: &Response) -> Option<u32> {
    match value {
        Response::Number(n) => u32::try_from(*n).ok(),
        Response::Text(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

/// Interpret a scalar as a mute token: `on` or `off`.
pub fn muted(value: &Response) -> Option<bool> {
    match value {
        Response::Text(s) if s.eq_ignore_ascii_case("on") => Some(true),
        Response::Text(s) if s.eq_ignore_ascii_case("off") => Some(false),
        _ => None,
    }
}

/// Interpret a scalar as a source code, verbatim.
pub fn source(value: &Response) -> Option<String> {
    match value {
        Response::Text(s) if !s.is_empty() => Some(s.clone()),
        Response::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn parse_power(response: &Response) -> Option<PowerState> {
    extract(response).and_then(power)
}

pub fn parse_volume(response: &Response) -> Option<u32> {
    extract(response).and_then(volume)
}

pub fn parse_mute(response: &Response) -> Option<bool> {
    extract(response).and_then(muted)
}

pub fn parse_source(response: &Response) -> Option<String> {
    extract(response).and_then(source)
}

/// Extract the code-to-label table from a catalog query response.
///
/// Accepts the table directly or wrapped in a `(command, table)` pair.
pub fn parse_table(response: &Response) -> Option<&[(String, String)]> {
    match response {
        Response::Table(entries) => Some(entries),
        Response::Tuple(items) if items.len() == 2 => match &items[1] {
            Response::Table(entries) => Some(entries),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Response {
        Response::from(s)
    }

    // ---- extract ----

    #[test]
    fn extract_bare_scalar() {
        assert_eq!(extract(&t("on")), Some(&t("on")));
        assert_eq!(extract(&Response::Number(40)), Some(&Response::Number(40)));
    }

    #[test]
    fn extract_pair_takes_second() {
        let resp = Response::pair("system-power", "on");
        assert_eq!(extract(&resp), Some(&t("on")));
    }

    #[test]
    fn extract_nested_pair_takes_code() {
        let resp = Response::pair("input-selector", Response::pair("cbl-sat", "CBL/SAT"));
        assert_eq!(extract(&resp), Some(&t("cbl-sat")));
    }

    #[test]
    fn extract_nested_alias_tuple_takes_first() {
        let aliases = Response::Tuple(vec![t("video2"), t("cbl"), t("sat")]);
        let resp = Response::pair("input-selector", aliases);
        assert_eq!(extract(&resp), Some(&t("video2")));
    }

    #[test]
    fn extract_nested_empty_is_none() {
        let resp = Response::pair("input-selector", Response::Tuple(vec![]));
        assert_eq!(extract(&resp), None);
    }

    #[test]
    fn extract_odd_tuples_are_none() {
        assert_eq!(extract(&Response::Tuple(vec![t("input-selector")])), None);
        assert_eq!(extract(&Response::Tuple(vec![])), None);
    }

    #[test]
    fn extract_pushed_pair_takes_code() {
        let value = Response::pair("cbl-sat", "CBL/SAT");
        assert_eq!(extract_pushed(&value), Some(&t("cbl-sat")));
        assert_eq!(extract_pushed(&Response::Tuple(vec![])), None);
        assert_eq!(extract_pushed(&t("dvd")), Some(&t("dvd")));
    }

    // ---- typed parsers ----

    #[test]
    fn parse_power_tokens() {
        assert_eq!(parse_power(&Response::pair("system-power", "on")), Some(PowerState::On));
        assert_eq!(
            parse_power(&Response::pair("system-power", "standby")),
            Some(PowerState::Off)
        );
        assert_eq!(
            parse_power(&Response::pair(
                "system-power",
                Response::pair("standby", "off")
            )),
            Some(PowerState::Off)
        );
        assert_eq!(parse_power(&t("off")), None);
        assert_eq!(parse_power(&t("sleeping")), None);
    }

    #[test]
    fn parse_volume_numeric_forms() {
        assert_eq!(parse_volume(&Response::pair("master-volume", 40_i64)), Some(40));
        assert_eq!(parse_volume(&Response::pair("master-volume", "40")), Some(40));
        assert_eq!(parse_volume(&t(" 12 ")), Some(12));
    }

    #[test]
    fn parse_volume_rejects_garbage() {
        assert_eq!(parse_volume(&Response::pair("master-volume", "N/A")), None);
        assert_eq!(parse_volume(&t("40.5")), None);
        assert_eq!(parse_volume(&Response::Number(-3)), None);
    }

    #[test]
    fn parse_mute_tokens() {
        assert_eq!(parse_mute(&Response::pair("audio-muting", "on")), Some(true));
        assert_eq!(parse_mute(&Response::pair("audio-muting", "off")), Some(false));
        assert_eq!(parse_mute(&Response::pair("audio-muting", "toggle")), None);
    }

    #[test]
    fn parse_source_examples() {
        let resp = Response::pair("input-selector", Response::pair("cbl-sat", "CBL/SAT"));
        assert_eq!(parse_source(&resp).as_deref(), Some("cbl-sat"));

        let empty = Response::pair("input-selector", Response::Tuple(vec![]));
        assert_eq!(parse_source(&empty), None);

        assert_eq!(parse_source(&t("dvd")).as_deref(), Some("dvd"));
        assert_eq!(parse_source(&t("")), None);
    }

    #[test]
    fn parse_table_shapes() {
        let table = Response::Table(vec![("10".into(), "BD/DVD".into())]);
        assert_eq!(parse_table(&table).map(|t| t.len()), Some(1));

        let wrapped = Response::pair("SLI", table.clone());
        assert_eq!(parse_table(&wrapped).map(|t| t.len()), Some(1));

        assert!(parse_table(&t("SLIQSTN")).is_none());
    }
}
