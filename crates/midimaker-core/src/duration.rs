//! Note lengths in ticks and the names used to write them.
//!
//! | name | length | ticks |
//! |------|--------|-------|
//! | `d`  | double whole | 7680 |
//! | `n`  | whole | 3840 |
//! | `h`  | half | 1920 |
//! | `q`  | quarter | 960 |
//! | `e`  | eighth | 480 |
//! | `s`  | sixteenth | 240 |
//! | `t`  | thirty-second | 120 |
//!
//! A `t` prefix makes a triplet (`tq` = 320), a `d` prefix a doublet
//! (`dq` = 640). A trailing `.` adds half again (`q.` = 1440). Lengths can be
//! added with `+` and subtracted with `-` (`h+e`, `n-q`).

use crate::error::{Error, Result};

/// Ticks per quarter note (PPQN).
pub const TICKS_PER_QUARTER: i64 = 960;

pub const THIRTY_SECOND: i64 = TICKS_PER_QUARTER / 8;
pub const SIXTEENTH: i64 = 2 * THIRTY_SECOND;
pub const EIGHTH: i64 = 2 * SIXTEENTH;
pub const QUARTER: i64 = 2 * EIGHTH;
pub const HALF: i64 = 2 * QUARTER;
pub const WHOLE: i64 = 2 * HALF;
pub const DOUBLE_WHOLE: i64 = 2 * WHOLE;

/// Length used when a chord or note omits its duration.
pub const DEFAULT: i64 = QUARTER;

/// Look up a single duration name without dot or sign.
pub fn named(name: &str) -> Option<i64> {
    let base = |c: char| match c {
        't' => Some(THIRTY_SECOND),
        's' => Some(SIXTEENTH),
        'e' => Some(EIGHTH),
        'q' => Some(QUARTER),
        'h' => Some(HALF),
        'n' => Some(WHOLE),
        'd' => Some(DOUBLE_WHOLE),
        _ => None,
    };
    let mut chars = name.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(c), None, None) => base(c),
        (Some('t'), Some(c), None) => base(c).map(|ticks| ticks / 3),
        (Some('d'), Some(c), None) => base(c).map(|ticks| ticks * 2 / 3),
        _ => None,
    }
}

fn term(text: &str) -> Result<i64> {
    let (name, dotted) = match text.strip_suffix('.') {
        Some(name) => (name, true),
        None => (text, false),
    };
    let ticks = named(name).ok_or_else(|| Error::InvalidDuration(text.to_string()))?;
    Ok(if dotted { ticks * 3 / 2 } else { ticks })
}

/// Evaluate a duration expression such as `q`, `h.`, `q+e` or `n-q`.
///
/// Plain digit strings are taken as ticks. The result must be positive.
pub fn parse_duration(text: &str) -> Result<i64> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::InvalidDuration(text.to_string()));
    }
    if let Ok(ticks) = text.parse::<i64>() {
        return if ticks > 0 {
            Ok(ticks)
        } else {
            Err(Error::InvalidDuration(text.to_string()))
        };
    }
    let mut total = 0;
    for sum_part in text.split('+') {
        let mut parts = sum_part.split('-');
        let first = parts.next().unwrap_or_default();
        let mut sub_total = term(first)?;
        for part in parts {
            sub_total -= term(part)?;
        }
        total += sub_total;
    }
    if total <= 0 {
        return Err(Error::InvalidDuration(text.to_string()));
    }
    Ok(total)
}

/// Evaluate one rhythm slot: a leading `-` makes a rest and `0` extends the
/// note to the end of the bar.
pub fn parse_slot(text: &str) -> Result<i64> {
    let text = text.trim();
    if text == "0" {
        return Ok(0);
    }
    match text.strip_prefix('-') {
        Some(rest) => parse_duration(rest).map(|ticks| -ticks),
        None => parse_duration(text),
    }
}

/// Evaluate a comma-separated list of rhythm slots.
pub fn parse_durations(text: &str) -> Result<Vec<i64>> {
    text.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(parse_slot)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(THIRTY_SECOND, 120);
        assert_eq!(QUARTER, 960);
        assert_eq!(WHOLE, 3840);
        assert_eq!(DOUBLE_WHOLE, 7680);
    }

    #[test]
    fn test_named() {
        assert_eq!(named("q"), Some(960));
        assert_eq!(named("tq"), Some(320));
        assert_eq!(named("dq"), Some(640));
        assert_eq!(named("tt"), Some(40));
        assert_eq!(named("x"), None);
        assert_eq!(named("qq"), None);
    }

    #[test]
    fn test_parse_compound() {
        assert_eq!(parse_duration("q.").unwrap(), 1440);
        assert_eq!(parse_duration("h+e").unwrap(), 2400);
        assert_eq!(parse_duration("n-q").unwrap(), 2880);
        assert_eq!(parse_duration("q.+n-e").unwrap(), 1440 + 3840 - 480);
        assert_eq!(parse_duration("1000").unwrap(), 1000);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("z").is_err());
        assert!(parse_duration("q-n").is_err());
        assert!(parse_duration("q+").is_err());
    }

    #[test]
    fn test_parse_durations_with_rests() {
        assert_eq!(
            parse_durations("q, -e, e, 0").unwrap(),
            vec![960, -480, 480, 0]
        );
        assert_eq!(parse_durations("-480").unwrap(), vec![-480]);
    }
}
