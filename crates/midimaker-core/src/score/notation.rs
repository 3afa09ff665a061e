//! The short text notations used inside score documents.
//!
//! - bar chords: `hC@3, hG7` (duration, chord symbol, optional `@octave`)
//! - tunes: `qC@5, eE, eG+eC, h, theme` (notes, `+` for sounds played
//!   together, a bare duration for silence, a tune name to splice it in)
//! - levels: `80` sets a level, `+10`/`-10` changes it
//! - time signatures: `3/4`
//! - opus parts: `intro, verse*2, outro`

use std::collections::HashMap;

use crate::chords::{note_to_interval, quality_intervals, split_chord};
use crate::composition::{ChordChange, TimeSig, TuneNote};
use crate::duration::{parse_duration, parse_slot, DEFAULT, QUARTER};
use crate::error::{Error, Result};
use crate::timer::LevelChange;

/// Octave of tune notes until one is given.
pub const DEFAULT_TUNE_OCTAVE: i32 = 5;

const DURATION_CHARS: &str = "tseqhnd.+-0123456789";

/// Split `[duration]symbol[@octave]` into its parts.
fn split_sound(text: &str) -> Result<(Option<i64>, &str, Option<i32>)> {
    let split = text
        .find(|c: char| !DURATION_CHARS.contains(c))
        .ok_or_else(|| Error::UnknownNote(text.to_string()))?;
    let (duration, rest) = text.split_at(split);
    let duration = if duration.is_empty() {
        None
    } else {
        Some(parse_duration(duration)?)
    };
    let (symbol, octave) = match rest.split_once('@') {
        Some((symbol, octave)) => {
            let octave = octave
                .parse::<i32>()
                .ok()
                .filter(|o| (0..=10).contains(o))
                .ok_or_else(|| Error::invalid("octave", format!("bad octave in '{text}'")))?;
            (symbol, Some(octave))
        }
        None => (rest, None),
    };
    Ok((duration, symbol, octave))
}

/// Parse the chords of one bar.
///
/// Chords follow each other; one without a duration lasts a quarter note.
/// A chord without an octave takes the previous chord's.
pub fn parse_bar_chords(text: &str) -> Result<Vec<ChordChange>> {
    let mut chords = Vec::new();
    let mut tick = 0;
    let mut octave = None;
    for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (duration, symbol, item_octave) = split_sound(item)?;
        let (key, quality) = split_chord(symbol)?;
        if item_octave.is_some() {
            octave = item_octave;
        }
        let mut change = ChordChange::new(tick, key, quality);
        change.octave = octave;
        chords.push(change);
        tick += duration.unwrap_or(DEFAULT);
    }
    Ok(chords)
}

fn is_tune_name(text: &str) -> bool {
    text.chars().next().is_some_and(|c| c.is_ascii_lowercase())
        && text.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Parse a tune into notes relative to its start.
///
/// Durations and octaves carry over from the first sound of the previous
/// item; the first item defaults to a quarter note in octave 5. Only the
/// first sound of a `+` group moves the tune forward.
pub fn parse_tune(text: &str, tunes: &HashMap<String, Vec<TuneNote>>) -> Result<Vec<TuneNote>> {
    let mut notes: Vec<TuneNote> = Vec::new();
    let mut start = 0;
    let mut last_duration = QUARTER;
    let mut last_octave = DEFAULT_TUNE_OCTAVE;

    for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if item.chars().all(|c| DURATION_CHARS.contains(c)) {
            let rest = parse_slot(item)?;
            if rest < 0 {
                log::warn!("Negative rest '{}' in tune", item);
            }
            start += rest.abs();
            continue;
        }

        if is_tune_name(item) {
            let sub_tune = tunes
                .get(item)
                .ok_or_else(|| Error::UnknownTune(item.to_string()))?;
            for note in sub_tune {
                notes.push(TuneNote {
                    start: note.start + start,
                    ..*note
                });
            }
            if let Some(end) = sub_tune.iter().map(|n| n.start + n.duration).max() {
                start += end;
            }
            continue;
        }

        for (i, sound) in item.split('+').map(str::trim).enumerate() {
            let (duration, symbol, octave) = split_sound(sound)?;
            let duration = duration.unwrap_or(last_duration);
            let octave = octave.unwrap_or(last_octave);
            let pitches = sound_pitches(symbol, octave)?;
            notes.extend(pitches.into_iter().map(|pitch| TuneNote {
                start,
                duration,
                pitch,
            }));
            if i == 0 {
                last_duration = duration;
                last_octave = octave;
            }
        }
        start += last_duration;
    }
    Ok(notes)
}

/// A bare key is one note; a key with a quality is a chord.
fn sound_pitches(symbol: &str, octave: i32) -> Result<Vec<i32>> {
    if let Ok(interval) = note_to_interval(symbol) {
        return Ok(vec![interval + octave * 12]);
    }
    let (key, quality) = split_chord(symbol)?;
    let root = note_to_interval(&key)? + octave * 12;
    let intervals =
        quality_intervals(&quality).ok_or_else(|| Error::UnknownChord(symbol.to_string()))?;
    Ok(intervals.iter().map(|i| root + i).collect())
}

/// Parse an absolute level (`80`) or a change (`+10`, `-10`).
pub fn parse_level(text: &str) -> Option<LevelChange> {
    let text = text.trim();
    let magnitude = |digits: &str| digits.parse::<u32>().ok().and_then(|d| i32::try_from(d).ok());
    if let Some(digits) = text.strip_prefix('+') {
        magnitude(digits).map(LevelChange::Delta)
    } else if let Some(digits) = text.strip_prefix('-') {
        magnitude(digits).map(|d| LevelChange::Delta(-d))
    } else {
        magnitude(text).map(LevelChange::Absolute)
    }
}

/// Parse `top/bottom`; the bottom must be a power of two.
pub fn parse_timesig(text: &str) -> Result<TimeSig> {
    let bad = || Error::invalid("timesig", format!("'{text}' is not like 3/4"));
    let (top, bottom) = text.trim().split_once('/').ok_or_else(bad)?;
    let top: u32 = top.trim().parse().map_err(|_| bad())?;
    let bottom: u32 = bottom.trim().parse().map_err(|_| bad())?;
    if top == 0 || !bottom.is_power_of_two() {
        return Err(bad());
    }
    Ok(TimeSig::new(top, bottom))
}

/// Parse the parts of an opus: `name` or `name*count`, comma separated.
pub fn parse_opus(text: &str) -> Result<Vec<(String, u32)>> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|part| match part.split_once('*') {
            Some((name, count)) => {
                let count = count
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| Error::invalid("opus", format!("bad count in '{part}'")))?;
                Ok((name.trim().to_string(), count))
            }
            None => Ok((part.to_string(), 1)),
        })
        .collect()
}
