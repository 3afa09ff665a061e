//! Note names, chord symbols and the pitches they stand for.
//!
//! A chord symbol is a key (`C`, `F#`, `Bb`, ...) followed by a quality
//! (`maj`, `min`, `dom7`, ...). `m` is shorthand for `min`, a bare `7` for
//! `dom7`, and no quality at all means `maj`.

use crate::error::{Error, Result};

/// Chord qualities and their intervals above the root.
pub const CHORDS: &[(&str, &[i32])] = &[
    ("maj", &[0, 4, 7]),
    ("min", &[0, 3, 7]),
    ("dim", &[0, 3, 6]),
    ("aug", &[0, 4, 8]),
    ("maj7", &[0, 4, 7, 11]),
    ("min7", &[0, 3, 7, 10]),
    ("dom7", &[0, 4, 7, 10]),
    ("dim7", &[0, 3, 6, 9]),
    ("maj6", &[0, 4, 7, 9]),
    ("min6", &[0, 3, 7, 9]),
    ("maj9", &[0, 4, 7, 11, 14]),
    ("min9", &[0, 3, 7, 10, 14]),
    ("sus4", &[0, 5, 7]),
];

/// Preferred spelling of each pitch class.
pub const INTERVAL_TO_NOTE: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Keys ordered around the circle of fifths (descending).
pub const FIFTHS: [&str; 12] = [
    "C", "F", "Bb", "Eb", "Ab", "C#", "F#", "B", "E", "A", "D", "G",
];

/// Semitones above C for a note name such as `C`, `F#` or `Bb`.
///
/// `B#` is 12 and `Cb` is 11, matching how they are written.
pub fn note_to_interval(note: &str) -> Result<i32> {
    let mut chars = note.chars();
    let base = match chars.next() {
        Some('C') => 0,
        Some('D') => 2,
        Some('E') => 4,
        Some('F') => 5,
        Some('G') => 7,
        Some('A') => 9,
        Some('B') => 11,
        _ => return Err(Error::UnknownNote(note.to_string())),
    };
    let accidental = match (chars.next(), chars.next()) {
        (None, _) => 0,
        (Some('#'), None) => 1,
        (Some('b'), None) => -1,
        _ => return Err(Error::UnknownNote(note.to_string())),
    };
    let interval = base + accidental;
    Ok(if interval < 0 { interval + 12 } else { interval })
}

/// Intervals of a chord quality, if known.
pub fn quality_intervals(quality: &str) -> Option<&'static [i32]> {
    CHORDS
        .iter()
        .find(|(name, _)| *name == quality)
        .map(|(_, intervals)| *intervals)
}

/// Normalize the quality part of a chord symbol (`m` → `min`, `7` → `dom7`).
pub fn normalize_quality(quality: &str) -> String {
    match quality {
        "" => "maj".to_string(),
        "7" => "dom7".to_string(),
        "m" => "min".to_string(),
        "m7" => "min7".to_string(),
        "m6" => "min6".to_string(),
        "m9" => "min9".to_string(),
        other => other.to_string(),
    }
}

/// Split a chord symbol into its key and normalized quality.
pub fn split_chord(chord: &str) -> Result<(String, String)> {
    let key_len = match chord.as_bytes().get(1) {
        Some(b'#') | Some(b'b') => 2,
        _ => 1,
    }
    .min(chord.len());
    if chord.is_empty() || !chord.is_char_boundary(key_len) {
        return Err(Error::UnknownChord(chord.to_string()));
    }
    let (key, quality) = chord.split_at(key_len);
    note_to_interval(key).map_err(|_| Error::UnknownChord(chord.to_string()))?;
    let quality = normalize_quality(quality);
    if quality_intervals(&quality).is_none() {
        return Err(Error::UnknownChord(chord.to_string()));
    }
    Ok((key.to_string(), quality))
}

/// Resolves chord symbols and note names to pitches.
pub trait ChordResolver {
    /// Absolute MIDI pitches of `chord` with its root in `octave`.
    fn chord_to_pitches(&self, chord: &str, octave: i32) -> Result<Vec<i32>>;

    /// Semitones above C for `note`.
    fn note_to_interval(&self, note: &str) -> Result<i32>;
}

/// The built-in chord table.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChordTable;

impl ChordResolver for ChordTable {
    fn chord_to_pitches(&self, chord: &str, octave: i32) -> Result<Vec<i32>> {
        if !(0..12).contains(&octave) {
            return Err(Error::invalid("octave", format!("{octave} is out of range")));
        }
        let (key, quality) = split_chord(chord)?;
        let root = note_to_interval(&key)? + octave * 12;
        let intervals =
            quality_intervals(&quality).ok_or_else(|| Error::UnknownChord(chord.to_string()))?;
        Ok(intervals.iter().map(|i| root + i).collect())
    }

    fn note_to_interval(&self, note: &str) -> Result<i32> {
        note_to_interval(note)
    }
}
