//! Improvised chord progressions.
//!
//! Each new bar holds one chord that shares two tones with the last chord of
//! the bar before it and lies close to it on the circle of fifths:
//!
//! - majors within two steps of the key of a major chord, or of the key
//!   three steps up from a minor one
//! - minors within two steps of the key three steps down from a major
//!   chord, or of the key of a minor one
//!
//! "Up" is towards the flats, following the order of [`FIFTHS`].

use crate::chords::{note_to_interval, quality_intervals, CHORDS, FIFTHS, INTERVAL_TO_NOTE};
use crate::composition::{Bar, ChordChange};
use crate::error::{Error, Result};
use crate::rando::Rando;

fn pitch_classes(root: i32, quality: &str) -> Result<Vec<i32>> {
    let intervals = quality_intervals(quality)
        .ok_or_else(|| Error::UnknownChord(format!("{}{}", INTERVAL_TO_NOTE[root as usize], quality)))?;
    let mut classes: Vec<i32> = intervals.iter().map(|i| (root + i) % 12).collect();
    classes.sort_unstable();
    classes.dedup();
    Ok(classes)
}

/// Pitch classes of the keys within two fifths of `center` steps from `root`.
fn close_keys(root: i32, center: i32) -> Vec<i32> {
    let index = FIFTHS
        .iter()
        .position(|name| note_to_interval(name).is_ok_and(|i| i % 12 == root))
        .unwrap_or_default() as i32;
    (center - 2..=center + 2)
        .filter_map(|offset| {
            let name = FIFTHS[(index + offset).rem_euclid(12) as usize];
            note_to_interval(name).ok().map(|i| i % 12)
        })
        .collect()
}

/// Two different tones of the chord, chosen at random.
fn pick_two(classes: &[i32], rando: &mut Rando) -> Option<(i32, i32)> {
    if classes.len() < 2 {
        return None;
    }
    let first = classes[rando.index(classes.len())];
    let mut second = first;
    while second == first {
        second = classes[rando.index(classes.len())];
    }
    Some((first, second))
}

/// Every chord other than `root`/`quality` that holds both tones of `pair`
/// and whose key is close enough for its kind.
fn related_chords(
    root: i32,
    quality: &str,
    pair: (i32, i32),
    close_major: &[i32],
    close_minor: &[i32],
) -> Result<Vec<(i32, &'static str)>> {
    let mut chords = Vec::new();
    for key in 0..12 {
        for &(name, _) in CHORDS {
            if key == root && name == quality {
                continue;
            }
            let close = if name.starts_with("min") { close_minor } else { close_major };
            if !close.contains(&key) {
                continue;
            }
            let tones = pitch_classes(key, name)?;
            if tones.contains(&pair.0) && tones.contains(&pair.1) {
                chords.push((key, name));
            }
        }
    }
    Ok(chords)
}

fn next_bar(prev: &Bar, clip: bool, rando: &mut Rando) -> Result<Bar> {
    let last = prev
        .chords
        .last()
        .ok_or_else(|| Error::invalid("chords", "cannot improvise after a bar without chords"))?;
    let root = note_to_interval(&last.key)? % 12;
    let classes = pitch_classes(root, &last.quality)?;
    let minor = last.quality.starts_with("min");
    let (close_major, close_minor) = if minor {
        (close_keys(root, 3), close_keys(root, 0))
    } else {
        (close_keys(root, 0), close_keys(root, -3))
    };

    let mut candidates = match pick_two(&classes, rando) {
        Some(pair) => related_chords(root, &last.quality, pair, &close_major, &close_minor)?,
        None => Vec::new(),
    };
    // The random pair may belong to no related chord; fall back to the
    // other pairs in order.
    for (i, &a) in classes.iter().enumerate() {
        if !candidates.is_empty() {
            break;
        }
        for &b in &classes[i + 1..] {
            candidates = related_chords(root, &last.quality, (a, b), &close_major, &close_minor)?;
            if !candidates.is_empty() {
                break;
            }
        }
    }

    let change = match rando.choice(&candidates) {
        Some(&(key, quality)) => ChordChange::new(0, INTERVAL_TO_NOTE[key as usize], quality),
        None => {
            log::warn!("No chord follows {}; repeating it", last.symbol());
            ChordChange::new(0, last.key.clone(), last.quality.clone())
        }
    };
    let change = match last.octave {
        Some(octave) => change.with_octave(octave),
        None => change,
    };
    Ok(Bar::new(vec![change]).with_clip(clip))
}

/// Improvise `repeat` bars following `prev`.
///
/// The same `seed` and starting bar always give the same progression.
pub fn improvise_bars(prev: &Bar, repeat: u32, clip: bool, seed: usize) -> Result<Vec<Bar>> {
    let mut rando = Rando::new(seed)?;
    let mut bars: Vec<Bar> = Vec::with_capacity(repeat as usize);
    for _ in 0..repeat {
        let bar = next_bar(bars.last().unwrap_or(prev), clip, &mut rando)?;
        bars.push(bar);
    }
    Ok(bars)
}
