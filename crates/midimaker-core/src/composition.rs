//! The typed command stream the interpreter walks.
//!
//! - [`Item`] - one command of a composition
//! - [`Bar`] - a bar's chord changes, repeat count and clip flag
//! - [`Effects`] - per-voice effect updates as [`Patch`] fields
//! - [`Composition`] - the flat, ordered list of items
//!
//! Voices are referred to by their index in the performance's voice list.

use crate::duration::TICKS_PER_QUARTER;
use crate::timer::LevelChange;
use crate::voice::{DurationEffect, Rhythm};

/// An update to one optional setting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Patch<T> {
    /// Not mentioned; leave the setting alone.
    Keep,
    /// Explicitly unset.
    Clear,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Keep
    }
}

impl<T> Patch<T> {
    /// Apply to an optional setting.
    pub fn apply(self, target: &mut Option<T>) {
        match self {
            Patch::Keep => {}
            Patch::Clear => *target = None,
            Patch::Set(value) => *target = Some(value),
        }
    }

    /// Apply to a setting that falls back to `default` when cleared.
    pub fn apply_or(self, target: &mut T, default: T) {
        match self {
            Patch::Keep => {}
            Patch::Clear => *target = default,
            Patch::Set(value) => *target = value,
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Keep => Patch::Keep,
            Patch::Clear => Patch::Clear,
            Patch::Set(value) => Patch::Set(f(value)),
        }
    }
}

/// Time signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSig {
    pub top: u32,
    pub bottom: u32,
}

impl TimeSig {
    pub fn new(top: u32, bottom: u32) -> Self {
        Self { top, bottom }
    }

    /// Length of one bar: `top` notes of length `1/bottom`.
    pub fn ticks_per_bar(&self) -> i64 {
        self.top as i64 * TICKS_PER_QUARTER * 4 / self.bottom.max(1) as i64
    }
}

impl Default for TimeSig {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

/// A chord that takes effect `start` ticks into a bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordChange {
    pub start: i64,
    pub key: String,
    pub quality: String,
    /// Octave for rhythm voices while this chord is in force.
    pub octave: Option<i32>,
}

impl ChordChange {
    pub fn new(start: i64, key: impl Into<String>, quality: impl Into<String>) -> Self {
        Self {
            start,
            key: key.into(),
            quality: quality.into(),
            octave: None,
        }
    }

    pub fn with_octave(mut self, octave: i32) -> Self {
        self.octave = Some(octave);
        self
    }

    /// Key and quality, e.g. `Cmaj`.
    pub fn symbol(&self) -> String {
        format!("{}{}", self.key, self.quality)
    }
}

/// One bar, played `repeat` times.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub chords: Vec<ChordChange>,
    pub repeat: u32,
    pub clip: bool,
}

impl Bar {
    pub fn new(chords: Vec<ChordChange>) -> Self {
        Self {
            chords,
            repeat: 1,
            clip: true,
        }
    }

    pub fn with_repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_clip(mut self, clip: bool) -> Self {
        self.clip = clip;
        self
    }

    fn chord_at(&self, at: i64) -> &ChordChange {
        self.chords
            .iter()
            .rev()
            .find(|c| at >= c.start)
            .unwrap_or_else(|| panic!("no chord in force {at} ticks into the bar"))
    }

    /// Chord symbol in force `at` ticks into the bar.
    ///
    /// # Panics
    ///
    /// Panics if `at` precedes every chord change.
    pub fn get_chord(&self, at: i64) -> String {
        self.chord_at(at).symbol()
    }

    /// Key of the chord in force `at` ticks into the bar.
    pub fn get_tonic(&self, at: i64) -> &str {
        &self.chord_at(at).key
    }

    /// Octave override of the chord in force `at` ticks into the bar.
    pub fn get_octave(&self, at: i64) -> Option<i32> {
        self.chord_at(at).octave
    }
}

/// Effect updates for a set of voices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effects {
    pub voices: Vec<usize>,
    pub duration_effect: Patch<DurationEffect>,
    pub clip: Patch<bool>,
    pub octave: Patch<i32>,
    pub rate: Patch<i64>,
    pub chord_duration: Patch<i64>,
    pub vibrato: Patch<u8>,
    pub reverb: Patch<u8>,
    pub chorus: Patch<u8>,
    pub err_tim: Patch<u32>,
    pub err_dur: Patch<u32>,
    pub err_vol: Patch<u32>,
}

/// A note of a tune, relative to the start of the tune.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuneNote {
    pub start: i64,
    pub duration: i64,
    pub pitch: i32,
}

/// Play a tune on one voice starting at the current bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Play {
    pub voice: usize,
    pub notes: Vec<TuneNote>,
    pub transpose: i32,
}

/// Volume change for a set of voices.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub voices: Vec<usize>,
    pub change: LevelChange,
    pub rate: u32,
    /// Ticks after the start of the current bar.
    pub start: i64,
}

/// Pan change for a set of voices.
#[derive(Debug, Clone, PartialEq)]
pub struct Pan {
    pub voices: Vec<usize>,
    pub change: LevelChange,
    pub rate: u32,
}

/// One command of a composition.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Bar(Bar),
    /// Assign rhythm patterns, used round-robin one per bar.
    Beat { voices: Vec<usize>, rhythms: Vec<Rhythm> },
    Effects(Effects),
    Loop,
    /// Play the passage since the matching `Loop` this many times in total.
    Repeat(u32),
    Mute { voices: Vec<usize>, muted: bool },
    Play(Play),
    /// Stop (`true`) or resume (`false`) playing bars.
    Skip(bool),
    /// Beats per minute.
    Tempo(u32),
    TimeSig(TimeSig),
    Volume(Volume),
    Pan(Pan),
}

/// A flat list of items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition {
    pub items: Vec<Item>,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = Item>) {
        self.items.extend(items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The last bar in the composition, if any.
    pub fn last_bar(&self) -> Option<&Bar> {
        self.items.iter().rev().find_map(|item| match item {
            Item::Bar(bar) => Some(bar),
            _ => None,
        })
    }
}

impl From<Vec<Item>> for Composition {
    fn from(items: Vec<Item>) -> Self {
        Self { items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_per_bar() {
        assert_eq!(TimeSig::default().ticks_per_bar(), 3840);
        assert_eq!(TimeSig::new(3, 4).ticks_per_bar(), 2880);
        assert_eq!(TimeSig::new(6, 8).ticks_per_bar(), 2880);
        assert_eq!(TimeSig::new(7, 4).ticks_per_bar(), 6720);
    }

    #[test]
    fn test_chord_lookup_last_match_wins() {
        let bar = Bar::new(vec![
            ChordChange::new(0, "C", "maj"),
            ChordChange::new(1920, "G", "dom7").with_octave(3),
        ]);
        assert_eq!(bar.get_chord(0), "Cmaj");
        assert_eq!(bar.get_chord(1919), "Cmaj");
        assert_eq!(bar.get_chord(1920), "Gdom7");
        assert_eq!(bar.get_tonic(3000), "G");
        assert_eq!(bar.get_octave(0), None);
        assert_eq!(bar.get_octave(2000), Some(3));
    }

    #[test]
    #[should_panic]
    fn test_chord_lookup_before_first_change_panics() {
        let bar = Bar::new(vec![ChordChange::new(960, "C", "maj")]);
        bar.get_chord(0);
    }

    #[test]
    fn test_patch_apply() {
        let mut value = Some(3);
        Patch::Keep.apply(&mut value);
        assert_eq!(value, Some(3));
        Patch::Set(5).apply(&mut value);
        assert_eq!(value, Some(5));
        Patch::<i32>::Clear.apply(&mut value);
        assert_eq!(value, None);

        let mut octave = 2;
        Patch::Clear.apply_or(&mut octave, 4);
        assert_eq!(octave, 4);
    }

    #[test]
    fn test_last_bar() {
        let mut composition = Composition::new();
        assert!(composition.last_bar().is_none());
        composition.push(Item::Bar(Bar::new(vec![ChordChange::new(0, "C", "maj")])));
        composition.push(Item::Bar(Bar::new(vec![ChordChange::new(0, "F", "maj")])));
        composition.push(Item::Loop);
        assert_eq!(composition.last_bar().unwrap().get_tonic(0), "F");
    }
}
