//! Voices: one per declared instrument or percussion part.
//!
//! A [`Voice`] carries its identity (name, track, channel, program), the
//! pitch range it folds notes into, its performance [`Style`], the melodic
//! memory used by the improv generator, and the toggles that composition
//! commands change while the piece plays.

use crate::duration::QUARTER;
use serde::{Deserialize, Serialize};

/// One bar's worth of timing: negative slots are rests, zero extends to the
/// end of the bar.
pub type Rhythm = Vec<i64>;

/// MIDI channel shared by every percussion voice.
pub const PERCUSSION_CHANNEL: u8 = 9;

/// Pan position of a voice that has never been panned.
pub const CENTER_PAN: i32 = 64;

/// Performance style of a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Arpeggio,
    Bass,
    Improv,
    /// Sounds only through `play` commands.
    Lead,
    #[serde(alias = "perc")]
    Percussion,
    Rhythm,
}

impl Style {
    pub const ALL: [Style; 6] = [
        Style::Arpeggio,
        Style::Bass,
        Style::Improv,
        Style::Lead,
        Style::Percussion,
        Style::Rhythm,
    ];

    /// Lowercase name as written in a score.
    pub fn name(self) -> &'static str {
        match self {
            Style::Arpeggio => "arpeggio",
            Style::Bass => "bass",
            Style::Improv => "improv",
            Style::Lead => "lead",
            Style::Percussion => "percussion",
            Style::Rhythm => "rhythm",
        }
    }

    pub fn default_octave(self) -> i32 {
        match self {
            Style::Bass => 3,
            _ => 4,
        }
    }

    /// Volume used for the style's named volume level.
    pub fn default_volume(self) -> i32 {
        match self {
            Style::Arpeggio | Style::Rhythm => 60,
            Style::Bass | Style::Lead | Style::Percussion => 100,
            Style::Improv => 120,
        }
    }

    pub fn default_rate(self) -> i64 {
        QUARTER
    }

    pub fn default_rhythm(self) -> Rhythm {
        vec![QUARTER; 4]
    }
}

impl std::fmt::Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An amount by which a note's sounding length is changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjust {
    Ticks(i64),
    Factor(f64),
}

/// Shortens or lengthens the sounding part of each note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DurationEffect {
    /// `Ticks` caps the note length, `Factor` (below 1) scales it.
    Staccato(Adjust),
    /// `Ticks` is added to the note length, `Factor` (above 1) scales it.
    Overhang(Adjust),
}

/// Hands out MIDI channels in declaration order.
///
/// Melodic voices get channels 0..=15 skipping the percussion channel, so at
/// most fifteen of them can be declared. Percussion voices all share
/// [`PERCUSSION_CHANNEL`].
#[derive(Debug, Default)]
pub struct ChannelAllocator {
    next: u8,
}

impl ChannelAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next channel for a voice of `style`, or `None` when all are taken.
    pub fn allocate(&mut self, style: Style) -> Option<u8> {
        if style == Style::Percussion {
            return Some(PERCUSSION_CHANNEL);
        }
        if self.next == PERCUSSION_CHANNEL {
            self.next += 1;
        }
        if self.next > 15 {
            return None;
        }
        let channel = self.next;
        self.next += 1;
        Some(channel)
    }
}

/// A single part of the composition.
#[derive(Debug, Clone)]
pub struct Voice {
    pub name: String,
    /// 0-based track, in declaration order.
    pub track: usize,
    pub channel: u8,
    /// Program number (0-based), or the drum note for percussion.
    pub program: u8,
    pub style: Style,
    pub min_pitch: i32,
    pub max_pitch: i32,

    // Improv memory.
    pub prev_pitch: Option<i32>,
    pub prev_duration: i64,
    /// Ticks the last note of the previous bar sounded past its end.
    pub overlap: i64,

    pub active: bool,
    rhythms: Vec<Rhythm>,
    rhythm_index: usize,
    /// Last pan value sent, used to avoid repeating controller events.
    pub pan: i32,
    pub duration_effect: Option<DurationEffect>,
    pub clip: bool,
    pub octave: i32,
    /// Step between arpeggio notes.
    pub rate: i64,
    /// Sounding length of rhythm-style chords, independent of the slot.
    pub chord_duration: Option<i64>,
    pub vibrato: u8,
    pub reverb: u8,
    pub chorus: u8,
    /// Jitter magnitudes; `None` uses the preference.
    pub err_tim: Option<u32>,
    pub err_dur: Option<u32>,
    pub err_vol: Option<u32>,
}

impl Voice {
    /// Create a voice with the defaults of its style.
    pub fn new(name: impl Into<String>, track: usize, channel: u8, program: u8, style: Style) -> Self {
        Self {
            name: name.into(),
            track,
            channel,
            program,
            style,
            min_pitch: 0,
            max_pitch: 127,
            prev_pitch: None,
            prev_duration: 0,
            overlap: 0,
            active: true,
            rhythms: vec![style.default_rhythm()],
            rhythm_index: 0,
            pan: CENTER_PAN,
            duration_effect: None,
            clip: true,
            octave: style.default_octave(),
            rate: style.default_rate(),
            chord_duration: None,
            vibrato: 0,
            reverb: 0,
            chorus: 0,
            err_tim: None,
            err_dur: None,
            err_vol: None,
        }
    }

    /// Set the inclusive pitch range notes are folded into.
    ///
    /// A maximum below the minimum is rejected with a warning and the full
    /// MIDI range is kept.
    pub fn with_pitch_range(mut self, min_pitch: i32, max_pitch: i32) -> Self {
        if max_pitch < min_pitch {
            log::warn!(
                "Voice '{}': max_pitch {} is below min_pitch {}",
                self.name,
                max_pitch,
                min_pitch
            );
            return self;
        }
        self.min_pitch = min_pitch;
        self.max_pitch = max_pitch;
        self
    }

    pub fn is_percussion(&self) -> bool {
        self.channel == PERCUSSION_CHANNEL
    }

    /// Replace the rhythm patterns. The cursor is kept and wraps on next use.
    pub fn set_rhythms(&mut self, rhythms: Vec<Rhythm>) {
        if rhythms.is_empty() {
            log::warn!("Voice '{}': ignoring empty rhythm list", self.name);
            return;
        }
        self.rhythms = rhythms;
    }

    pub fn rhythm_count(&self) -> usize {
        self.rhythms.len()
    }

    /// Next rhythm pattern in turn.
    pub fn get_rhythm(&mut self) -> Rhythm {
        if self.rhythm_index >= self.rhythms.len() {
            self.rhythm_index = 0;
        }
        let rhythm = self.rhythms[self.rhythm_index].clone();
        self.rhythm_index += 1;
        rhythm
    }

    /// Apply the staccato or overhang effect to a note length.
    pub fn adjust_duration(&self, duration: i64) -> i64 {
        match self.duration_effect {
            None => duration,
            Some(DurationEffect::Staccato(Adjust::Ticks(cap))) => duration.min(cap),
            Some(DurationEffect::Staccato(Adjust::Factor(f)))
            | Some(DurationEffect::Overhang(Adjust::Factor(f))) => (duration as f64 * f) as i64,
            Some(DurationEffect::Overhang(Adjust::Ticks(extra))) => duration + extra,
        }
    }

    /// Fold `pitch` into the voice's range by whole octaves.
    pub fn constrain_pitch(&self, pitch: i32) -> i32 {
        if !(0..=127).contains(&pitch) {
            log::warn!("Voice '{}': pitch {} is out of range", self.name, pitch);
        }
        let mut pitch = pitch;
        while pitch < self.min_pitch {
            pitch += 12;
        }
        while pitch > self.max_pitch {
            pitch -= 12;
        }
        pitch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(style: Style) -> Voice {
        Voice::new("test", 0, 0, 0, style)
    }

    #[test]
    fn test_style_defaults() {
        assert_eq!(Style::Bass.default_octave(), 3);
        assert_eq!(Style::Rhythm.default_octave(), 4);
        assert_eq!(Style::Improv.default_volume(), 120);
        assert_eq!(Style::Arpeggio.default_volume(), 60);
        assert_eq!(Style::Rhythm.default_rhythm(), vec![960; 4]);
    }

    #[test]
    fn test_channel_allocation_skips_percussion() {
        let mut channels = ChannelAllocator::new();
        let melodic: Vec<u8> = (0..15)
            .map(|_| channels.allocate(Style::Bass).unwrap())
            .collect();
        assert_eq!(melodic, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 11, 12, 13, 14, 15]);
        assert_eq!(channels.allocate(Style::Rhythm), None);
        assert_eq!(channels.allocate(Style::Percussion), Some(PERCUSSION_CHANNEL));
    }

    #[test]
    fn test_rhythm_round_robin() {
        let mut v = voice(Style::Bass);
        v.set_rhythms(vec![vec![1], vec![2], vec![3]]);
        for i in 0..10 {
            assert_eq!(v.get_rhythm(), vec![(i % 3) as i64 + 1]);
        }
    }

    #[test]
    fn test_rhythm_cursor_wraps_after_shorter_list() {
        let mut v = voice(Style::Bass);
        v.set_rhythms(vec![vec![1], vec![2], vec![3]]);
        v.get_rhythm();
        v.get_rhythm();
        v.get_rhythm();
        v.set_rhythms(vec![vec![7]]);
        assert_eq!(v.get_rhythm(), vec![7]);
        assert_eq!(v.get_rhythm(), vec![7]);
    }

    #[test]
    fn test_empty_rhythms_ignored() {
        let mut v = voice(Style::Bass);
        v.set_rhythms(Vec::new());
        assert_eq!(v.rhythm_count(), 1);
    }

    #[test]
    fn test_adjust_duration() {
        let mut v = voice(Style::Rhythm);
        assert_eq!(v.adjust_duration(960), 960);
        v.duration_effect = Some(DurationEffect::Staccato(Adjust::Ticks(100)));
        assert_eq!(v.adjust_duration(960), 100);
        assert_eq!(v.adjust_duration(50), 50);
        v.duration_effect = Some(DurationEffect::Staccato(Adjust::Factor(0.5)));
        assert_eq!(v.adjust_duration(960), 480);
        v.duration_effect = Some(DurationEffect::Overhang(Adjust::Ticks(100)));
        assert_eq!(v.adjust_duration(960), 1060);
        v.duration_effect = Some(DurationEffect::Overhang(Adjust::Factor(1.5)));
        assert_eq!(v.adjust_duration(960), 1440);
    }

    #[test]
    fn test_constrain_pitch_range_and_class() {
        let v = voice(Style::Improv).with_pitch_range(40, 60);
        for x in -30..160 {
            let p = v.constrain_pitch(x);
            assert!((40..=60).contains(&p), "{x} -> {p}");
            assert_eq!(p.rem_euclid(12), x.rem_euclid(12));
            assert_eq!(v.constrain_pitch(p), p);
        }
    }

    #[test]
    fn test_bad_pitch_range_rejected() {
        let v = voice(Style::Improv).with_pitch_range(60, 40);
        assert_eq!((v.min_pitch, v.max_pitch), (0, 127));
    }
}
