//! The playback cursor shared by the bar generators.

use crate::chords::ChordResolver;
use crate::composition::{Bar, TimeSig};
use crate::error::Result;
use crate::voice::Voice;

/// Where playback is: the current bar, its start, and a working position.
///
/// `position` belongs to whichever generator is running; it has no meaning
/// between generator calls.
#[derive(Debug, Clone)]
pub struct BarInfo {
    pub timesig: TimeSig,
    pub bar: Bar,
    /// Absolute tick of the current bar's first beat.
    pub start: i64,
    pub position: i64,
}

impl Default for BarInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl BarInfo {
    pub fn new() -> Self {
        Self {
            timesig: TimeSig::default(),
            bar: Bar::new(Vec::new()),
            start: 0,
            position: 0,
        }
    }

    pub fn bar_end(&self) -> i64 {
        self.start + self.timesig.ticks_per_bar()
    }

    pub fn bar_ended(&self) -> bool {
        self.position >= self.bar_end()
    }

    pub fn in_bar(&self) -> bool {
        !self.bar_ended()
    }

    /// Position relative to the start of the bar.
    pub fn bar_position(&self) -> i64 {
        self.position - self.start
    }

    /// Move to the next bar.
    pub fn advance(&mut self) {
        self.start += self.timesig.ticks_per_bar();
    }

    pub fn get_chord(&self) -> String {
        self.bar.get_chord(self.bar_position())
    }

    pub fn get_tonic(&self) -> &str {
        self.bar.get_tonic(self.bar_position())
    }

    /// Pitch class (0-11) of the tonic, as `resolver` spells it.
    pub fn get_tonic_offset(&self, resolver: &dyn ChordResolver) -> Result<i32> {
        Ok(resolver.note_to_interval(self.get_tonic())?.rem_euclid(12))
    }

    /// The chord's octave if it gives one, else the voice's.
    pub fn get_octave(&self, voice: &Voice) -> i32 {
        self.bar
            .get_octave(self.bar_position())
            .unwrap_or(voice.octave)
    }

    /// Whether notes of `voice` are cut at the end of the bar.
    pub fn clip(&self, voice: &Voice) -> bool {
        self.bar.clip && voice.clip
    }

    /// Time a note occupies in the bar.
    ///
    /// Zero extends to the end of the bar. Clipped voices never run past it.
    pub fn adjust_note_time(&self, voice: &Voice, duration: i64) -> i64 {
        assert!(duration >= 0, "rests are handled by the caller");
        let remaining = self.bar_end() - self.position;
        if duration == 0 {
            return remaining;
        }
        if self.clip(voice) && duration > remaining {
            remaining
        } else {
            duration
        }
    }

    /// Time a note sounds for, after the voice's duration effect.
    pub fn adjust_play_time(&self, voice: &Voice, duration: i64) -> i64 {
        voice.adjust_duration(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chords::ChordTable;
    use crate::composition::ChordChange;
    use crate::voice::{Adjust, DurationEffect, Style};

    fn bar_info() -> BarInfo {
        let mut info = BarInfo::new();
        info.bar = Bar::new(vec![
            ChordChange::new(0, "A", "min"),
            ChordChange::new(1920, "E", "dom7").with_octave(5),
        ]);
        info.start = 3840;
        info.position = 3840;
        info
    }

    #[test]
    fn test_bar_bounds() {
        let mut info = bar_info();
        assert_eq!(info.bar_end(), 7680);
        assert!(info.in_bar());
        info.position = 7680;
        assert!(info.bar_ended());
        info.advance();
        assert_eq!(info.start, 7680);
    }

    #[test]
    fn test_harmonic_context() {
        let mut info = bar_info();
        let voice = Voice::new("v", 0, 0, 0, Style::Rhythm);
        assert_eq!(info.get_chord(), "Amin");
        assert_eq!(info.get_tonic_offset(&ChordTable).unwrap(), 9);
        assert_eq!(info.get_octave(&voice), 4);
        info.position = 3840 + 2000;
        assert_eq!(info.get_chord(), "Edom7");
        assert_eq!(info.get_octave(&voice), 5);
    }

    #[test]
    fn test_adjust_note_time() {
        let mut info = bar_info();
        let mut voice = Voice::new("v", 0, 0, 0, Style::Bass);
        info.position = 3840 + 3000;
        assert_eq!(info.adjust_note_time(&voice, 0), 840);
        assert_eq!(info.adjust_note_time(&voice, 1000), 840);
        assert_eq!(info.adjust_note_time(&voice, 500), 500);
        voice.clip = false;
        assert_eq!(info.adjust_note_time(&voice, 1000), 1000);
        voice.clip = true;
        info.bar.clip = false;
        assert_eq!(info.adjust_note_time(&voice, 1000), 1000);
    }

    #[test]
    fn test_adjust_play_time() {
        let info = bar_info();
        let mut voice = Voice::new("v", 0, 0, 0, Style::Bass);
        voice.duration_effect = Some(DurationEffect::Staccato(Adjust::Factor(0.25)));
        assert_eq!(info.adjust_play_time(&voice, 960), 240);
    }
}
