//! Tunes queued by `play` commands.

use crate::bar_info::BarInfo;
use crate::composition::{Play, TuneNote};
use crate::generators::sound;
use crate::interpreter::InterpreterContext;
use crate::sink::EventSink;
use crate::timer::{make_in_range, MAX_LEVEL};
use crate::voice::Voice;

/// A tune placed at an absolute start, played bar by bar.
#[derive(Debug, Clone)]
pub struct Tune {
    voice: usize,
    notes: Vec<TuneNote>,
}

impl Tune {
    /// Place `play`'s notes starting at `start`, transposed.
    pub fn new(play: &Play, start: i64) -> Self {
        let mut notes: Vec<TuneNote> = play
            .notes
            .iter()
            .map(|note| TuneNote {
                start: note.start + start,
                duration: note.duration,
                pitch: make_in_range(note.pitch + play.transpose, MAX_LEVEL, "Play note"),
            })
            .collect();
        notes.sort_by_key(|note| note.start);
        Self {
            voice: play.voice,
            notes,
        }
    }

    pub fn notes(&self) -> &[TuneNote] {
        &self.notes
    }

    /// Play the notes that start inside the current bar.
    ///
    /// Every note is checked on every bar, so a loop that revisits a span
    /// plays its notes again.
    pub fn play(
        &self,
        ctx: &mut InterpreterContext,
        bar_info: &mut BarInfo,
        voices: &mut [Voice],
        sink: &mut dyn EventSink,
    ) {
        let Some(voice) = voices.get_mut(self.voice) else {
            log::warn!("Tune refers to missing voice {}", self.voice);
            return;
        };
        if !voice.active {
            return;
        }
        let bar_end = bar_info.bar_end();
        for note in &self.notes {
            if note.start < bar_info.start {
                continue;
            }
            if note.start >= bar_end {
                break;
            }
            bar_info.position = note.start;
            sound(ctx, bar_info, voice, &[note.pitch], note.duration, sink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::test_support::{bar_info, context};
    use crate::sink::RecordingSink;
    use crate::voice::Style;

    fn play() -> Play {
        Play {
            voice: 0,
            notes: vec![
                TuneNote { start: 0, duration: 960, pitch: 60 },
                TuneNote { start: 3840, duration: 960, pitch: 62 },
                TuneNote { start: 960, duration: 960, pitch: 125 },
            ],
            transpose: 5,
        }
    }

    #[test]
    fn test_new_shifts_sorts_and_clamps() {
        let tune = Tune::new(&play(), 7680);
        let starts: Vec<i64> = tune.notes().iter().map(|n| n.start).collect();
        let pitches: Vec<i32> = tune.notes().iter().map(|n| n.pitch).collect();
        assert_eq!(starts, vec![7680, 8640, 11520]);
        assert_eq!(pitches, vec![65, 127, 67]);
    }

    #[test]
    fn test_plays_only_notes_in_bar() {
        let mut ctx = context();
        let mut info = bar_info(&[(0, "C", "maj")]);
        let mut voices = vec![Voice::new("lead", 0, 0, 0, Style::Lead)];
        let tune = Tune::new(&play(), 0);
        let mut sink = RecordingSink::new();

        tune.play(&mut ctx, &mut info, &mut voices, &mut sink);
        assert_eq!(sink.notes().len(), 2);
        info.advance();
        tune.play(&mut ctx, &mut info, &mut voices, &mut sink);
        assert_eq!(sink.notes().len(), 3);
        assert_eq!(sink.notes()[2].start, 3840);
    }

    #[test]
    fn test_muted_voice_is_silent() {
        let mut ctx = context();
        let mut info = bar_info(&[(0, "C", "maj")]);
        let mut voices = vec![Voice::new("lead", 0, 0, 0, Style::Lead)];
        voices[0].active = false;
        let mut sink = RecordingSink::new();
        Tune::new(&play(), 0).play(&mut ctx, &mut info, &mut voices, &mut sink);
        assert!(sink.notes().is_empty());
    }
}
