//! Chordal rhythm: every sounding slot plays the whole chord in force.

use super::{sound, walk_rhythm};
use crate::bar_info::BarInfo;
use crate::error::Result;
use crate::interpreter::InterpreterContext;
use crate::sink::EventSink;
use crate::voice::Voice;

/// Generate one bar of chords.
///
/// The voice's `chord_duration`, when set, replaces the sounding length of
/// each chord, except for slots that extend to the end of the bar.
pub fn make_bar(
    ctx: &mut InterpreterContext,
    bar_info: &mut BarInfo,
    voice: &mut Voice,
    sink: &mut dyn EventSink,
) -> Result<()> {
    walk_rhythm(ctx, bar_info, voice, sink, |ctx, bar_info, voice, sink, slot, duration| {
        let octave = bar_info.get_octave(voice);
        let pitches: Vec<i32> = ctx
            .resolver
            .chord_to_pitches(&bar_info.get_chord(), octave)?
            .into_iter()
            .map(|p| voice.constrain_pitch(p))
            .collect();
        let length = match voice.chord_duration {
            Some(ticks) if slot != 0 && ticks > 0 => bar_info.adjust_note_time(voice, ticks),
            _ => duration,
        };
        let play_time = bar_info.adjust_play_time(voice, length);
        sound(ctx, bar_info, voice, &pitches, play_time, sink);
        Ok(())
    })
}
