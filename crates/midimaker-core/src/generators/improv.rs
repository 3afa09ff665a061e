//! Improvised melody: a random walk over the scale of the chord in force.
//!
//! Each note steps a small random distance along a ladder of scale pitches
//! from where the previous note sat. Durations are drawn from a small set
//! that includes a rest, or repeat the previous one. A note that runs past
//! the end of an unclipped bar carries into the next bar, which starts late
//! by the same amount.

use super::sound;
use crate::bar_info::BarInfo;
use crate::duration::{EIGHTH, HALF, QUARTER};
use crate::error::Result;
use crate::interpreter::InterpreterContext;
use crate::sink::EventSink;
use crate::voice::Voice;

/// Candidate durations; the negative one is a rest.
pub const DURATIONS: [i64; 4] = [HALF, QUARTER, EIGHTH, -EIGHTH];

const MAJOR: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];
const MINOR: [i32; 7] = [0, 2, 3, 5, 7, 8, 10];

/// Largest jump along the ladder between consecutive notes.
const MAX_STEP: u32 = 7;

/// Lowest octave of the ladder; it spans twelve octaves from here.
const LADDER_BASE_OCTAVE: i32 = -1;

/// Scale pitches over twelve octaves. Some lie outside 0..=127; the voice's
/// pitch range folds them back in.
pub fn scale_ladder(tonic: i32, minor: bool) -> Vec<i32> {
    let intervals = if minor { MINOR } else { MAJOR };
    (LADDER_BASE_OCTAVE..LADDER_BASE_OCTAVE + 12)
        .flat_map(|octave| intervals.iter().map(move |i| octave * 12 + tonic + i))
        .collect()
}

/// Where on the ladder the next note starts from.
fn ladder_index(ladder: &[i32], voice: &Voice) -> usize {
    let top = ladder.len() - 1;
    match voice.prev_pitch {
        Some(prev) => ladder
            .iter()
            .position(|&p| p == prev)
            .or_else(|| ladder.iter().position(|&p| p > prev))
            .unwrap_or(top),
        // The tonic in the voice's octave.
        None => (((voice.octave - LADDER_BASE_OCTAVE) * MAJOR.len() as i32).max(0) as usize).min(top),
    }
}

pub fn make_bar(
    ctx: &mut InterpreterContext,
    bar_info: &mut BarInfo,
    voice: &mut Voice,
    sink: &mut dyn EventSink,
) -> Result<()> {
    let bar_end = bar_info.bar_end();
    bar_info.position = bar_info.start + voice.overlap;
    // A carry longer than this bar passes on to the next one.
    voice.overlap = (bar_info.position - bar_end).max(0);
    let mut current: Option<String> = None;
    let mut ladder: Vec<i32> = Vec::new();

    while bar_info.in_bar() {
        let chord = bar_info.get_chord();
        if current.as_deref() != Some(chord.as_str()) {
            let tonic = bar_info.get_tonic_offset(ctx.resolver.as_ref())?;
            ladder = scale_ladder(tonic, chord.contains("min"));
            current = Some(chord);
        }

        let from = ladder_index(&ladder, voice) as i64;
        let index = ctx.melody.add_error(from, MAX_STEP, 0).min(ladder.len() as i64 - 1) as usize;
        let pitch = voice.constrain_pitch(ladder[index]);
        voice.prev_pitch = Some(pitch);

        let repeat = ctx.preferences.improv_repeat;
        let mut duration = if voice.prev_duration > 0 && ctx.melody.rando().test(repeat) {
            voice.prev_duration
        } else {
            let choice = DURATIONS[ctx.melody.rando().index(DURATIONS.len())];
            if choice < 0 {
                bar_info.position -= choice;
                continue;
            }
            choice
        };
        voice.prev_duration = duration;

        let remaining = bar_end - bar_info.position;
        if duration > remaining {
            if bar_info.bar.clip {
                duration = remaining;
            } else {
                voice.overlap = duration - remaining;
            }
        }
        let play_time = voice.adjust_duration(duration);
        sound(ctx, bar_info, voice, &[pitch], play_time, sink);
        bar_info.position += duration;
    }
    Ok(())
}
