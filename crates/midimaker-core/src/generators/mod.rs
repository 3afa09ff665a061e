//! Per-style bar generators.
//!
//! Each generator walks `bar_info.position` from the start of the current bar
//! to its end and emits notes for one voice:
//!
//! - [`bass`] - the tonic of the current chord, one note per rhythm slot
//! - [`rhythm`] - the full chord, one chord per rhythm slot
//! - [`arpeggio`] - chord tones bouncing up and down at the voice's rate
//! - [`improv`] - a random walk over the current scale
//! - [`percussion`] - the voice's drum, one hit per rhythm slot

pub mod arpeggio;
pub mod bass;
pub mod improv;
pub mod percussion;
pub mod rhythm;

use crate::bar_info::BarInfo;
use crate::error::Result;
use crate::interpreter::InterpreterContext;
use crate::sink::EventSink;
use crate::voice::{Style, Voice};

/// General MIDI controller numbers.
pub const CC_VIBRATO: u8 = 1;
pub const CC_PAN: u8 = 10;
pub const CC_REVERB: u8 = 91;
pub const CC_CHORUS: u8 = 93;

/// Generate one bar for `voice` according to its style.
pub fn make_bar(
    ctx: &mut InterpreterContext,
    bar_info: &mut BarInfo,
    voice: &mut Voice,
    sink: &mut dyn EventSink,
) -> Result<()> {
    match voice.style {
        Style::Arpeggio => arpeggio::make_bar(ctx, bar_info, voice, sink),
        Style::Bass => bass::make_bar(ctx, bar_info, voice, sink),
        Style::Improv => improv::make_bar(ctx, bar_info, voice, sink),
        Style::Percussion => percussion::make_bar(ctx, bar_info, voice, sink),
        Style::Rhythm => rhythm::make_bar(ctx, bar_info, voice, sink),
        Style::Lead => Ok(()),
    }
}

/// Send a pan controller event if the pan envelope moved since the last one.
pub(crate) fn add_pan(
    ctx: &InterpreterContext,
    bar_info: &BarInfo,
    voice: &mut Voice,
    sink: &mut dyn EventSink,
) {
    let pan = ctx.pan.get_level(voice.track, bar_info.position);
    if pan != voice.pan {
        voice.pan = pan;
        sink.add_controller_event(voice.track, voice.channel, bar_info.position, CC_PAN, pan as u8);
    }
}

/// Sound `pitches` together at the cursor, at the volume envelope's level.
///
/// A clipped voice's note that fits in the bar stays in it after jitter.
pub(crate) fn sound(
    ctx: &mut InterpreterContext,
    bar_info: &BarInfo,
    voice: &mut Voice,
    pitches: &[i32],
    duration: i64,
    sink: &mut dyn EventSink,
) {
    let velocity = ctx.volume.get_level(voice.track, bar_info.position);
    add_pan(ctx, bar_info, voice, sink);
    let bar_end = bar_info.bar_end();
    let clip_end = (bar_info.clip(voice) && bar_info.position + duration <= bar_end).then_some(bar_end);
    let (start, duration) = ctx.humanize_timing(voice, bar_info.position, duration, clip_end);
    for &pitch in pitches {
        ctx.add_note(voice, pitch, start, duration, velocity, sink);
    }
}

/// Walk the voice's next rhythm pattern from the start of the bar.
///
/// Rests only move the cursor. For every sounding slot `play` is called with
/// the slot as written and the time it occupies in the bar, then the cursor
/// moves past it. The walk stops at the end of the bar.
pub(crate) fn walk_rhythm<F>(
    ctx: &mut InterpreterContext,
    bar_info: &mut BarInfo,
    voice: &mut Voice,
    sink: &mut dyn EventSink,
    mut play: F,
) -> Result<()>
where
    F: FnMut(&mut InterpreterContext, &BarInfo, &mut Voice, &mut dyn EventSink, i64, i64) -> Result<()>,
{
    bar_info.position = bar_info.start;
    for slot in voice.get_rhythm() {
        if bar_info.bar_ended() {
            break;
        }
        if slot < 0 {
            bar_info.position -= slot;
            continue;
        }
        let duration = bar_info.adjust_note_time(voice, slot);
        play(&mut *ctx, &*bar_info, &mut *voice, &mut *sink, slot, duration)?;
        bar_info.position += duration;
    }
    Ok(())
}
