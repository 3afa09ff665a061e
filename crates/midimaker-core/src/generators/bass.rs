//! Bass lines: the tonic of the chord in force, in the voice's octave.

use super::{sound, walk_rhythm};
use crate::bar_info::BarInfo;
use crate::error::Result;
use crate::interpreter::InterpreterContext;
use crate::sink::EventSink;
use crate::voice::Voice;

pub fn make_bar(
    ctx: &mut InterpreterContext,
    bar_info: &mut BarInfo,
    voice: &mut Voice,
    sink: &mut dyn EventSink,
) -> Result<()> {
    walk_rhythm(ctx, bar_info, voice, sink, |ctx, bar_info, voice, sink, _slot, duration| {
        let interval = ctx.resolver.note_to_interval(bar_info.get_tonic())?;
        let pitch = voice.constrain_pitch(interval + voice.octave * 12);
        let play_time = bar_info.adjust_play_time(voice, duration);
        sound(ctx, bar_info, voice, &[pitch], play_time, sink);
        Ok(())
    })
}
