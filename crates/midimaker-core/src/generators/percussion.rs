//! Percussion: the voice's drum note on every sounding rhythm slot.

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
        let drum = voice.program as i32;
        let play_time = bar_info.adjust_play_time(voice, duration);
        sound(ctx, bar_info, voice, &[drum], play_time, sink);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::test_support::{bar_info, context};
    use crate::sink::RecordingSink;
    use crate::voice::{Style, PERCUSSION_CHANNEL};

    #[test]
    fn test_hits_drum_on_percussion_channel() {
        let mut ctx = context();
        let mut info = bar_info(&[(0, "C", "maj")]);
        let mut drum = Voice::new("kick", 2, PERCUSSION_CHANNEL, 36, Style::Percussion);
        drum.set_rhythms(vec![vec![960, -960, 960, -960]]);
        let mut sink = RecordingSink::new();
        make_bar(&mut ctx, &mut info, &mut drum, &mut sink).unwrap();

        let notes = sink.notes();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|n| n.pitch == 36 && n.channel == 9 && n.track == 2));
        assert_eq!(notes[1].start, 1920);
    }

    #[test]
    fn test_extra_slots_past_bar_end_dropped() {
        let mut ctx = context();
        let mut info = bar_info(&[(0, "C", "maj")]);
        let mut drum = Voice::new("hat", 0, PERCUSSION_CHANNEL, 42, Style::Percussion);
        drum.set_rhythms(vec![vec![960; 8]]);
        let mut sink = RecordingSink::new();
        make_bar(&mut ctx, &mut info, &mut drum, &mut sink).unwrap();
        assert_eq!(sink.notes().len(), 4);
    }
}
