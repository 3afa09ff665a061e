//! Arpeggios: chord tones in a rising and falling pattern.
//!
//! One note every `voice.rate` ticks. The index bounces between the lowest
//! and highest chord tone (0, 1, 2, 1, 0, 1, ...) and restarts at the bottom
//! whenever the chord changes.

use super::sound;
use crate::bar_info::BarInfo;
use crate::error::Result;
use crate::interpreter::InterpreterContext;
use crate::sink::EventSink;
use crate::voice::Voice;

/// Next index of a bouncing walk over `len` items.
fn bounce(index: usize, len: usize, rising: &mut bool) -> usize {
    if len < 2 {
        return 0;
    }
    if index == 0 {
        *rising = true;
    } else if index == len - 1 {
        *rising = false;
    }
    if *rising {
        index + 1
    } else {
        index - 1
    }
}

pub fn make_bar(
    ctx: &mut InterpreterContext,
    bar_info: &mut BarInfo,
    voice: &mut Voice,
    sink: &mut dyn EventSink,
) -> Result<()> {
    bar_info.position = bar_info.start;
    let mut current: Option<String> = None;
    let mut pitches: Vec<i32> = Vec::new();
    let mut index = 0;
    let mut rising = true;

    while bar_info.in_bar() {
        let chord = bar_info.get_chord();
        if current.as_deref() != Some(chord.as_str()) {
            pitches = ctx.resolver.chord_to_pitches(&chord, voice.octave)?;
            current = Some(chord);
            index = 0;
            rising = true;
        }
        let duration = bar_info.adjust_note_time(voice, voice.rate.max(0));
        let play_time = bar_info.adjust_play_time(voice, duration);
        let pitch = voice.constrain_pitch(pitches[index]);
        sound(ctx, bar_info, voice, &[pitch], play_time, sink);
        index = bounce(index, pitches.len(), &mut rising);
        bar_info.position += duration;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::{EIGHTH, QUARTER};
    use crate::generators::test_support::{bar_info, context, voice};
    use crate::sink::RecordingSink;
    use crate::voice::Style;

    #[test]
    fn test_bounce_is_triangle() {
        let mut rising = true;
        let mut index = 0;
        let mut seen = vec![index];
        for _ in 0..8 {
            index = bounce(index, 3, &mut rising);
            seen.push(index);
        }
        assert_eq!(seen, vec![0, 1, 2, 1, 0, 1, 2, 1, 0]);
        assert_eq!(bounce(0, 1, &mut rising), 0);
    }

    #[test]
    fn test_arpeggio_over_one_chord() {
        let mut ctx = context();
        let mut info = bar_info(&[(0, "C", "maj")]);
        let mut arp = voice(Style::Arpeggio);
        let mut sink = RecordingSink::new();
        make_bar(&mut ctx, &mut info, &mut arp, &mut sink).unwrap();

        let notes = sink.notes();
        let pitches: Vec<u8> = notes.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![48, 52, 55, 52]);
        assert!(notes.iter().all(|n| n.duration == QUARTER));
    }

    #[test]
    fn test_restarts_on_chord_change() {
        let mut ctx = context();
        let mut info = bar_info(&[(0, "C", "maj"), (3 * EIGHTH, "F", "maj")]);
        let mut arp = voice(Style::Arpeggio);
        arp.rate = EIGHTH;
        let mut sink = RecordingSink::new();
        make_bar(&mut ctx, &mut info, &mut arp, &mut sink).unwrap();

        let pitches: Vec<u8> = sink.notes().iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![48, 52, 55, 53, 57, 60, 57, 53]);
    }
}
