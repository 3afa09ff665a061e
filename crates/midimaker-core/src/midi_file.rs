//! Standard MIDI File output.
//!
//! Output is SMF format 1. Track 0 is the conductor track holding tempo
//! changes; sink track `n` becomes file track `n + 1`. Notes are stored as
//! NoteOn/NoteOff pairs, sorted by absolute tick with NoteOffs first at equal
//! ticks so a repeated pitch is released before it is struck again.

use crate::duration::TICKS_PER_QUARTER;
use crate::error::Result;
use crate::sink::EventSink;
use midly::{
    num::{u15, u24, u28, u4, u7},
    Format, Header, MetaMessage, MidiMessage, Smf, Track, TrackEvent, TrackEventKind,
};
use std::path::Path;

const MAX_DELTA: u32 = 0x0FFF_FFFF;

#[derive(Debug, Clone)]
enum Pending {
    NoteOff { channel: u8, key: u8 },
    Name(String),
    Tempo(u32),
    Program { channel: u8, program: u8 },
    Controller { channel: u8, controller: u8, value: u8 },
    NoteOn { channel: u8, key: u8, velocity: u8 },
}

impl Pending {
    /// Order among events sharing a tick.
    fn rank(&self) -> u8 {
        match self {
            Pending::NoteOff { .. } => 0,
            Pending::Name(_) | Pending::Tempo(_) => 1,
            Pending::Program { .. } => 2,
            Pending::Controller { .. } => 3,
            Pending::NoteOn { .. } => 4,
        }
    }

    fn kind(&self) -> TrackEventKind<'_> {
        let midi = |channel: u8, message| TrackEventKind::Midi {
            channel: u4::new(channel.min(15)),
            message,
        };
        match self {
            Pending::NoteOff { channel, key } => midi(
                *channel,
                MidiMessage::NoteOff {
                    key: u7::new((*key).min(127)),
                    vel: u7::new(0),
                },
            ),
            Pending::NoteOn { channel, key, velocity } => midi(
                *channel,
                MidiMessage::NoteOn {
                    key: u7::new((*key).min(127)),
                    vel: u7::new((*velocity).min(127)),
                },
            ),
            Pending::Program { channel, program } => midi(
                *channel,
                MidiMessage::ProgramChange {
                    program: u7::new((*program).min(127)),
                },
            ),
            Pending::Controller {
                channel,
                controller,
                value,
            } => midi(
                *channel,
                MidiMessage::Controller {
                    controller: u7::new((*controller).min(127)),
                    value: u7::new((*value).min(127)),
                },
            ),
            Pending::Name(name) => TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
            Pending::Tempo(micros) => {
                TrackEventKind::Meta(MetaMessage::Tempo(u24::new((*micros).min(0x00FF_FFFF))))
            }
        }
    }
}

/// An [`EventSink`] that assembles a Standard MIDI File in memory.
#[derive(Debug, Clone)]
pub struct MidiFileSink {
    /// Index 0 is the conductor track.
    tracks: Vec<Vec<(u32, Pending)>>,
}

impl Default for MidiFileSink {
    fn default() -> Self {
        Self::new(0)
    }
}

impl MidiFileSink {
    /// Create a file with `voice_tracks` voice tracks after the conductor.
    pub fn new(voice_tracks: usize) -> Self {
        Self {
            tracks: vec![Vec::new(); voice_tracks + 1],
        }
    }

    fn push(&mut self, file_track: usize, tick: i64, event: Pending) {
        if self.tracks.len() <= file_track {
            self.tracks.resize(file_track + 1, Vec::new());
        }
        let tick = tick.clamp(0, MAX_DELTA as i64) as u32;
        self.tracks[file_track].push((tick, event));
    }

    /// Build the file structure. Borrows track names from `self`.
    pub fn to_smf(&self) -> Smf<'_> {
        let mut smf = Smf::new(Header::new(
            Format::Parallel,
            midly::Timing::Metrical(u15::new(TICKS_PER_QUARTER as u16)),
        ));
        for events in &self.tracks {
            let mut order: Vec<&(u32, Pending)> = events.iter().collect();
            order.sort_by_key(|(tick, event)| (*tick, event.rank()));

            let mut track: Track<'_> = Vec::with_capacity(order.len() + 1);
            let mut last_tick = 0;
            for (tick, event) in order {
                track.push(TrackEvent {
                    delta: u28::new((tick - last_tick).min(MAX_DELTA)),
                    kind: event.kind(),
                });
                last_tick = *tick;
            }
            track.push(TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
            });
            smf.tracks.push(track);
        }
        smf
    }

    /// Serialize to SMF bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.to_smf().write_std(&mut buf)?;
        Ok(buf)
    }

    /// Write the file to `path`.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)?;
        log::info!(
            "Wrote {} tracks to {}",
            self.tracks.len(),
            path.as_ref().display()
        );
        Ok(())
    }
}

impl EventSink for MidiFileSink {
    fn add_note(&mut self, track: usize, channel: u8, pitch: u8, start: i64, duration: i64, velocity: u8) {
        let end = start + duration.max(1);
        self.push(
            track + 1,
            start,
            Pending::NoteOn {
                channel,
                key: pitch,
                velocity,
            },
        );
        self.push(track + 1, end, Pending::NoteOff { channel, key: pitch });
    }

    fn add_tempo(&mut self, _track: usize, tick: i64, bpm: u32) {
        let micros = 60_000_000 / bpm.max(1);
        self.push(0, tick, Pending::Tempo(micros));
    }

    fn add_program_change(&mut self, track: usize, channel: u8, tick: i64, program: u8) {
        self.push(track + 1, tick, Pending::Program { channel, program });
    }

    fn add_controller_event(&mut self, track: usize, channel: u8, tick: i64, controller: u8, value: u8) {
        self.push(
            track + 1,
            tick,
            Pending::Controller {
                channel,
                controller,
                value,
            },
        );
    }

    fn add_track_name(&mut self, track: usize, tick: i64, name: &str) {
        self.push(track + 1, tick, Pending::Name(name.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn midi_events(track: &Track<'_>) -> Vec<(u32, MidiMessage)> {
        let mut tick = 0;
        let mut out = Vec::new();
        for event in track {
            tick += event.delta.as_int();
            if let TrackEventKind::Midi { message, .. } = &event.kind {
                out.push((tick, *message));
            }
        }
        out
    }

    #[test]
    fn test_track_layout() {
        let mut sink = MidiFileSink::new(2);
        sink.add_tempo(0, 0, 120);
        sink.add_track_name(0, 0, "bass");
        sink.add_note(1, 1, 60, 0, 480, 100);

        let smf = sink.to_smf();
        assert_eq!(smf.tracks.len(), 3);
        assert!(matches!(
            smf.tracks[0][0].kind,
            TrackEventKind::Meta(MetaMessage::Tempo(t)) if t.as_int() == 500_000
        ));
        assert!(matches!(
            smf.tracks[1][0].kind,
            TrackEventKind::Meta(MetaMessage::TrackName(b"bass"))
        ));
        assert_eq!(midi_events(&smf.tracks[2]).len(), 2);
        for track in &smf.tracks {
            assert!(matches!(
                track.last().unwrap().kind,
                TrackEventKind::Meta(MetaMessage::EndOfTrack)
            ));
        }
    }

    #[test]
    fn test_note_off_precedes_note_on_at_same_tick() {
        let mut sink = MidiFileSink::new(1);
        sink.add_note(0, 0, 60, 0, 960, 100);
        sink.add_note(0, 0, 60, 960, 960, 100);

        let smf = sink.to_smf();
        let events = midi_events(&smf.tracks[1]);
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], (0, MidiMessage::NoteOn { .. })));
        assert!(matches!(events[1], (960, MidiMessage::NoteOff { .. })));
        assert!(matches!(events[2], (960, MidiMessage::NoteOn { .. })));
        assert!(matches!(events[3], (1920, MidiMessage::NoteOff { .. })));
    }

    #[test]
    fn test_events_sorted_by_tick() {
        let mut sink = MidiFileSink::new(1);
        sink.add_note(0, 0, 64, 1000, 100, 90);
        sink.add_note(0, 0, 60, 0, 100, 90);
        sink.add_controller_event(0, 0, 500, 10, 20);

        let smf = sink.to_smf();
        let ticks: Vec<u32> = midi_events(&smf.tracks[1]).iter().map(|(t, _)| *t).collect();
        assert_eq!(ticks, vec![0, 100, 500, 1000, 1100]);
    }

    #[test]
    fn test_write_and_parse_back() {
        let mut sink = MidiFileSink::new(1);
        sink.add_tempo(0, 0, 90);
        sink.add_program_change(0, 0, 0, 32);
        sink.add_note(0, 0, 36, 0, 960, 100);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mid");
        sink.write(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.header.format, Format::Parallel);
        assert_eq!(smf.header.timing, midly::Timing::Metrical(u15::new(960)));
        assert_eq!(smf.tracks.len(), 2);
        assert_eq!(midi_events(&smf.tracks[1]).len(), 3);
    }
}
