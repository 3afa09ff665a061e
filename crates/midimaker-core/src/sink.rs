//! Where rendered events go.
//!
//! The interpreter never builds MIDI bytes itself; it calls an [`EventSink`].
//! Pitches, velocities and controller values are already clamped to 0..=127
//! and ticks are never negative by the time they reach a sink.
//!
//! - [`RecordingSink`] - keeps every call in order, for tests and inspection
//! - [`crate::midi_file::MidiFileSink`] - builds a Standard MIDI File

/// Receiver of rendered note and control events.
pub trait EventSink {
    fn add_note(&mut self, track: usize, channel: u8, pitch: u8, start: i64, duration: i64, velocity: u8);

    fn add_tempo(&mut self, track: usize, tick: i64, bpm: u32);

    fn add_program_change(&mut self, track: usize, channel: u8, tick: i64, program: u8);

    fn add_controller_event(&mut self, track: usize, channel: u8, tick: i64, controller: u8, value: u8);

    fn add_track_name(&mut self, track: usize, tick: i64, name: &str);
}

/// A note as received by a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub track: usize,
    pub channel: u8,
    pub pitch: u8,
    pub start: i64,
    pub duration: i64,
    pub velocity: u8,
}

impl NoteEvent {
    pub fn end(&self) -> i64 {
        self.start + self.duration
    }
}

/// One recorded sink call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Note(NoteEvent),
    Tempo {
        track: usize,
        tick: i64,
        bpm: u32,
    },
    ProgramChange {
        track: usize,
        channel: u8,
        tick: i64,
        program: u8,
    },
    Controller {
        track: usize,
        channel: u8,
        tick: i64,
        controller: u8,
        value: u8,
    },
    TrackName {
        track: usize,
        tick: i64,
        name: String,
    },
}

/// Records sink calls in the order they were made.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the notes, in call order.
    pub fn notes(&self) -> Vec<NoteEvent> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Note(note) => Some(*note),
                _ => None,
            })
            .collect()
    }

    /// Notes of one track, in call order.
    pub fn track_notes(&self, track: usize) -> Vec<NoteEvent> {
        self.notes().into_iter().filter(|n| n.track == track).collect()
    }

    /// `(tick, controller, value)` of every controller event on `track`.
    pub fn controllers(&self, track: usize) -> Vec<(i64, u8, u8)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Controller {
                    track: t,
                    tick,
                    controller,
                    value,
                    ..
                } if *t == track => Some((*tick, *controller, *value)),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn add_note(&mut self, track: usize, channel: u8, pitch: u8, start: i64, duration: i64, velocity: u8) {
        self.events.push(SinkEvent::Note(NoteEvent {
            track,
            channel,
            pitch,
            start,
            duration,
            velocity,
        }));
    }

    fn add_tempo(&mut self, track: usize, tick: i64, bpm: u32) {
        self.events.push(SinkEvent::Tempo { track, tick, bpm });
    }

    fn add_program_change(&mut self, track: usize, channel: u8, tick: i64, program: u8) {
        self.events.push(SinkEvent::ProgramChange {
            track,
            channel,
            tick,
            program,
        });
    }

    fn add_controller_event(&mut self, track: usize, channel: u8, tick: i64, controller: u8, value: u8) {
        self.events.push(SinkEvent::Controller {
            track,
            channel,
            tick,
            controller,
            value,
        });
    }

    fn add_track_name(&mut self, track: usize, tick: i64, name: &str) {
        self.events.push(SinkEvent::TrackName {
            track,
            tick,
            name: name.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_keeps_call_order() {
        let mut sink = RecordingSink::new();
        sink.add_tempo(0, 0, 120);
        sink.add_note(1, 2, 60, 0, 960, 100);
        sink.add_controller_event(1, 2, 0, 10, 32);
        sink.add_note(0, 0, 48, 960, 480, 90);

        assert_eq!(sink.events.len(), 4);
        assert!(matches!(sink.events[0], SinkEvent::Tempo { bpm: 120, .. }));
        let notes = sink.notes();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].pitch, 60);
        assert_eq!(notes[1].end(), 1440);
        assert_eq!(sink.track_notes(0).len(), 1);
        assert_eq!(sink.controllers(1), vec![(0, 10, 32)]);
    }
}
