//! midimaker core - turns chord-based compositions into MIDI.
//!
//! This crate provides the building blocks of midimaker:
//!
//! - **Score** - TOML score documents and their text notations
//! - **Composition** - The flat list of bars and directives to perform
//! - **Voices** - Instruments with a performance style and effects
//! - **Generators** - Bass, rhythm, arpeggio, improv and percussion bars
//! - **Interpreter** - Walks a composition, handling loops, volume and pan
//! - **MIDI** - Event sinks, including a Standard MIDI File writer
//!
//! # Architecture
//!
//! A [`Score`] resolves into a [`Performance`]: voices plus a
//! [`Composition`] whose items refer to voices by index. The
//! [`InterpreterContext`] renders it bar by bar through the style's
//! generator into an [`EventSink`]. All randomness comes from a fixed table
//! indexed by seed, so the same score and preferences always give the same
//! file.
//!
//! ```no_run
//! use midimaker_core::{InterpreterContext, MidiFileSink, Preferences, Score};
//!
//! # fn main() -> midimaker_core::Result<()> {
//! let score = Score::from_path("song.toml")?;
//! let preferences = score.preferences(&Preferences::load_or_default())?;
//! let mut performance = score.resolve("", &preferences)?;
//! let mut sink = MidiFileSink::new(performance.voices.len());
//! InterpreterContext::new(preferences).render(
//!     &mut performance.voices,
//!     &performance.composition,
//!     &mut sink,
//! )?;
//! sink.write("song.mid")?;
//! # Ok(())
//! # }
//! ```

pub mod bar_info;
pub mod chords;
pub mod composition;
pub mod duration;
pub mod error;
pub mod generators;
pub mod interpreter;
pub mod jitter;
pub mod midi_file;
pub mod preferences;
pub mod progression;
pub mod rando;
pub mod rhythm;
pub mod score;
pub mod sink;
pub mod timer;
pub mod tune;
pub mod voice;

pub use chords::{ChordResolver, ChordTable};
pub use composition::{Bar, ChordChange, Composition, Effects, Item, Patch, TimeSig};
pub use error::{Error, Result};
pub use interpreter::{InterpreterContext, RenderSummary};
pub use midi_file::MidiFileSink;
pub use preferences::Preferences;
pub use score::{Performance, Score};
pub use sink::{EventSink, NoteEvent, RecordingSink, SinkEvent};
pub use voice::{Style, Voice};
