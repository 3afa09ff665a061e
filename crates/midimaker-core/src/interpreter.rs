//! The composition interpreter.
//!
//! [`InterpreterContext::render`] walks a [`Composition`] once, front to
//! back, and sends every note and control event to an [`EventSink`]:
//!
//! - `Bar` items run each active voice's generator, then any queued tunes,
//!   then move to the next bar
//! - `Loop`/`Repeat` items move the instruction pointer
//! - every other item updates voice or envelope state for the bars after it
//!
//! All randomness comes from cursors seeded from [`Preferences::seed`] at the
//! start of each render, so rendering the same composition twice gives the
//! same events.

use crate::bar_info::BarInfo;
use crate::chords::{ChordResolver, ChordTable};
use crate::composition::{Composition, Effects, Item, Patch};
use crate::error::Result;
use crate::generators::{self, CC_CHORUS, CC_REVERB, CC_VIBRATO};
use crate::jitter::Jitter;
use crate::preferences::Preferences;
use crate::rando::Rando;
use crate::sink::EventSink;
use crate::timer::{make_in_range, LevelChange, Timer, MAX_LEVEL};
use crate::tune::Tune;
use crate::voice::{Voice, CENTER_PAN};

/// Tempo in force until the first `Tempo` item.
pub const DEFAULT_TEMPO: u32 = 120;

/// Distance between the melody and humanize cursors in the random table.
const HUMANIZE_SEED_OFFSET: u64 = 5_003;

/// What a render produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    /// Bars played, counting repeats.
    pub bars: usize,
    pub notes: usize,
    /// Tick just after the last bar.
    pub end_tick: i64,
}

/// An open `Loop`: where it is, and how many jumps back remain once its
/// `Repeat` has been seen.
#[derive(Debug, Clone, Copy)]
struct LoopFrame {
    index: usize,
    remaining: Option<u32>,
}

/// State shared by the generators during one render.
pub struct InterpreterContext {
    pub(crate) preferences: Preferences,
    pub(crate) resolver: Box<dyn ChordResolver>,
    /// Random walk and duration choices of improvised melodies.
    pub(crate) melody: Jitter,
    /// Start, length and velocity jitter of every note.
    pub(crate) humanize: Jitter,
    pub(crate) volume: Timer,
    pub(crate) pan: Timer,
    notes: usize,
}

impl InterpreterContext {
    /// Create a context using the built-in chord table.
    pub fn new(preferences: Preferences) -> Self {
        let volume = Timer::new("Volume", preferences.default_volume);
        let mut ctx = Self {
            preferences,
            resolver: Box::new(ChordTable),
            melody: Jitter::new(Rando::wrapping(0)),
            humanize: Jitter::new(Rando::wrapping(0)),
            volume,
            pan: Timer::new("Pan", CENTER_PAN),
            notes: 0,
        };
        ctx.reseed();
        ctx
    }

    /// Use another chord resolver.
    pub fn with_resolver(mut self, resolver: Box<dyn ChordResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    fn reseed(&mut self) {
        let seed = self.preferences.seed;
        self.melody = Jitter::new(Rando::wrapping(seed));
        self.humanize = Jitter::new(Rando::wrapping(seed.wrapping_add(HUMANIZE_SEED_OFFSET)));
    }

    /// Jitter the start and length of one sound.
    ///
    /// Every pitch of the sound shares the result. With `clip_end` the
    /// jittered note still ends by that tick.
    pub(crate) fn humanize_timing(
        &mut self,
        voice: &Voice,
        start: i64,
        duration: i64,
        clip_end: Option<i64>,
    ) -> (i64, i64) {
        let err_tim = voice.err_tim.unwrap_or(self.preferences.err_tim);
        let err_dur = voice.err_dur.unwrap_or(self.preferences.err_dur);

        let mut start = self.humanize.add_error(start, err_tim, 0);
        let mut duration = self.humanize.add_error(duration, err_dur, 1);
        if let Some(end) = clip_end {
            start = start.min(end - 1);
            duration = duration.min(end - start).max(1);
        }
        (start, duration)
    }

    /// Jitter the velocity of one note and send it to the sink.
    ///
    /// Jitter magnitudes come from the voice, falling back to the
    /// preferences. Pitch and velocity are clamped to 0..=127.
    pub(crate) fn add_note(
        &mut self,
        voice: &Voice,
        pitch: i32,
        start: i64,
        duration: i64,
        velocity: i32,
        sink: &mut dyn EventSink,
    ) {
        let err_vol = voice.err_vol.unwrap_or(self.preferences.err_vol);
        let velocity = self.humanize.add_error(velocity as i64, err_vol, 0) as i32;

        let pitch = make_in_range(pitch, MAX_LEVEL, "Pitch");
        let velocity = make_in_range(velocity, MAX_LEVEL, "Velocity");
        sink.add_note(voice.track, voice.channel, pitch as u8, start, duration, velocity as u8);
        self.notes += 1;
    }

    /// Render `composition` for `voices` into `sink`.
    ///
    /// Voices are referred to by index in `voices`; their state (rhythm
    /// cursor, effects, improv memory) is left as the last bar left it.
    ///
    /// # Panics
    ///
    /// Panics if a played bar has no chord in force at a position where a
    /// generator needs one.
    pub fn render(
        &mut self,
        voices: &mut [Voice],
        composition: &Composition,
        sink: &mut dyn EventSink,
    ) -> Result<RenderSummary> {
        self.volume.reset();
        self.pan.reset();
        self.reseed();
        self.notes = 0;

        self.setup(voices, sink);

        let items = &composition.items;
        let mut bar_info = BarInfo::new();
        let mut tunes: Vec<Tune> = Vec::new();
        let mut loops: Vec<LoopFrame> = Vec::new();
        let mut skipping = false;
        let mut bars = 0;
        let mut index = 0;

        while index < items.len() {
            match &items[index] {
                Item::Bar(bar) => {
                    if skipping {
                        log::debug!("Skipping bar at item {}", index);
                    } else {
                        bar_info.bar = bar.clone();
                        for _ in 0..bar.repeat {
                            for voice in voices.iter_mut() {
                                if voice.active {
                                    generators::make_bar(self, &mut bar_info, voice, sink)?;
                                }
                            }
                            for tune in &tunes {
                                tune.play(self, &mut bar_info, voices, sink);
                            }
                            bar_info.advance();
                            bars += 1;
                        }
                    }
                }
                Item::Beat { voices: targets, rhythms } => {
                    for voice in select(voices, targets) {
                        voice.set_rhythms(rhythms.clone());
                    }
                }
                Item::Effects(effects) => {
                    for voice in select(voices, &effects.voices) {
                        apply_effects(effects, voice, bar_info.start, sink);
                    }
                }
                Item::Loop => loops.push(LoopFrame {
                    index,
                    remaining: None,
                }),
                Item::Repeat(count) => match loops.last_mut() {
                    None => log::warn!("Repeat at item {} has no matching loop", index),
                    Some(frame) => {
                        let remaining = frame.remaining.get_or_insert(count.saturating_sub(1));
                        if *remaining > 0 {
                            *remaining -= 1;
                            index = frame.index;
                        } else {
                            loops.pop();
                        }
                    }
                },
                Item::Mute { voices: targets, muted } => {
                    for voice in select(voices, targets) {
                        voice.active = !muted;
                    }
                }
                Item::Play(play) => tunes.push(Tune::new(play, bar_info.start)),
                Item::Skip(skip) => skipping = *skip,
                Item::Tempo(bpm) => sink.add_tempo(0, bar_info.start, *bpm),
                Item::TimeSig(timesig) => bar_info.timesig = *timesig,
                Item::Volume(volume) => {
                    let tick = bar_info.start + volume.start;
                    for voice in select(voices, &volume.voices) {
                        self.volume.set_level(voice.track, tick, volume.change, volume.rate);
                    }
                }
                Item::Pan(pan) => {
                    for voice in select(voices, &pan.voices) {
                        self.pan.set_level(voice.track, bar_info.start, pan.change, pan.rate);
                    }
                }
            }
            index += 1;
        }

        if !loops.is_empty() {
            log::warn!("{} loop(s) never repeated", loops.len());
        }

        let summary = RenderSummary {
            bars,
            notes: self.notes,
            end_tick: bar_info.start,
        };
        log::info!(
            "Rendered {} bars, {} notes, {} ticks",
            summary.bars,
            summary.notes,
            summary.end_tick
        );
        Ok(summary)
    }

    /// Tempo, track names, programs and starting envelope levels.
    fn setup(&mut self, voices: &[Voice], sink: &mut dyn EventSink) {
        sink.add_tempo(0, 0, DEFAULT_TEMPO);
        let default_volume = self.preferences.default_volume;
        for voice in voices {
            sink.add_track_name(voice.track, 0, &voice.name);
            if !voice.is_percussion() {
                sink.add_program_change(voice.track, voice.channel, 0, voice.program);
            }
            self.volume
                .set_level(voice.track, 0, LevelChange::Absolute(default_volume), 0);
            self.pan
                .set_level(voice.track, 0, LevelChange::Absolute(CENTER_PAN), 0);
        }
    }
}

/// The voices at `targets`, skipping indices that do not exist.
fn select<'a>(voices: &'a mut [Voice], targets: &'a [usize]) -> impl Iterator<Item = &'a mut Voice> {
    let count = voices.len();
    for &target in targets.iter().filter(|&&t| t >= count) {
        log::warn!("No voice with index {}", target);
    }
    voices
        .iter_mut()
        .enumerate()
        .filter(move |(i, _)| targets.contains(i))
        .map(|(_, voice)| voice)
}

fn apply_effects(effects: &Effects, voice: &mut Voice, tick: i64, sink: &mut dyn EventSink) {
    effects.duration_effect.apply(&mut voice.duration_effect);
    effects.clip.apply_or(&mut voice.clip, true);
    effects.octave.apply_or(&mut voice.octave, voice.style.default_octave());
    effects.rate.apply_or(&mut voice.rate, voice.style.default_rate());
    effects.chord_duration.apply(&mut voice.chord_duration);
    effects.err_tim.apply(&mut voice.err_tim);
    effects.err_dur.apply(&mut voice.err_dur);
    effects.err_vol.apply(&mut voice.err_vol);

    let (track, channel) = (voice.track, voice.channel);
    for (patch, current, controller) in [
        (effects.vibrato, &mut voice.vibrato, CC_VIBRATO),
        (effects.reverb, &mut voice.reverb, CC_REVERB),
        (effects.chorus, &mut voice.chorus, CC_CHORUS),
    ] {
        set_controller(patch, current, |value| {
            sink.add_controller_event(track, channel, tick, controller, value)
        });
    }
}

/// Apply a controller patch, calling `send` only when the value changes.
fn set_controller(patch: Patch<u8>, current: &mut u8, send: impl FnOnce(u8)) {
    let mut value = *current;
    patch.apply_or(&mut value, 0);
    let value = value.min(127);
    if value != *current {
        *current = value;
        send(value);
    }
}
