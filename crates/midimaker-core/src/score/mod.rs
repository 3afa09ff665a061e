//! Score documents.
//!
//! A score is a TOML document holding everything a piece needs: voices,
//! named rhythms, tunes and volume levels, one or more compositions made of
//! commands, and opuses that chain compositions together.
//!
//! ```toml
//! [[voice]]
//! name = "bass"
//! style = "bass"
//! program = "acoustic_bass"
//!
//! [rhythm.walk]
//! durations = "q, q, -e, e, q"
//!
//! [[composition]]
//! name = "verse"
//! commands = [
//!     { cmd = "beat", voices = "bass", rhythms = "walk" },
//!     { cmd = "bar", chords = "hC, hG7", repeat = 2 },
//! ]
//! ```
//!
//! [`Score::resolve`] turns names into indices and text into ticks and
//! pitches. A directive that cannot be resolved is logged and skipped; the
//! rest of the score still renders.

pub mod instruments;
pub mod notation;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::composition::{
    Bar, ChordChange, Composition, Effects, Item, Pan, Patch, Play, TuneNote, Volume,
};
use crate::duration::{parse_duration, parse_durations};
use crate::error::{Error, Result};
use crate::preferences::Preferences;
use crate::progression::improvise_bars;
use crate::rando::TABLE_SIZE;
use crate::rhythm::{parse_weights, random_rhythm};
use crate::timer::{make_in_range, LevelChange, MAX_LEVEL};
use crate::voice::{Adjust, ChannelAllocator, DurationEffect, Rhythm, Style, Voice};
use notation::{parse_bar_chords, parse_level, parse_opus, parse_timesig, parse_tune};

/// Named dynamics available in every score.
pub const DYNAMICS: [(&str, i32); 8] = [
    ("ppp", 20),
    ("pp", 35),
    ("p", 50),
    ("mp", 65),
    ("mf", 80),
    ("f", 95),
    ("ff", 110),
    ("fff", 127),
];

/// A number, or a name to look up.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NameOrNumber {
    Number(i64),
    Name(String),
}

/// One voice name or several; a single string may be comma separated.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NameList {
    One(String),
    Many(Vec<String>),
}

impl Default for NameList {
    fn default() -> Self {
        NameList::Many(Vec::new())
    }
}

impl NameList {
    pub fn names(&self) -> Vec<&str> {
        let list: Vec<&str> = match self {
            NameList::One(text) => text.split(',').collect(),
            NameList::Many(names) => names.iter().map(String::as_str).collect(),
        };
        list.into_iter()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VoiceDef {
    pub name: String,
    #[serde(default)]
    pub style: Option<String>,
    /// GM program (name or 1-based number), or drum (name or note) for
    /// percussion.
    #[serde(default)]
    pub program: Option<NameOrNumber>,
    #[serde(default)]
    pub min_pitch: Option<i32>,
    #[serde(default)]
    pub max_pitch: Option<i32>,
}

/// A fixed rhythm (`durations = "q,-e,e"`) or, with a `seed`, a random one
/// drawn from weights (`durations = "q:3,e:2"`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RhythmDef {
    pub durations: String,
    #[serde(default)]
    pub seed: Option<usize>,
    #[serde(default)]
    pub rest: Option<f64>,
    #[serde(default)]
    pub repeat: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TuneDef {
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompositionDef {
    pub name: String,
    /// Kept as raw tables so one bad command does not reject the document.
    #[serde(default)]
    pub commands: Vec<toml::Table>,
}

/// A parsed score document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Score {
    /// Overrides for [`Preferences`].
    #[serde(default)]
    pub preferences: toml::Table,
    #[serde(default, rename = "voice")]
    pub voices: Vec<VoiceDef>,
    #[serde(default, rename = "rhythm")]
    pub rhythms: BTreeMap<String, RhythmDef>,
    #[serde(default, rename = "tune")]
    pub tunes: BTreeMap<String, TuneDef>,
    #[serde(default)]
    pub volume_names: BTreeMap<String, NameOrNumber>,
    #[serde(default, rename = "composition")]
    pub compositions: Vec<CompositionDef>,
    /// Opus name to parts, e.g. `"intro, verse*2"`.
    #[serde(default, rename = "opus")]
    pub opuses: BTreeMap<String, String>,
}

/// Voices and the flat command list, ready to render.
#[derive(Debug, Clone)]
pub struct Performance {
    pub voices: Vec<Voice>,
    pub composition: Composition,
}

impl FromStr for Score {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

impl Score {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        content.parse()
    }

    /// `base` with this score's `[preferences]` applied.
    pub fn preferences(&self, base: &Preferences) -> Result<Preferences> {
        base.merged(&self.preferences)
    }

    pub fn composition_names(&self) -> Vec<&str> {
        self.compositions.iter().map(|c| c.name.as_str()).collect()
    }

    /// Resolve the opus or composition `name` into a performance.
    ///
    /// An empty name, or one that matches nothing, selects the first
    /// composition.
    pub fn resolve(&self, name: &str, preferences: &Preferences) -> Result<Performance> {
        let work = self.get_work(name)?;
        let mut resolver = Resolver::new(self, preferences);
        let mut composition = Composition::new();
        for part in work {
            log::debug!("Resolving composition '{}'", part.name);
            for table in &part.commands {
                resolver.add_command(table, &mut composition);
            }
        }
        Ok(Performance {
            voices: resolver.voices,
            composition,
        })
    }

    fn find_composition(&self, name: &str) -> Option<&CompositionDef> {
        self.compositions.iter().find(|c| c.name == name)
    }

    fn get_work(&self, name: &str) -> Result<Vec<&CompositionDef>> {
        if !name.is_empty() {
            if let Some(opus) = self.opuses.get(name) {
                let mut work = Vec::new();
                for (part, count) in parse_opus(opus)? {
                    match self.find_composition(&part) {
                        Some(composition) => {
                            work.extend(std::iter::repeat(composition).take(count as usize))
                        }
                        None => log::warn!("Opus '{}' names unknown composition '{}'", name, part),
                    }
                }
                return Ok(work);
            }
            if let Some(composition) = self.find_composition(name) {
                return Ok(vec![composition]);
            }
            log::error!("No composition or opus named '{}'; using the first", name);
        }
        self.compositions
            .first()
            .map(|c| vec![c])
            .ok_or_else(|| Error::UnknownComposition(name.to_string()))
    }
}

/// A composition command as written.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
enum Command {
    Bar {
        chords: String,
        #[serde(default = "one")]
        repeat: u32,
        #[serde(default = "yes")]
        clip: bool,
        #[serde(default)]
        seed: Option<usize>,
    },
    Beat {
        voices: NameList,
        rhythms: NameList,
    },
    Effects(EffectsDef),
    Loop,
    Repeat {
        #[serde(default)]
        count: Option<i64>,
    },
    Mute {
        voices: NameList,
    },
    Hear {
        voices: NameList,
    },
    Play {
        voice: String,
        tunes: String,
        #[serde(default)]
        transpose: i32,
    },
    Tempo {
        bpm: u32,
    },
    Timesig {
        value: String,
    },
    Volume {
        voices: NameList,
        level: NameOrNumber,
        #[serde(default)]
        start: Option<i64>,
        #[serde(default)]
        rate: u32,
    },
    Pan {
        voices: NameList,
        position: NameOrNumber,
        #[serde(default)]
        rate: u32,
    },
    Skip,
    Unskip,
}

fn one() -> u32 {
    1
}

fn yes() -> bool {
    true
}

/// Effect settings; any field may also be `"none"` to unset it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct EffectsDef {
    voices: NameList,
    staccato: Option<toml::Value>,
    overhang: Option<toml::Value>,
    clip: Option<toml::Value>,
    octave: Option<toml::Value>,
    rate: Option<toml::Value>,
    duration: Option<toml::Value>,
    vibrato: Option<toml::Value>,
    reverb: Option<toml::Value>,
    chorus: Option<toml::Value>,
    err_tim: Option<toml::Value>,
    err_dur: Option<toml::Value>,
    err_vol: Option<toml::Value>,
}

/// Convert one effect field, warning and keeping the old setting when the
/// value is unusable.
fn patch<T>(
    field: &str,
    value: &Option<toml::Value>,
    convert: impl Fn(&toml::Value) -> Option<T>,
) -> Patch<T> {
    match value {
        None => Patch::Keep,
        Some(toml::Value::String(text)) if text == "none" => Patch::Clear,
        Some(value) => match convert(value) {
            Some(converted) => Patch::Set(converted),
            None => {
                log::warn!("Bad {} value {}", field, value);
                Patch::Keep
            }
        },
    }
}

fn ticks(value: &toml::Value) -> Option<i64> {
    match value {
        toml::Value::Integer(n) if *n > 0 => Some(*n),
        toml::Value::String(text) => parse_duration(text).ok(),
        _ => None,
    }
}

fn int_in(min: i64, max: i64) -> impl Fn(&toml::Value) -> Option<i64> {
    move |value| value.as_integer().filter(|n| (min..=max).contains(n))
}

/// Ticks, or a factor that `factor_ok` accepts.
fn adjust(factor_ok: impl Fn(f64) -> bool) -> impl Fn(&toml::Value) -> Option<Adjust> {
    move |value| match value {
        toml::Value::Float(f) if factor_ok(*f) => Some(Adjust::Factor(*f)),
        toml::Value::Float(_) => None,
        other => ticks(other).map(Adjust::Ticks),
    }
}

/// Saturate a TOML integer into a level; the envelopes clamp it further.
fn saturate_level(n: i64) -> i32 {
    i32::try_from(n).unwrap_or(if n < 0 { i32::MIN } else { i32::MAX })
}

/// Name lookups and definitions shared by every command of one resolve.
struct Resolver<'a> {
    preferences: &'a Preferences,
    voices: Vec<Voice>,
    rhythms: HashMap<String, Rhythm>,
    tunes: HashMap<String, Vec<TuneNote>>,
    volumes: HashMap<String, i32>,
}

impl<'a> Resolver<'a> {
    fn new(score: &Score, preferences: &'a Preferences) -> Self {
        Self {
            preferences,
            voices: build_voices(&score.voices),
            rhythms: build_rhythms(&score.rhythms, preferences),
            tunes: build_tunes(&score.tunes),
            volumes: build_volumes(&score.volume_names, preferences),
        }
    }

    /// Indices of the named voices; unknown names are dropped with a warning.
    fn voice_indices(&self, names: &NameList) -> Vec<usize> {
        names
            .names()
            .into_iter()
            .filter_map(|name| {
                let index = self.voices.iter().position(|v| v.name == name);
                if index.is_none() {
                    log::warn!("{}", Error::UnknownVoice(name.to_string()));
                }
                index
            })
            .collect()
    }

    fn add_command(&mut self, table: &toml::Table, composition: &mut Composition) {
        let command: Command = match toml::Value::Table(table.clone()).try_into() {
            Ok(command) => command,
            Err(err) => {
                log::warn!("Skipping command {}: {}", toml::Value::Table(table.clone()), err);
                return;
            }
        };
        match self.convert(command, composition) {
            Ok(items) => composition.extend(items),
            Err(err) => log::warn!("Skipping command {}: {}", toml::Value::Table(table.clone()), err),
        }
    }

    fn convert(&mut self, command: Command, composition: &Composition) -> Result<Vec<Item>> {
        let item = match command {
            Command::Bar { chords, repeat, clip, seed } => {
                if chords.trim() == "improv" {
                    let start = Bar::new(vec![ChordChange::new(0, "C", "maj")]);
                    let prev = composition.last_bar().unwrap_or(&start);
                    let seed = seed.unwrap_or((self.preferences.seed % TABLE_SIZE as u64) as usize);
                    let bars = improvise_bars(prev, repeat, clip, seed)?;
                    return Ok(bars.into_iter().map(Item::Bar).collect());
                }
                let chords = parse_bar_chords(&chords)?;
                if chords.is_empty() {
                    return Err(Error::invalid("chords", "no chords in bar"));
                }
                Item::Bar(Bar::new(chords).with_repeat(repeat).with_clip(clip))
            }
            Command::Beat { voices, rhythms } => {
                let voices = self.voice_indices(&voices);
                let rhythms: Vec<Rhythm> = rhythms
                    .names()
                    .into_iter()
                    .filter_map(|name| {
                        let rhythm = self.rhythms.get(name).cloned();
                        if rhythm.is_none() {
                            log::warn!("{}", Error::UnknownRhythm(name.to_string()));
                        }
                        rhythm
                    })
                    .collect();
                if voices.is_empty() || rhythms.is_empty() {
                    return Err(Error::invalid("beat", "no voice or rhythm"));
                }
                Item::Beat { voices, rhythms }
            }
            Command::Effects(def) => Item::Effects(self.effects(&def)?),
            Command::Loop => Item::Loop,
            Command::Repeat { count } => {
                let count = count.unwrap_or(2);
                if count < 2 {
                    log::warn!("Repeat count {} should be at least 2", count);
                }
                Item::Repeat(count.clamp(2, u32::MAX as i64) as u32)
            }
            Command::Mute { voices } => Item::Mute {
                voices: self.required_voices(&voices)?,
                muted: true,
            },
            Command::Hear { voices } => Item::Mute {
                voices: self.required_voices(&voices)?,
                muted: false,
            },
            Command::Play { voice, tunes, transpose } => {
                let index = self
                    .voices
                    .iter()
                    .position(|v| v.name == voice)
                    .ok_or(Error::UnknownVoice(voice))?;
                let notes = parse_tune(&tunes, &self.tunes)?;
                if notes.is_empty() {
                    return Err(Error::invalid("tunes", "no notes to play"));
                }
                Item::Play(Play {
                    voice: index,
                    notes,
                    transpose,
                })
            }
            Command::Tempo { bpm } => {
                if bpm == 0 {
                    return Err(Error::invalid("bpm", "must be positive"));
                }
                Item::Tempo(bpm)
            }
            Command::Timesig { value } => Item::TimeSig(parse_timesig(&value)?),
            Command::Volume { voices, level, start, rate } => {
                let change = self.volume_change(&level)?;
                if start.is_some() && (rate == 0 || !matches!(change, LevelChange::Absolute(_))) {
                    return Err(Error::invalid("start", "needs an absolute level and a rate"));
                }
                Item::Volume(Volume {
                    voices: self.required_voices(&voices)?,
                    change,
                    rate,
                    start: start.unwrap_or(0).max(0),
                })
            }
            Command::Pan { voices, position, rate } => {
                let change = match &position {
                    NameOrNumber::Number(n) => LevelChange::Absolute(saturate_level(*n)),
                    NameOrNumber::Name(text) => parse_level(text)
                        .ok_or_else(|| Error::invalid("position", format!("'{text}'")))?,
                };
                Item::Pan(Pan {
                    voices: self.required_voices(&voices)?,
                    change,
                    rate,
                })
            }
            Command::Skip => Item::Skip(true),
            Command::Unskip => Item::Skip(false),
        };
        Ok(vec![item])
    }

    fn required_voices(&self, names: &NameList) -> Result<Vec<usize>> {
        let voices = self.voice_indices(names);
        if voices.is_empty() {
            return Err(Error::invalid("voices", "no known voices"));
        }
        Ok(voices)
    }

    fn volume_change(&self, level: &NameOrNumber) -> Result<LevelChange> {
        match level {
            NameOrNumber::Number(n) => Ok(LevelChange::Absolute(saturate_level(*n))),
            NameOrNumber::Name(name) => match self.volumes.get(name.as_str()) {
                Some(&level) => Ok(LevelChange::Absolute(level)),
                None => parse_level(name).ok_or_else(|| Error::invalid("level", format!("'{name}'"))),
            },
        }
    }

    fn effects(&self, def: &EffectsDef) -> Result<Effects> {
        let staccato = patch("staccato", &def.staccato, adjust(|f| f > 0.0 && f < 1.0));
        let overhang = patch("overhang", &def.overhang, adjust(|f| (1.0..=8.0).contains(&f)));
        let duration_effect = match (staccato, overhang) {
            (Patch::Set(a), Patch::Set(_)) => {
                log::warn!("Cannot use both staccato and overhang; using staccato");
                Patch::Set(DurationEffect::Staccato(a))
            }
            (Patch::Set(a), _) => Patch::Set(DurationEffect::Staccato(a)),
            (_, Patch::Set(a)) => Patch::Set(DurationEffect::Overhang(a)),
            (Patch::Clear, _) | (_, Patch::Clear) => Patch::Clear,
            (Patch::Keep, Patch::Keep) => Patch::Keep,
        };
        let controller = |field: &str, value: &Option<toml::Value>| {
            patch(field, value, int_in(0, 127)).map(|v| v as u8)
        };
        let jitter = |field: &str, value: &Option<toml::Value>, max: i64| {
            patch(field, value, int_in(0, max)).map(|v| v as u32)
        };
        Ok(Effects {
            voices: self.required_voices(&def.voices)?,
            duration_effect,
            clip: patch("clip", &def.clip, toml::Value::as_bool),
            octave: patch("octave", &def.octave, int_in(0, 10)).map(|v| v as i32),
            rate: patch("rate", &def.rate, ticks),
            chord_duration: patch("duration", &def.duration, ticks),
            vibrato: controller("vibrato", &def.vibrato),
            reverb: controller("reverb", &def.reverb),
            chorus: controller("chorus", &def.chorus),
            err_tim: jitter("err_tim", &def.err_tim, 960),
            err_dur: jitter("err_dur", &def.err_dur, 960),
            err_vol: jitter("err_vol", &def.err_vol, 120),
        })
    }
}

fn parse_style(name: Option<&str>, voice: &str) -> Style {
    let Some(name) = name else {
        return Style::Bass;
    };
    match Style::ALL.iter().find(|s| s.name() == name) {
        Some(style) => *style,
        None if name == "perc" => Style::Percussion,
        None => {
            log::warn!("Voice '{}': bad style '{}', using bass", voice, name);
            Style::Bass
        }
    }
}

/// Program number for a voice, or `None` (with a warning) when unusable.
fn parse_program(def: &VoiceDef, style: Style) -> Option<u8> {
    let Some(program) = &def.program else {
        log::warn!("Voice '{}' has no program", def.name);
        return None;
    };
    let percussion = style == Style::Percussion;
    let number = match program {
        NameOrNumber::Name(name) if percussion => instruments::drum(name).map(i64::from),
        NameOrNumber::Name(name) => instruments::program(name).map(|p| i64::from(p) + 1),
        NameOrNumber::Number(n) => Some(*n),
    };
    let valid = if percussion {
        let drums = i64::from(instruments::FIRST_DRUM)..=i64::from(instruments::LAST_DRUM);
        number.filter(|n| drums.contains(n))
    } else {
        // 1-based as written; stored 0-based.
        number.filter(|n| (1..=128).contains(n)).map(|n| n - 1)
    };
    if valid.is_none() {
        log::warn!("Voice '{}': bad program {:?}", def.name, program);
    }
    valid.map(|n| n as u8)
}

fn build_voices(defs: &[VoiceDef]) -> Vec<Voice> {
    let mut allocator = ChannelAllocator::new();
    let mut voices: Vec<Voice> = Vec::new();
    for def in defs {
        if voices.iter().any(|v| v.name == def.name) {
            log::error!("Voice '{}' is declared twice", def.name);
            continue;
        }
        let style = parse_style(def.style.as_deref(), &def.name);
        let Some(program) = parse_program(def, style) else {
            continue;
        };
        let Some(channel) = allocator.allocate(style) else {
            log::warn!("Too many voices; '{}' has no channel", def.name);
            continue;
        };
        let voice = Voice::new(def.name.clone(), voices.len(), channel, program, style)
            .with_pitch_range(def.min_pitch.unwrap_or(0), def.max_pitch.unwrap_or(127));
        voices.push(voice);
    }
    voices
}

fn build_rhythms(defs: &BTreeMap<String, RhythmDef>, preferences: &Preferences) -> HashMap<String, Rhythm> {
    let mut rhythms = HashMap::new();
    for (name, def) in defs {
        let rhythm = match def.seed {
            Some(seed) => parse_weights(&def.durations).and_then(|weights| {
                random_rhythm(
                    seed,
                    &weights,
                    def.rest.unwrap_or(preferences.rhythm_rest),
                    def.repeat.unwrap_or(preferences.rhythm_repeat),
                )
            }),
            None => parse_durations(&def.durations),
        };
        match rhythm {
            Ok(rhythm) if !rhythm.is_empty() => {
                rhythms.insert(name.clone(), rhythm);
            }
            Ok(_) => log::warn!("Rhythm '{}' is empty", name),
            Err(err) => log::warn!("Skipping rhythm '{}': {}", name, err),
        }
    }
    rhythms
}

/// Resolve tunes, letting a tune refer to any other tune.
fn build_tunes(defs: &BTreeMap<String, TuneDef>) -> HashMap<String, Vec<TuneNote>> {
    let mut tunes = HashMap::new();
    let mut pending: Vec<(&String, &TuneDef)> = defs.iter().collect();
    loop {
        let before = pending.len();
        let mut waiting = Vec::new();
        for (name, def) in pending {
            match parse_tune(&def.notes, &tunes) {
                Ok(notes) => {
                    tunes.insert(name.clone(), notes);
                }
                Err(Error::UnknownTune(other)) if defs.contains_key(&other) => waiting.push((name, def)),
                Err(err) => log::warn!("Skipping tune '{}': {}", name, err),
            }
        }
        if waiting.is_empty() {
            break;
        }
        if waiting.len() == before {
            for (name, _) in waiting {
                log::warn!("Skipping tune '{}': it refers to itself", name);
            }
            break;
        }
        pending = waiting;
    }
    tunes
}

/// Dynamics, `default`, one level per style, then the score's own names.
fn build_volumes(names: &BTreeMap<String, NameOrNumber>, preferences: &Preferences) -> HashMap<String, i32> {
    let mut volumes: HashMap<String, i32> = DYNAMICS.iter().map(|&(n, l)| (n.to_string(), l)).collect();
    volumes.insert("default".to_string(), preferences.default_volume);
    for style in Style::ALL {
        volumes.insert(style.name().to_string(), style.default_volume());
    }
    for (name, level) in names {
        let level = match level {
            NameOrNumber::Number(n) => Some(make_in_range(saturate_level(*n), MAX_LEVEL, "Volume name")),
            NameOrNumber::Name(other) => volumes.get(other.as_str()).copied(),
        };
        match level {
            Some(level) => {
                volumes.insert(name.clone(), level);
            }
            None => log::error!("Volume name '{}' has an invalid level", name),
        }
    }
    volumes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::{EIGHTH, HALF, QUARTER, WHOLE};
    use crate::interpreter::InterpreterContext;
    use crate::sink::RecordingSink;
    use crate::voice::PERCUSSION_CHANNEL;

    const SCORE: &str = r#"
[preferences]
seed = 42
err_tim = 0

[[voice]]
name = "bass"
style = "bass"
program = "acoustic_bass"
min_pitch = 28
max_pitch = 55

[[voice]]
name = "keys"
style = "rhythm"
program = 1

[[voice]]
name = "kick"
style = "perc"
program = "bass_drum"

[[voice]]
name = "broken"
style = "bass"
program = "kazoo"

[rhythm.walk]
durations = "q, q, -e, e, q"

[rhythm.wild]
seed = 3
durations = "q:3, e:2"

[rhythm.bad]
durations = "q, zz"

[tune.hook]
notes = "riff, qG"

[tune.riff]
notes = "eC, eE"

[volume_names]
soft = 40
loud = "ff"

[opus]
song = "intro, verse*2"

[[composition]]
name = "intro"
commands = [
    { cmd = "tempo", bpm = 90 },
    { cmd = "bar", chords = "hC@3, hG7" },
]

[[composition]]
name = "verse"
commands = [
    { cmd = "beat", voices = "bass, kick", rhythms = ["walk", "wild", "missing"] },
    { cmd = "volume", voices = ["keys"], level = "soft" },
    { cmd = "volume", voices = "bass", level = "+10", rate = 5 },
    { cmd = "effects", voices = "keys", staccato = 0.5, overhang = 2.0, octave = 5, reverb = "none" },
    { cmd = "bar", chords = "Am" },
    { cmd = "bar", chords = "Xyz" },
    { cmd = "nonsense" },
    { cmd = "mute", voices = "nobody" },
    { cmd = "repeat", count = 1 },
]
"#;

    fn score() -> Score {
        let _ = env_logger::builder().is_test(true).try_init();
        SCORE.parse().unwrap()
    }

    #[test]
    fn test_voices() {
        let performance = score().resolve("intro", &Preferences::default()).unwrap();
        let voices = &performance.voices;
        assert_eq!(voices.len(), 3);
        assert_eq!((voices[0].channel, voices[0].program), (0, 32));
        assert_eq!((voices[0].min_pitch, voices[0].max_pitch), (28, 55));
        assert_eq!((voices[1].channel, voices[1].program), (1, 0));
        assert_eq!(voices[2].channel, PERCUSSION_CHANNEL);
        assert_eq!(voices[2].program, 36);
        assert_eq!(voices[2].style, Style::Percussion);
        assert_eq!(voices.iter().map(|v| v.track).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_preferences_override() {
        let prefs = score().preferences(&Preferences::default()).unwrap();
        assert_eq!(prefs.seed, 42);
        assert_eq!(prefs.err_tim, 0);
        assert_eq!(prefs.err_dur, 10);
    }

    #[test]
    fn test_intro_items() {
        let performance = score().resolve("intro", &Preferences::default()).unwrap();
        let items = &performance.composition.items;
        assert_eq!(items[0], Item::Tempo(90));
        let Item::Bar(bar) = &items[1] else {
            panic!("expected a bar, got {:?}", items[1]);
        };
        assert_eq!(bar.chords[1], ChordChange::new(HALF, "G", "dom7").with_octave(3));
        assert_eq!(bar.repeat, 1);
        assert!(bar.clip);
    }

    #[test]
    fn test_opus_concatenates_parts() {
        let performance = score().resolve("song", &Preferences::default()).unwrap();
        let tempos = performance
            .composition
            .items
            .iter()
            .filter(|item| matches!(item, Item::Tempo(_)))
            .count();
        let beats = performance
            .composition
            .items
            .iter()
            .filter(|item| matches!(item, Item::Beat { .. }))
            .count();
        assert_eq!((tempos, beats), (1, 2));
    }

    #[test]
    fn test_missing_name_uses_first_composition() {
        let score = score();
        let first = score.resolve("", &Preferences::default()).unwrap();
        let unknown = score.resolve("chorus", &Preferences::default()).unwrap();
        assert_eq!(first.composition, unknown.composition);
        assert_eq!(first.composition.items[0], Item::Tempo(90));
        assert!(Score::default().resolve("", &Preferences::default()).is_err());
    }

    #[test]
    fn test_bad_directives_are_skipped() {
        let performance = score().resolve("verse", &Preferences::default()).unwrap();
        let items = &performance.composition.items;
        // beat, two volumes, effects, one good bar, repeat
        assert_eq!(items.len(), 6, "{items:#?}");

        let Item::Beat { voices, rhythms } = &items[0] else {
            panic!("expected a beat");
        };
        assert_eq!(voices, &vec![0, 2]);
        assert_eq!(rhythms.len(), 2);
        assert_eq!(rhythms[0], vec![QUARTER, QUARTER, -EIGHTH, EIGHTH, QUARTER]);

        assert_eq!(
            items[1],
            Item::Volume(Volume {
                voices: vec![1],
                change: LevelChange::Absolute(40),
                rate: 0,
                start: 0,
            })
        );
        let Item::Volume(ramp) = &items[2] else {
            panic!("expected a volume");
        };
        assert_eq!((ramp.change, ramp.rate), (LevelChange::Delta(10), 5));

        let Item::Effects(effects) = &items[3] else {
            panic!("expected effects");
        };
        assert_eq!(effects.voices, vec![1]);
        assert_eq!(
            effects.duration_effect,
            Patch::Set(DurationEffect::Staccato(Adjust::Factor(0.5)))
        );
        assert_eq!(effects.octave, Patch::Set(5));
        assert_eq!(effects.reverb, Patch::Clear);
        assert!(effects.clip.is_keep());

        assert!(matches!(&items[4], Item::Bar(bar) if bar.chords[0].symbol() == "Amin"));
        assert_eq!(items[5], Item::Repeat(2));
    }

    #[test]
    fn test_tunes_resolve_in_any_order() {
        let tunes = build_tunes(&score().tunes);
        let hook: Vec<i32> = tunes["hook"].iter().map(|n| n.pitch).collect();
        assert_eq!(hook, vec![60, 64, 67]);
        assert_eq!(tunes["hook"][2].start, 2 * EIGHTH);
    }

    #[test]
    fn test_self_reference_is_skipped() {
        let mut defs = BTreeMap::new();
        defs.insert("loop".to_string(), TuneDef { notes: "qC, loop".to_string() });
        assert!(build_tunes(&defs).is_empty());
    }

    #[test]
    fn test_volume_names() {
        let volumes = build_volumes(&score().volume_names, &Preferences::default());
        assert_eq!(volumes["soft"], 40);
        assert_eq!(volumes["loud"], 110);
        assert_eq!(volumes["default"], 100);
        assert_eq!(volumes["improv"], 120);
        assert_eq!(volumes["fff"], 127);
    }

    #[test]
    fn test_huge_levels_saturate() {
        // 2^32 + 40 would wrap to 40 if truncated
        let text = r#"
[[voice]]
name = "keys"
style = "rhythm"

[volume_names]
huge = 4294967336

[[composition]]
name = "main"
commands = [
    { cmd = "volume", voices = "keys", level = 4294967336 },
    { cmd = "pan", voices = "keys", position = -4294967336 },
]
"#;
        let score: Score = text.parse().unwrap();
        assert_eq!(build_volumes(&score.volume_names, &Preferences::default())["huge"], 127);

        let items = score.resolve("main", &Preferences::default()).unwrap().composition.items;
        let Item::Volume(volume) = &items[0] else {
            panic!("expected a volume");
        };
        assert_eq!(volume.change, LevelChange::Absolute(i32::MAX));
        let Item::Pan(pan) = &items[1] else {
            panic!("expected a pan");
        };
        assert_eq!(pan.change, LevelChange::Absolute(i32::MIN));
    }

    #[test]
    fn test_staccato_factor_bounds() {
        let text = r#"
[[voice]]
name = "keys"
style = "rhythm"

[[composition]]
name = "main"
commands = [
    { cmd = "effects", voices = "keys", staccato = 0.0 },
    { cmd = "effects", voices = "keys", staccato = 1.0 },
    { cmd = "effects", voices = "keys", staccato = 0.99 },
]
"#;
        let _ = env_logger::builder().is_test(true).try_init();
        let score: Score = text.parse().unwrap();
        let items = score.resolve("main", &Preferences::default()).unwrap().composition.items;
        let Item::Effects(zero) = &items[0] else {
            panic!("expected effects");
        };
        assert_eq!(zero.duration_effect, Patch::Keep);
        let Item::Effects(full) = &items[1] else {
            panic!("expected effects");
        };
        assert_eq!(full.duration_effect, Patch::Keep);
        let Item::Effects(short) = &items[2] else {
            panic!("expected effects");
        };
        assert_eq!(
            short.duration_effect,
            Patch::Set(DurationEffect::Staccato(Adjust::Factor(0.99)))
        );
    }

    #[test]
    fn test_rhythms() {
        let rhythms = build_rhythms(&score().rhythms, &Preferences::default());
        assert!(rhythms.contains_key("walk"));
        assert!(rhythms.contains_key("wild"));
        assert!(!rhythms.contains_key("bad"));
    }

    #[test]
    fn test_improvised_bars_follow_previous_bar() {
        let text = r#"
[[voice]]
name = "keys"
style = "rhythm"
program = 1

[[composition]]
name = "jam"
commands = [
    { cmd = "bar", chords = "C@3" },
    { cmd = "bar", chords = "improv", repeat = 3, clip = false },
]
"#;
        let score: Score = text.parse().unwrap();
        let performance = score.resolve("jam", &Preferences::default()).unwrap();
        let bars: Vec<&Bar> = performance
            .composition
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Bar(bar) => Some(bar),
                _ => None,
            })
            .collect();
        assert_eq!(bars.len(), 4);
        assert!(bars[1..].iter().all(|bar| !bar.clip && bar.chords[0].octave == Some(3)));
    }

    #[test]
    fn test_play_command() {
        let text = r#"
[[voice]]
name = "lead"
style = "lead"
program = "flute"

[tune.theme]
notes = "qC, qD"

[[composition]]
name = "main"
commands = [
    { cmd = "play", voice = "lead", tunes = "theme, hE", transpose = 2 },
    { cmd = "play", voice = "ghost", tunes = "theme" },
    { cmd = "volume", voices = "lead", level = 90, start = 480 },
]
"#;
        let score: Score = text.parse().unwrap();
        let performance = score.resolve("main", &Preferences::default()).unwrap();
        assert_eq!(performance.voices[0].program, 73);
        let items = &performance.composition.items;
        assert_eq!(items.len(), 1);
        let Item::Play(play) = &items[0] else {
            panic!("expected play");
        };
        assert_eq!(play.transpose, 2);
        assert_eq!(play.notes.len(), 3);
        assert_eq!(play.notes[2].start, 2 * QUARTER);
    }

    #[test]
    fn test_render_resolved_opus() {
        let score = score();
        let preferences = score.preferences(&Preferences::default()).unwrap();
        let render = || {
            let mut performance = score.resolve("song", &preferences).unwrap();
            let mut sink = RecordingSink::new();
            let summary = InterpreterContext::new(preferences.clone())
                .render(&mut performance.voices, &performance.composition, &mut sink)
                .unwrap();
            (summary, sink.notes())
        };
        let (summary, notes) = render();
        assert_eq!(summary.bars, 3);
        assert_eq!(summary.end_tick, 3 * WHOLE);
        assert!(!notes.is_empty());
        assert!(notes.iter().all(|n| n.start < summary.end_tick + WHOLE));
        assert_eq!(render().1, notes);
    }

    #[test]
    fn test_demo_score() {
        let score: Score = include_str!("../../../../demos/blues.toml").parse().unwrap();
        assert_eq!(score.composition_names(), vec!["intro", "blues", "coda"]);
        let performance = score.resolve("song", &Preferences::default()).unwrap();
        let channels: Vec<u8> = performance.voices.iter().map(|v| v.channel).collect();
        assert_eq!(channels, vec![0, 1, 2, 3, 9, 9, 4]);
        let bars = performance
            .composition
            .items
            .iter()
            .filter(|item| matches!(item, Item::Bar(_)))
            .count();
        // intro 1, blues 7 each, coda 2 improvised + 1
        assert_eq!(bars, 1 + 2 * 7 + 3);
    }
}
