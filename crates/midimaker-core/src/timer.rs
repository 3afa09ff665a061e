//! Level envelopes for volume and pan.
//!
//! Each track keeps a list of breakpoints `(tick, level, rate)`. A breakpoint
//! with a non-zero rate marks the end of a ramp that started at the previous
//! breakpoint; levels in between are interpolated linearly. Queries happen
//! lazily, whenever a note is emitted.

use crate::duration::TICKS_PER_QUARTER;
use std::collections::HashMap;

/// Upper bound (exclusive) for every level.
pub const MAX_LEVEL: i32 = 128;

/// A requested change of level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelChange {
    /// Move to this level.
    Absolute(i32),
    /// Move by this amount relative to the current level.
    Delta(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Breakpoint {
    tick: i64,
    level: i32,
    rate: u32,
}

/// Clamp `value` into `[0, max)`, warning when it was outside.
pub fn make_in_range(value: i32, max: i32, what: &str) -> i32 {
    if value >= max {
        log::warn!("{} value {} too high", what, value);
        max - 1
    } else if value < 0 {
        log::warn!("{} value {} too low", what, value);
        0
    } else {
        value
    }
}

/// Per-track envelope of one controller (volume, pan).
#[derive(Debug, Clone)]
pub struct Timer {
    name: String,
    default: i32,
    ticks_per_rate: i64,
    tracks: HashMap<usize, Vec<Breakpoint>>,
}

impl Timer {
    /// Create an envelope whose untouched tracks report `default`.
    pub fn new(name: impl Into<String>, default: i32) -> Self {
        Self {
            name: name.into(),
            default,
            ticks_per_rate: TICKS_PER_QUARTER,
            tracks: HashMap::new(),
        }
    }

    /// Change how many ticks one unit of rate spans.
    pub fn with_ticks_per_rate(mut self, ticks_per_rate: i64) -> Self {
        self.ticks_per_rate = ticks_per_rate.max(1);
        self
    }

    /// Forget every breakpoint on every track.
    pub fn reset(&mut self) {
        self.tracks.clear();
    }

    /// Apply `change` to `track` at `tick`.
    ///
    /// With `rate == 0` the level jumps immediately. Otherwise the level holds
    /// at its current value and ramps to the target at `rate` levels per
    /// quarter note. Breakpoints later than `tick` are discarded first, so a
    /// new change interrupts a ramp still in progress.
    pub fn set_level(&mut self, track: usize, tick: i64, change: LevelChange, rate: u32) {
        let points = self.tracks.entry(track).or_default();

        if points.is_empty() && matches!(change, LevelChange::Delta(_)) {
            log::warn!("First {} change on track {} should be a level, not a delta", self.name, track);
        }

        while points.last().is_some_and(|p| p.tick > tick) {
            points.pop();
        }

        let old_level = points.last().map_or(self.default, |p| p.level);

        let new_level = match (change, rate) {
            (LevelChange::Absolute(level), 0) => level,
            (LevelChange::Delta(delta), 0) => old_level + delta,
            _ => old_level,
        };
        let new_level = make_in_range(new_level, MAX_LEVEL, &self.name);
        points.push(Breakpoint {
            tick,
            level: new_level,
            rate: 0,
        });

        if rate > 0 {
            let end_level = match change {
                LevelChange::Absolute(level) => level,
                LevelChange::Delta(delta) => new_level + delta,
            };
            let end_level = make_in_range(end_level, MAX_LEVEL, &self.name);
            let span = (end_level - new_level).abs() as i64 * self.ticks_per_rate / rate as i64;
            points.push(Breakpoint {
                tick: tick + span,
                level: end_level,
                rate,
            });
        }
    }

    /// Level of `track` at `tick`.
    ///
    /// # Panics
    ///
    /// Panics if `tick` precedes the track's first breakpoint.
    pub fn get_level(&self, track: usize, tick: i64) -> i32 {
        let points = match self.tracks.get(&track) {
            Some(points) if !points.is_empty() => points,
            _ => {
                log::error!("{} queried on track {} before any level was set", self.name, track);
                return self.default;
            }
        };
        let index = points
            .iter()
            .rposition(|p| tick >= p.tick)
            .unwrap_or_else(|| panic!("{}: tick {} precedes track {}'s first level", self.name, tick, track));
        let current = points[index];
        match points.get(index + 1) {
            Some(next) if next.rate > 0 => {
                let dv = (next.level - current.level) as i64;
                let dt = next.tick - current.tick;
                let now = tick - current.tick;
                if dt == 0 {
                    return next.level;
                }
                ((now * dv).div_euclid(dt) + current.level as i64) as i32
            }
            _ => current.level,
        }
    }
}
