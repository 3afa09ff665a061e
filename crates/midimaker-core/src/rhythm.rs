//! Random rhythm patterns.
//!
//! A random rhythm is drawn once, when the score is resolved, from weighted
//! durations such as `q:3,e:2` (three chances of a quarter for every two of an
//! eighth). The pattern covers a double
//! whole note so it fills any common bar; the generators drop whatever runs
//! past the end of the bar.

use crate::duration::{parse_duration, DOUBLE_WHOLE};
use crate::error::{Error, Result};
use crate::rando::Rando;
use crate::voice::Rhythm;

/// Parse `name:weight` pairs, e.g. `q:3,e:2`.
///
/// A pair without a weight counts once.
pub fn parse_weights(text: &str) -> Result<Vec<(i64, u32)>> {
    text.split(',')
        .map(str::trim)
        .filter(|bit| !bit.is_empty())
        .map(|bit| {
            let (name, weight) = match bit.split_once(':') {
                Some((name, weight)) => {
                    let weight = weight
                        .trim()
                        .parse::<u32>()
                        .map_err(|_| Error::invalid("weight", format!("'{bit}' has no numeric weight")))?;
                    (name, weight)
                }
                None => (bit, 1),
            };
            Ok((parse_duration(name)?, weight))
        })
        .collect()
}

/// Draw a rhythm from weighted durations.
///
/// The first slot always draws a fresh duration; later slots keep the
/// previous one with probability `repeat`. Each slot is a rest with
/// probability `rest`.
pub fn random_rhythm(seed: usize, weights: &[(i64, u32)], rest: f64, repeat: f64) -> Result<Rhythm> {
    let mut table: Vec<i64> = Vec::new();
    for &(duration, weight) in weights {
        if duration <= 0 {
            return Err(Error::InvalidDuration(duration.to_string()));
        }
        table.extend(std::iter::repeat(duration).take(weight as usize));
    }
    if table.is_empty() {
        return Err(Error::invalid("durations", "no weighted durations to draw from"));
    }

    let mut rando = Rando::new(seed)?;
    let mut rhythm = Rhythm::new();
    let mut tick = 0;
    let mut duration = table[0];
    while tick < DOUBLE_WHOLE {
        if tick == 0 || !rando.test(repeat) {
            duration = table[rando.index(table.len())];
        }
        rhythm.push(if rando.test(rest) { -duration } else { duration });
        tick += duration;
    }
    log::debug!("Random rhythm {:?}", rhythm);
    Ok(rhythm)
}
