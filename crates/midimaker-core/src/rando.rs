//! Table-driven pseudo-random numbers.
//!
//! Every random decision made while rendering (improvised melodies, timing
//! jitter, random rhythms, improvised chord progressions) reads from one
//! fixed table of floats. A [`Rando`] is only a cursor into that table, so two
//! instances built with the same seed yield the same sequence no matter what
//! else in the process has consumed randomness.

use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::OnceLock;

/// Number of entries in the shared table; valid seeds are `0..TABLE_SIZE`.
pub const TABLE_SIZE: usize = 10_000;

/// Seed used to fill the shared table.
const MASTER_SEED: u64 = 1;

static TABLE: OnceLock<Vec<f64>> = OnceLock::new();

fn table() -> &'static [f64] {
    TABLE.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(MASTER_SEED);
        (0..TABLE_SIZE).map(|_| rng.random::<f64>()).collect()
    })
}

/// A cursor over the shared random table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rando {
    index: usize,
}

impl Rando {
    /// Create a cursor starting at `seed`.
    pub fn new(seed: usize) -> Result<Self> {
        if seed >= TABLE_SIZE {
            return Err(Error::invalid(
                "seed",
                format!("{seed} is not below {TABLE_SIZE}"),
            ));
        }
        Ok(Self { index: seed })
    }

    /// Create a cursor from any seed, folding it into the table range.
    pub fn wrapping(seed: u64) -> Self {
        Self {
            index: (seed % TABLE_SIZE as u64) as usize,
        }
    }

    /// Returns the next number in `[0.0, 1.0)`.
    pub fn number(&mut self) -> f64 {
        let table = table();
        let value = table[self.index];
        self.index = (self.index + 1) % table.len();
        value
    }

    /// Returns true when `threshold` is greater than the next number.
    ///
    /// A threshold of 0.0 never passes; 1.0 always does.
    pub fn test(&mut self, threshold: f64) -> bool {
        threshold > self.number()
    }

    /// Returns a uniformly chosen index in `0..len`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        assert!(len > 0, "index() needs a non-empty range");
        ((self.number() * len as f64) as usize).min(len - 1)
    }

    /// Returns a uniformly chosen element, or `None` for an empty slice.
    pub fn choice<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.index(items.len());
        items.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = Rando::new(1234).unwrap();
        let mut b = Rando::new(1234).unwrap();
        for _ in 0..100 {
            assert_eq!(a.number(), b.number());
        }
    }

    #[test]
    fn test_numbers_in_unit_range() {
        let mut r = Rando::new(0).unwrap();
        for _ in 0..TABLE_SIZE + 10 {
            let n = r.number();
            assert!((0.0..1.0).contains(&n));
        }
    }

    #[test]
    fn test_seed_out_of_range() {
        assert!(Rando::new(TABLE_SIZE).is_err());
        assert_eq!(Rando::wrapping(TABLE_SIZE as u64 + 3), Rando::new(3).unwrap());
    }

    #[test]
    fn test_cursor_wraps() {
        let mut end = Rando::new(TABLE_SIZE - 1).unwrap();
        let mut start = Rando::new(0).unwrap();
        end.number();
        assert_eq!(end.number(), start.number());
    }

    #[test]
    fn test_threshold_extremes() {
        let mut r = Rando::new(42).unwrap();
        for _ in 0..50 {
            assert!(!r.test(0.0));
            assert!(r.test(1.0));
        }
    }

    #[test]
    fn test_choice_covers_all_items() {
        let mut r = Rando::new(1234).unwrap();
        let items = [0usize, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        let mut counts = [0usize; 10];
        for _ in 0..1000 {
            counts[*r.choice(&items).unwrap()] += 1;
        }
        assert!(counts.iter().all(|&c| c > 50));
        assert!(r.choice::<u8>(&[]).is_none());
    }
}
