//! Small random offsets that humanize note timing, length and velocity.

use crate::rando::Rando;
use std::collections::HashMap;

/// Build the error table for a maximum magnitude of `amount`.
///
/// For each magnitude `m` in `0..=amount` the table holds every integer in
/// `-m..=m`, then the table for `amount / 2` is appended. Drawing uniformly
/// from the result favors small offsets over large ones.
pub fn make_error_table(amount: u32) -> Vec<i32> {
    let mut table = Vec::new();
    let max = amount as i32;
    for err in 0..=max {
        table.extend(-err..=err);
    }
    if amount / 2 > 0 {
        table.extend(make_error_table(amount / 2));
    }
    table
}

/// Draws jitter offsets from cached error tables.
#[derive(Clone, Debug)]
pub struct Jitter {
    tables: HashMap<u32, Vec<i32>>,
    rando: Rando,
}

impl Jitter {
    /// Create a jitter source reading from `rando`.
    pub fn new(rando: Rando) -> Self {
        Self {
            tables: HashMap::new(),
            rando,
        }
    }

    /// The underlying random cursor, for callers that also need plain draws.
    pub fn rando(&mut self) -> &mut Rando {
        &mut self.rando
    }

    /// Draw one offset in `-max_error..=max_error`.
    ///
    /// A magnitude of zero returns zero without consuming randomness.
    pub fn offset(&mut self, max_error: u32) -> i32 {
        if max_error == 0 {
            return 0;
        }
        let table = self
            .tables
            .entry(max_error)
            .or_insert_with(|| make_error_table(max_error));
        let index = self.rando.index(table.len());
        table[index]
    }

    /// Add a random offset to `value`, never returning less than `floor`.
    pub fn add_error(&mut self, value: i64, max_error: u32, floor: i64) -> i64 {
        (value + self.offset(max_error) as i64).max(floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_table_zero() {
        assert_eq!(make_error_table(0), vec![0]);
    }

    #[test]
    fn test_error_table_shape() {
        // m=0: [0]; m=1: [-1,0,1]; m=2: [-2..2]; then table(1) = [0,-1,0,1]
        let table = make_error_table(2);
        assert_eq!(
            table,
            vec![0, -1, 0, 1, -2, -1, 0, 1, 2, 0, -1, 0, 1]
        );
    }

    #[test]
    fn test_error_table_favors_small_errors() {
        let table = make_error_table(10);
        let zeros = table.iter().filter(|&&e| e == 0).count();
        let tens = table.iter().filter(|&&e| e.abs() == 10).count();
        assert!(zeros > tens);
        assert!(table.iter().all(|e| e.abs() <= 10));
        assert_eq!(table.iter().sum::<i32>(), 0);
    }

    #[test]
    fn test_add_error_floor() {
        let mut jitter = Jitter::new(Rando::new(7).unwrap());
        for _ in 0..200 {
            assert!(jitter.add_error(0, 10, 0) >= 0);
            let v = jitter.add_error(500, 10, 0);
            assert!((490..=510).contains(&v));
        }
    }

    #[test]
    fn test_zero_magnitude_is_identity() {
        let mut jitter = Jitter::new(Rando::new(7).unwrap());
        assert_eq!(jitter.add_error(123, 0, 0), 123);
    }
}
