//! Fixed-width integer histogram for selectivity estimation.
//!
//! Equi-width buckets over a known `[min, max]` range, grounded on the
//! linear-interpolation estimator shape of
//! `fsqlite-planner/src/stats.rs`'s `Histogram::estimate_less_than_rows`
//! (bucket lookup + fractional interpolation within the matching bucket),
//! specialized to `i32` values and a single comparison-predicate entry
//! point per spec §4.5 rather than that crate's per-direction method set.

use crate::error::{DbError, DbResult};
use crate::predicate::Op;

pub struct IntHistogram {
    buckets: Vec<u32>,
    min: i32,
    max: i32,
    width: f64,
    num_tuples: u32,
}

impl IntHistogram {
    /// `num_buckets >= 1` and `min <= max`.
    pub fn new(num_buckets: usize, min: i32, max: i32) -> IntHistogram {
        assert!(num_buckets >= 1, "histogram needs at least one bucket");
        assert!(min <= max, "histogram range must be non-empty");
        let width = (max - min + 1) as f64 / num_buckets as f64;
        IntHistogram {
            buckets: vec![0; num_buckets],
            min,
            max,
            width,
            num_tuples: 0,
        }
    }

    fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Index of the bucket covering `v`. Caller must ensure `min <= v <=
    /// max`; clamps to the last bucket to absorb rounding at the top of
    /// the range (spec §4.5: "for v = max, the formula must yield
    /// num_buckets - 1").
    fn bucket_of(&self, v: i32) -> usize {
        let idx = ((v - self.min) as f64 / self.width) as usize;
        idx.min(self.num_buckets() - 1)
    }

    /// Ignores out-of-range values.
    pub fn add_value(&mut self, v: i32) {
        if v < self.min || v > self.max {
            return;
        }
        let b = self.bucket_of(v);
        self.buckets[b] += 1;
        self.num_tuples += 1;
    }

    pub fn num_tuples(&self) -> u32 {
        self.num_tuples
    }

    fn sel_less_than(&self, v: i32) -> f64 {
        if self.num_tuples == 0 {
            return 0.0;
        }
        if v <= self.min {
            return 0.0;
        }
        if v >= self.max {
            return 1.0;
        }
        let b = self.bucket_of(v);
        let before: u32 = self.buckets[..b].iter().sum();
        let bucket_start = self.min as f64 + b as f64 * self.width;
        let within = (self.buckets[b] as f64 / self.width) * (v as f64 - bucket_start);
        (before as f64 + within) / self.num_tuples as f64
    }

    fn sel_less_than_or_eq(&self, v: i32) -> f64 {
        self.sel_less_than(v.saturating_add(1))
    }

    fn sel_greater_than(&self, v: i32) -> f64 {
        1.0 - self.sel_less_than_or_eq(v)
    }

    fn sel_greater_than_or_eq(&self, v: i32) -> f64 {
        self.sel_greater_than(v.saturating_sub(1))
    }

    fn sel_equals(&self, v: i32) -> f64 {
        self.sel_less_than_or_eq(v) - self.sel_less_than(v)
    }

    fn sel_not_equals(&self, v: i32) -> f64 {
        1.0 - self.sel_equals(v)
    }

    /// Estimated selectivity of `col OP v`, a fraction in `[0, 1]`.
    pub fn estimate_selectivity(&self, op: Op, v: i32) -> DbResult<f64> {
        let sel = match op {
            Op::LessThan => self.sel_less_than(v),
            Op::LessThanOrEq => self.sel_less_than_or_eq(v),
            Op::GreaterThan => self.sel_greater_than(v),
            Op::GreaterThanOrEq => self.sel_greater_than_or_eq(v),
            Op::Equals => self.sel_equals(v),
            Op::NotEquals => self.sel_not_equals(v),
            Op::Like => {
                return Err(DbError::illegal_argument(
                    "LIKE has no meaning over an integer histogram",
                ))
            }
        };
        Ok(sel.clamp(0.0, 1.0))
    }

    /// Placeholder retained for interface compatibility with the planner
    /// (spec §4.5): a fixed estimate independent of any particular value.
    pub fn avg_selectivity(&self) -> f64 {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> IntHistogram {
        let mut h = IntHistogram::new(10, 1, 10);
        for v in [1, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10] {
            h.add_value(v);
        }
        h
    }

    #[test]
    fn bucket_sum_matches_tuple_count() {
        let h = populated();
        assert_eq!(h.buckets.iter().sum::<u32>(), h.num_tuples());
    }

    #[test]
    fn equality_and_not_equals_complement() {
        let h = populated();
        for v in 0..=11 {
            let eq = h.estimate_selectivity(Op::Equals, v).unwrap();
            let ne = h.estimate_selectivity(Op::NotEquals, v).unwrap();
            assert!((eq + ne - 1.0).abs() < 1e-9, "v={} eq={} ne={}", v, eq, ne);
        }
    }

    #[test]
    fn less_than_and_greater_than_or_eq_complement() {
        let h = populated();
        for v in 0..=11 {
            let lt = h.estimate_selectivity(Op::LessThan, v).unwrap();
            let gte = h.estimate_selectivity(Op::GreaterThanOrEq, v).unwrap();
            assert!((lt + gte - 1.0).abs() < 1e-9, "v={} lt={} gte={}", v, lt, gte);
        }
    }

    #[test]
    fn boundary_selectivities() {
        let h = populated();
        assert_eq!(h.estimate_selectivity(Op::LessThan, 1).unwrap(), 0.0);
        assert_eq!(h.estimate_selectivity(Op::LessThan, 11).unwrap(), 1.0);
    }

    #[test]
    fn equals_one_is_roughly_two_elevenths() {
        let h = populated();
        let sel = h.estimate_selectivity(Op::Equals, 1).unwrap();
        assert!((sel - 2.0 / 11.0).abs() < 0.05, "sel={}", sel);
    }

    #[test]
    fn less_than_five_is_roughly_four_elevenths() {
        let h = populated();
        let sel = h.estimate_selectivity(Op::LessThan, 5).unwrap();
        assert!((sel - 4.0 / 11.0).abs() < 0.05, "sel={}", sel);
    }

    #[test]
    fn like_is_rejected() {
        let h = populated();
        assert!(h.estimate_selectivity(Op::Like, 3).is_err());
    }

    #[test]
    fn out_of_range_values_are_ignored() {
        let mut h = IntHistogram::new(5, 1, 10);
        h.add_value(0);
        h.add_value(11);
        assert_eq!(h.num_tuples(), 0);
    }

    #[test]
    fn empty_histogram_selectivity_is_zero() {
        let h = IntHistogram::new(5, 1, 10);
        assert_eq!(h.estimate_selectivity(Op::Equals, 5).unwrap(), 0.0);
    }
}
