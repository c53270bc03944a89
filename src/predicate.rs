//! Comparison operators shared by the histogram (C6) and the aggregation
//! operator (C7).
//!
//! Grounded on the legacy `operator.rs`'s `Op` enum (`Equals`,
//! `GreaterThan`, `GreaterThanOrEq`, `LessThan`, `LessThanOrEq`, `Like`,
//! `NotEquals`), carried over unchanged for the comparisons both components
//! need. `Like` has no meaning over an `IntHistogram` and is rejected there
//! with `IllegalArgument`.

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Op {
    Equals,
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,
    Like,
    NotEquals,
}
