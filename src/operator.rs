//! Query operator contract shared by every pipeline stage.
//!
//! Grounded on the legacy `operator.rs`'s `Predicate`/`Op` pair (now moved,
//! generalized, to `predicate.rs`) and the iterator-style stage interface
//! implied by `sequential_scan.rs`'s `Iterator for SequentialScan`,
//! generalized per spec §6 to the explicit `open`/`has_next`/`next`/
//! `rewind`/`close` contract so a stage's lifecycle (draining a child,
//! materializing state) is visible at the call site rather than hidden
//! inside `Iterator::next`.

use crate::error::DbResult;
use crate::tuple::{Tuple, TupleDesc};

/// A pipeline stage that consumes zero or more child streams and produces
/// tuples. `open`/`close` bracket the stage's lifetime (child draining,
/// state materialization); `rewind` restarts the stream without retearing
/// down that state.
pub trait OpIterator {
    fn open(&mut self) -> DbResult<()>;
    fn has_next(&mut self) -> DbResult<bool>;
    fn next(&mut self) -> DbResult<Tuple>;
    fn rewind(&mut self) -> DbResult<()>;
    fn close(&mut self);
    fn get_tuple_desc(&self) -> &TupleDesc;

    /// Default: leaf operators (e.g. a heap-file scan) have none.
    fn get_children(&self) -> Vec<&dyn OpIterator> {
        Vec::new()
    }
}
