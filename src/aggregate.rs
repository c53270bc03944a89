//! Grouped aggregation operator (C7): COUNT, SUM, MIN, MAX, AVG over an
//! optional group-by column.
//!
//! Grounded on the `OpIterator` contract in `operator.rs` and the
//! handler-per-op shape implied by spec §4.4; the teacher carries no
//! aggregation operator of its own, so the tagged-`AggOp`-plus-branching
//! design follows spec §9's "Polymorphic aggregate handlers" design note
//! directly rather than a handler-subclass hierarchy.

use std::collections::HashMap;

use crate::error::{DbError, DbResult};
use crate::field::{Field, FieldType};
use crate::operator::OpIterator;
use crate::tuple::{FieldDesc, Tuple, TupleDesc};

pub const NO_GROUPING: i32 = -1;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AggOp {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl AggOp {
    fn name(self) -> &'static str {
        match self {
            AggOp::Count => "COUNT",
            AggOp::Sum => "SUM",
            AggOp::Min => "MIN",
            AggOp::Max => "MAX",
            AggOp::Avg => "AVG",
        }
    }
}

/// Group key: either a field value, or the sentinel for the no-grouping
/// case (spec §3: "a field value, or a sentinel NONE").
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum GroupKey {
    None,
    Field(Field),
}

/// Running per-group aggregate state. `sum`/`count` are kept for every op
/// so AVG's running mean falls out of the same bookkeeping; `min`/`max`
/// are only meaningful once `count > 0`.
struct RunningAgg {
    count: i64,
    sum: i64,
    min: i32,
    max: i32,
}

impl RunningAgg {
    fn new() -> RunningAgg {
        // MIN seeds with i32::MAX, MAX seeds with 0 — this reproduces the
        // source's asymmetric seeding verbatim (spec §4.4/§9 open
        // question): an all-negative MAX aggregation is wrong by design
        // inherited from the original, not a bug introduced here.
        RunningAgg {
            count: 0,
            sum: 0,
            min: i32::MAX,
            max: 0,
        }
    }

    fn feed(&mut self, op: AggOp, value: i32) {
        match op {
            AggOp::Count => self.count += 1,
            AggOp::Sum => {
                self.sum += value as i64;
                self.count += 1;
            }
            AggOp::Min => {
                if self.count == 0 || value < self.min {
                    self.min = value;
                }
                self.count += 1;
            }
            AggOp::Max => {
                if value > self.max {
                    self.max = value;
                }
                self.count += 1;
            }
            AggOp::Avg => {
                self.sum += value as i64;
                self.count += 1;
            }
        }
    }

    fn result(&self, op: AggOp) -> i32 {
        match op {
            AggOp::Count => self.count as i32,
            AggOp::Sum => self.sum as i32,
            AggOp::Min => self.min,
            AggOp::Max => self.max,
            AggOp::Avg => (self.sum / self.count.max(1)) as i32,
        }
    }
}

/// Consumes a child stream, groups by an optional key column, and applies
/// one aggregate op. Materializes the grouped result on `open`; `rewind`
/// only rewinds the materialized result, it does not re-drain the child
/// (spec §4.4).
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    agg_field: usize,
    group_field: i32,
    op: AggOp,
    out_desc: TupleDesc,
    results: Vec<Tuple>,
    cursor: usize,
    opened: bool,
}

impl Aggregate {
    /// Fails with `UnsupportedOp` if the aggregate column is `STRING` and
    /// `op` is anything but `COUNT` (spec §4.4).
    pub fn new(
        child: Box<dyn OpIterator>,
        agg_field: usize,
        group_field: i32,
        op: AggOp,
    ) -> DbResult<Aggregate> {
        let child_desc = child.get_tuple_desc().clone();
        if child_desc.field_type(agg_field) == FieldType::String && op != AggOp::Count {
            return Err(DbError::unsupported_op(
                "only COUNT is supported over a STRING-valued aggregate column",
            ));
        }

        let agg_name = format!(
            "{}({})",
            op.name(),
            child_desc.field_name(agg_field).unwrap_or("?")
        );
        let out_desc = if group_field == NO_GROUPING {
            TupleDesc::new(vec![FieldDesc::new(FieldType::Int, Some(&agg_name))])
        } else {
            let group_field = group_field as usize;
            TupleDesc::new(vec![
                FieldDesc::new(
                    child_desc.field_type(group_field),
                    child_desc.field_name(group_field),
                ),
                FieldDesc::new(FieldType::Int, Some(&agg_name)),
            ])
        };

        Ok(Aggregate {
            child,
            agg_field,
            group_field,
            op,
            out_desc,
            results: Vec::new(),
            cursor: 0,
            opened: false,
        })
    }

    fn group_key(&self, tuple: &Tuple) -> GroupKey {
        if self.group_field == NO_GROUPING {
            GroupKey::None
        } else {
            GroupKey::Field(tuple.get_field(self.group_field as usize).clone())
        }
    }

    fn drain_child(&mut self) -> DbResult<()> {
        let mut state: HashMap<GroupKey, RunningAgg> = HashMap::new();
        self.child.open()?;
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            let key = self.group_key(&tuple);
            let value = match tuple.get_field(self.agg_field) {
                Field::Int(v) => *v,
                // COUNT is the only op reachable here for STRING columns
                // (constructor rejects all others); the value itself is
                // never inspected by COUNT, so 0 is a safe placeholder.
                Field::String(_) => 0,
            };
            state.entry(key).or_insert_with(RunningAgg::new).feed(self.op, value);
        }
        self.child.close();

        self.results = state
            .into_iter()
            .map(|(key, agg)| self.build_output_tuple(key, agg.result(self.op)))
            .collect();
        Ok(())
    }

    fn build_output_tuple(&self, key: GroupKey, agg_value: i32) -> Tuple {
        match key {
            GroupKey::None => Tuple::new(self.out_desc.clone(), vec![Field::Int(agg_value)]),
            GroupKey::Field(field) => {
                Tuple::new(self.out_desc.clone(), vec![field, Field::Int(agg_value)])
            }
        }
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> DbResult<()> {
        self.drain_child()?;
        self.cursor = 0;
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> DbResult<bool> {
        if !self.opened {
            return Err(DbError::iterator_not_open("aggregate operator not open"));
        }
        Ok(self.cursor < self.results.len())
    }

    fn next(&mut self) -> DbResult<Tuple> {
        if !self.has_next()? {
            return Err(DbError::no_such_element("aggregate results exhausted"));
        }
        let t = self.results[self.cursor].clone();
        self.cursor += 1;
        Ok(t)
    }

    fn rewind(&mut self) -> DbResult<()> {
        if !self.opened {
            return Err(DbError::iterator_not_open("aggregate operator not open"));
        }
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
    }

    fn get_tuple_desc(&self) -> &TupleDesc {
        &self.out_desc
    }
}
