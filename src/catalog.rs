//! Table directory: maps a `TableId` to the `HeapFile` backing it.
//!
//! Grounded on the legacy `database.rs`'s `Catalog` (a
//! `HashMap<i32, (DbFile, TupleDesc)>` guarded by a `Mutex`) and
//! `btree/catalog.rs`'s analogous table registry — collapsed here to a
//! single `RwLock<HashMap<TableId, Arc<HeapFile>>>` since `HeapFile` already
//! carries its own `TupleDesc` (no need for a side table).
//!
//! Unlike the legacy version, this `Catalog` is not a global singleton: it is
//! constructed explicitly and threaded through `BufferPool` as an `Arc`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{DbError, DbResult};
use crate::heap_file::HeapFile;
use crate::page_id::TableId;

#[derive(Default)]
pub struct Catalog {
    tables: RwLock<HashMap<TableId, Arc<HeapFile>>>,
}

impl Catalog {
    pub fn new() -> Catalog {
        Catalog::default()
    }

    pub fn add_table(&self, file: Arc<HeapFile>) {
        let mut tables = self.tables.write().unwrap();
        tables.insert(file.table_id(), file);
    }

    pub fn get_db_file(&self, table_id: TableId) -> DbResult<Arc<HeapFile>> {
        let tables = self.tables.read().unwrap();
        tables
            .get(&table_id)
            .cloned()
            .ok_or_else(|| DbError::invalid_page(format!("no table registered for id {}", table_id)))
    }

    pub fn num_tables(&self) -> usize {
        self.tables.read().unwrap().len()
    }

    pub fn clear(&self) {
        self.tables.write().unwrap().clear();
    }
}
