//! A thin bundle of a `Catalog` and a `BufferPool`, for call sites and
//! tests that want one handle to pass around.
//!
//! Per spec §9's design note, the teacher's `Database::global()` /
//! `static DB: OnceCell<Database>` process-wide singleton is explicitly
//! NOT carried forward here: `Catalog`, `BufferPool`, and `LockManager`
//! are constructed explicitly and threaded through constructors instead,
//! so tests can run many independent instances in the same process and
//! inject fakes at the seams.

use std::sync::Arc;

use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;

pub struct Database {
    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
}

impl Database {
    pub fn new(buffer_pool_capacity: usize) -> Database {
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = Arc::new(BufferPool::new(buffer_pool_capacity, catalog.clone()));
        Database {
            catalog,
            buffer_pool,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }
}
