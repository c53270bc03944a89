//! Bounded LRU page cache mediating all transactional page access.
//!
//! The cache structure is an arena of nodes indexed by slot number (per
//! spec §9's design note), with `prev`/`next` stored as indices rather than
//! pointers — the `HashMap<PageId, usize>` index owns lookups, the arena
//! owns the nodes, and the linked list is just index bookkeeping over it.
//! Grounded on the caching shape of the legacy `bufferpool.rs`
//! (`HashMap<PageId, Arc<RwLock<Page>>>`), generalized with LRU eviction,
//! lock-manager admission, and commit/abort handling per spec §4.3.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::debug;

use crate::catalog::Catalog;
use crate::error::{DbError, DbResult};
use crate::heap_page::{HeapPage, Page};
use crate::lock_manager::{AcquireResult, LockManager, LockMode};
use crate::page_id::PageId;
use crate::transaction::TransactionId;
use crate::tuple::Tuple;
use crate::types::{DEFAULT_LOCK_WAIT_TIMEOUT, LOCK_POLL_INTERVAL};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl Permission {
    fn to_lock_mode(self) -> LockMode {
        match self {
            Permission::ReadOnly => LockMode::Shared,
            Permission::ReadWrite => LockMode::Exclusive,
        }
    }
}

type CachedPage = Arc<Mutex<HeapPage>>;

struct Node {
    page_id: PageId,
    page: CachedPage,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Doubly-linked list of cached pages, most-recently-used at `head`,
/// backed by a slab so `prev`/`next` are plain indices.
#[derive(Default)]
struct LruCache {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    index: HashMap<PageId, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl LruCache {
    fn len(&self) -> usize {
        self.index.len()
    }

    fn detach(&mut self, slot: usize) {
        let (prev, next) = {
            let node = self.nodes[slot].as_ref().unwrap();
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.nodes[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
    }

    fn attach_at_head(&mut self, slot: usize) {
        let old_head = self.head;
        {
            let node = self.nodes[slot].as_mut().unwrap();
            node.prev = None;
            node.next = old_head;
        }
        if let Some(h) = old_head {
            self.nodes[h].as_mut().unwrap().prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }

    fn touch(&mut self, slot: usize) {
        if self.head == Some(slot) {
            return;
        }
        self.detach(slot);
        self.attach_at_head(slot);
    }

    fn get(&mut self, pid: &PageId) -> Option<CachedPage> {
        let slot = *self.index.get(pid)?;
        self.touch(slot);
        Some(self.nodes[slot].as_ref().unwrap().page.clone())
    }

    fn insert(&mut self, pid: PageId, page: CachedPage) {
        let slot = match self.free.pop() {
            Some(s) => {
                self.nodes[s] = Some(Node {
                    page_id: pid,
                    page,
                    prev: None,
                    next: None,
                });
                s
            }
            None => {
                self.nodes.push(Some(Node {
                    page_id: pid,
                    page,
                    prev: None,
                    next: None,
                }));
                self.nodes.len() - 1
            }
        };
        self.index.insert(pid, slot);
        self.attach_at_head(slot);
    }

    fn remove(&mut self, pid: &PageId) -> Option<CachedPage> {
        let slot = self.index.remove(pid)?;
        self.detach(slot);
        let node = self.nodes[slot].take().unwrap();
        self.free.push(slot);
        Some(node.page)
    }

    /// PageIds ordered from least- to most-recently-used (tail to head).
    fn tail_to_head(&self) -> Vec<PageId> {
        let mut out = Vec::with_capacity(self.len());
        let mut cur = self.tail;
        while let Some(slot) = cur {
            let node = self.nodes[slot].as_ref().unwrap();
            out.push(node.page_id);
            cur = node.prev;
        }
        out
    }

    fn all_page_ids(&self) -> Vec<PageId> {
        self.index.keys().copied().collect()
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }
}

pub struct BufferPool {
    capacity: usize,
    timeout: Duration,
    lock_manager: LockManager,
    catalog: Arc<Catalog>,
    cache: Mutex<LruCache>,
}

impl BufferPool {
    pub fn new(capacity: usize, catalog: Arc<Catalog>) -> BufferPool {
        BufferPool::with_timeout(capacity, catalog, DEFAULT_LOCK_WAIT_TIMEOUT)
    }

    pub fn with_timeout(capacity: usize, catalog: Arc<Catalog>, timeout: Duration) -> BufferPool {
        assert!(capacity > 0, "buffer pool capacity must be positive");
        BufferPool {
            capacity,
            timeout,
            lock_manager: LockManager::new(),
            catalog,
            cache: Mutex::new(LruCache::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Acquires the requested lock (blocking with a timeout) then returns
    /// the page, loading it from disk on a cache miss. Lock acquisition
    /// runs outside the cache mutex so concurrent waiters on other pages
    /// are not blocked by it (spec §5).
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permission,
    ) -> DbResult<CachedPage> {
        let mode = perm.to_lock_mode();
        let start = Instant::now();
        loop {
            match self.lock_manager.acquire(tid, pid, mode) {
                AcquireResult::Granted => break,
                AcquireResult::Abort => {
                    return Err(DbError::transaction_abort(format!(
                        "illegal lock upgrade for {} on {}",
                        tid, pid
                    )))
                }
                AcquireResult::Denied => {
                    if start.elapsed() > self.timeout {
                        return Err(DbError::transaction_abort(format!(
                            "lock wait timeout for {} on {}",
                            tid, pid
                        )));
                    }
                    std::thread::sleep(LOCK_POLL_INTERVAL);
                }
            }
        }

        let mut cache = self.cache.lock().unwrap();
        if let Some(page) = cache.get(&pid) {
            return Ok(page);
        }

        let heap_file = self.catalog.get_db_file(pid.table_id)?;
        let loaded = heap_file.read_page(pid)?;
        debug!("cache miss, loaded {} from disk", pid);

        if cache.len() > self.capacity {
            self.evict(&mut cache)?;
        }
        let cached: CachedPage = Arc::new(Mutex::new(loaded));
        cache.insert(pid, cached.clone());
        Ok(cached)
    }

    pub fn insert_tuple(&self, tid: TransactionId, table_id: crate::page_id::TableId, t: Tuple) -> DbResult<()> {
        let heap_file = self.catalog.get_db_file(table_id)?;
        let dirtied = heap_file.insert_tuple(tid, self, t)?;
        for (pid, page) in dirtied {
            self.mark_dirty(pid, page, tid)?;
        }
        Ok(())
    }

    pub fn delete_tuple(&self, tid: TransactionId, t: &Tuple) -> DbResult<()> {
        let table_id = t
            .get_record_id()
            .ok_or_else(|| DbError::illegal_argument("tuple has no record id"))?
            .page_id()
            .table_id;
        let heap_file = self.catalog.get_db_file(table_id)?;
        let (pid, page) = heap_file.delete_tuple(tid, self, t)?;
        self.mark_dirty(pid, page, tid)?;
        Ok(())
    }

    /// Marks `page` dirty for `tid`, then ensures it is present in the
    /// cache: "if absent from cache: evict if at capacity, insert at
    /// head; if present: ... move to head" (spec §4.3). Marking dirty and
    /// the presence check happen under the same cache-lock hold, so a
    /// concurrent `evict()` (which also locks the cache first, then the
    /// candidate page) can never observe this page as clean after
    /// `heap_file` has already mutated it but before it is registered as
    /// dirty here — and even if `page` was evicted in the narrow window
    /// between `heap_file`'s mutation and this call, the "absent" branch
    /// below re-inserts the very same (already-mutated) `Arc` rather than
    /// reloading stale bytes from disk, so the mutation is never lost.
    fn mark_dirty(&self, pid: PageId, page: CachedPage, tid: TransactionId) -> DbResult<()> {
        let mut cache = self.cache.lock().unwrap();
        page.lock().unwrap().mark_dirty(true, Some(tid));
        if cache.get(&pid).is_some() {
            return Ok(());
        }
        if cache.len() > self.capacity {
            self.evict(&mut cache)?;
        }
        cache.insert(pid, page);
        Ok(())
    }

    /// Unconditional release, used by the heap file's controlled
    /// early-release scan (spec §4.1).
    pub fn unsafe_release_page(&self, tid: TransactionId, pid: PageId) {
        self.lock_manager.release(tid, pid);
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.is_holding(tid, pid)
    }

    /// Commits (flushing dirty pages) or aborts (rolling dirty pages back
    /// to their on-disk contents) `tid`, then always releases its locks.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> DbResult<()> {
        let result = if commit {
            self.flush_pages(tid)
        } else {
            self.rollback(tid)
        };
        self.lock_manager.release_all(tid);
        result
    }

    pub fn flush_pages(&self, tid: TransactionId) -> DbResult<()> {
        let cache = self.cache.lock().unwrap();
        for pid in cache.all_page_ids() {
            let cached = cache.nodes[*cache.index.get(&pid).unwrap()]
                .as_ref()
                .unwrap()
                .page
                .clone();
            let mut page = cached.lock().unwrap();
            if page.is_dirty() == Some(tid) {
                let heap_file = self.catalog.get_db_file(pid.table_id)?;
                heap_file.write_page(&*page)?;
                page.mark_dirty(false, None);
                debug!("flushed {} for {}", pid, tid);
            }
        }
        Ok(())
    }

    pub fn rollback(&self, tid: TransactionId) -> DbResult<()> {
        let mut cache = self.cache.lock().unwrap();
        let page_ids = cache.all_page_ids();
        for pid in page_ids {
            let cached = cache.get(&pid).unwrap();
            let is_dirty_for_tid = cached.lock().unwrap().is_dirty() == Some(tid);
            if is_dirty_for_tid {
                let heap_file = self.catalog.get_db_file(pid.table_id)?;
                let reloaded = heap_file.read_page(pid)?;
                *cached.lock().unwrap() = reloaded;
                debug!("rolled back {} for {}", pid, tid);
            }
        }
        Ok(())
    }

    pub fn flush_all_pages(&self) -> DbResult<()> {
        let cache = self.cache.lock().unwrap();
        for pid in cache.all_page_ids() {
            self.flush_page_locked(&cache, pid)?;
        }
        Ok(())
    }

    pub fn flush_page(&self, pid: PageId) -> DbResult<()> {
        let cache = self.cache.lock().unwrap();
        self.flush_page_locked(&cache, pid)
    }

    fn flush_page_locked(&self, cache: &LruCache, pid: PageId) -> DbResult<()> {
        let Some(slot) = cache.index.get(&pid) else {
            return Ok(());
        };
        let cached = cache.nodes[*slot].as_ref().unwrap().page.clone();
        let mut page = cached.lock().unwrap();
        if page.is_dirty().is_some() {
            let heap_file = self.catalog.get_db_file(pid.table_id)?;
            heap_file.write_page(&*page)?;
            page.mark_dirty(false, None);
        }
        Ok(())
    }

    pub fn discard_page(&self, pid: PageId) {
        let mut cache = self.cache.lock().unwrap();
        cache.remove(&pid);
    }

    pub fn clear(&self) {
        let mut cache = self.cache.lock().unwrap();
        cache.clear();
    }

    /// Walks the LRU list from the tail, discarding the first clean page
    /// found (NO-STEAL: dirty pages are never evicted, only skipped).
    /// Fails if every cached page is dirty.
    fn evict(&self, cache: &mut LruCache) -> DbResult<()> {
        for pid in cache.tail_to_head() {
            let slot = *cache.index.get(&pid).unwrap();
            let is_dirty = cache.nodes[slot]
                .as_ref()
                .unwrap()
                .page
                .lock()
                .unwrap()
                .is_dirty()
                .is_some();
            if !is_dirty {
                cache.remove(&pid);
                debug!("evicted clean page {}", pid);
                return Ok(());
            }
        }
        Err(DbError::all_pages_dirty(
            "every cached page is dirty; cannot evict",
        ))
    }
}
