//! Heap file: a paged, unordered tuple container backed by a single
//! byte-addressable file. Grounded on the legacy `table.rs`'s
//! `HeapTable`/`read_page` (seek-and-read-exactly-`PAGE_SIZE`), generalized
//! with `write_page`, tuple insertion/deletion, and a buffer-pool-mediated
//! scan, per spec §4.1.

use std::collections::hash_map::DefaultHasher;
use std::fs::{File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::debug;

use crate::buffer_pool::{BufferPool, Permission};
use crate::error::{DbError, DbResult};
use crate::heap_page::{HeapPage, Page};
use crate::page_id::{PageId, TableId};
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};
use crate::types::page_size;

fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Deterministic hash of an absolute path, used as a table id. Stable
/// across restarts for a given path and a given Rust toolchain (spec
/// §4.1: "stable across restarts to within the hash function's
/// determinism").
pub fn table_id_of_path(path: &Path) -> TableId {
    let mut hasher = DefaultHasher::new();
    absolute_path(path).hash(&mut hasher);
    hasher.finish() as i64
}

pub struct HeapFile {
    path: PathBuf,
    table_id: TableId,
    desc: TupleDesc,
    file: Mutex<File>,
}

impl HeapFile {
    /// Opens (creating if absent) the backing file at `path`.
    pub fn new(path: impl AsRef<Path>, desc: TupleDesc) -> DbResult<HeapFile> {
        let path = path.as_ref().to_path_buf();
        let table_id = table_id_of_path(&path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        Ok(HeapFile {
            path,
            table_id,
            desc,
            file: Mutex::new(file),
        })
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn num_pages(&self) -> DbResult<usize> {
        let file = self.file.lock().unwrap();
        let len = file.metadata()?.len() as usize;
        Ok((len + page_size() - 1) / page_size())
    }

    /// Reads page `pid.page_number`, requiring it to lie within the current
    /// file bounds.
    pub fn read_page(&self, pid: PageId) -> DbResult<HeapPage> {
        let mut file = self.file.lock().unwrap();
        let len = file.metadata()?.len() as usize;
        let offset = pid.page_number * page_size();
        if offset + page_size() > len {
            return Err(DbError::invalid_page(format!(
                "page {} out of bounds (file has {} bytes)",
                pid, len
            )));
        }
        file.seek(SeekFrom::Start(offset as u64))?;
        let mut buf = vec![0u8; page_size()];
        file.read_exact(&mut buf)?;
        debug!("read page {} from {:?}", pid, self.path);
        HeapPage::new(pid, self.desc.clone(), &buf)
    }

    /// Writes `page`'s current bytes to its slot in the file.
    pub fn write_page(&self, page: &dyn Page) -> DbResult<()> {
        let pid = page.id();
        let bytes = page.page_data();
        debug_assert_eq!(bytes.len(), page_size());
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start((pid.page_number * page_size()) as u64))?;
        file.write_all(&bytes)?;
        file.flush()?;
        debug!("wrote page {} to {:?}", pid, self.path);
        Ok(())
    }

    /// Appends one empty page's worth of bytes, returning its `PageId`.
    fn append_empty_page(&self) -> DbResult<PageId> {
        let mut file = self.file.lock().unwrap();
        let len = file.metadata()?.len();
        let page_number = (len as usize) / page_size();
        file.seek(SeekFrom::End(0))?;
        file.write_all(&HeapPage::create_empty_page_data())?;
        file.flush()?;
        debug!("extended {:?} with empty page {}", self.path, page_number);
        Ok(PageId::new(self.table_id, page_number))
    }

    /// Scans pages for an empty slot, releasing locks on full pages as it
    /// goes (spec's one sanctioned early-release path), extending the file
    /// if none is found. Returns the single dirtied page id together with
    /// the exact in-memory page it was mutated on, so the buffer pool can
    /// mark it dirty and, if a concurrent eviction raced it out of the
    /// cache in the meantime, re-insert that same mutated instance instead
    /// of reloading stale bytes from disk.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        buffer_pool: &BufferPool,
        tuple: Tuple,
    ) -> DbResult<Vec<(PageId, Arc<Mutex<HeapPage>>)>> {
        let num_pages = self.num_pages()?;
        for page_number in 0..num_pages {
            let pid = PageId::new(self.table_id, page_number);
            let page_lock = buffer_pool.get_page(tid, pid, Permission::ReadWrite)?;
            let has_room = {
                let page = page_lock.lock().unwrap();
                page.num_empty_slots() > 0
            };
            if !has_room {
                buffer_pool.unsafe_release_page(tid, pid);
                continue;
            }
            let mut page = page_lock.lock().unwrap();
            page.insert_tuple(tuple)?;
            drop(page);
            return Ok(vec![(pid, page_lock)]);
        }

        let new_pid = self.append_empty_page()?;
        let page_lock = buffer_pool.get_page(tid, new_pid, Permission::ReadWrite)?;
        let mut page = page_lock.lock().unwrap();
        page.insert_tuple(tuple)?;
        drop(page);
        Ok(vec![(new_pid, page_lock)])
    }

    /// Removes `tuple` from the page holding its `RecordId`, returning the
    /// page id together with the exact in-memory page it was mutated on
    /// (see `insert_tuple` above for why).
    pub fn delete_tuple(
        &self,
        tid: TransactionId,
        buffer_pool: &BufferPool,
        tuple: &Tuple,
    ) -> DbResult<(PageId, Arc<Mutex<HeapPage>>)> {
        let rid = tuple
            .get_record_id()
            .ok_or_else(|| DbError::illegal_argument("tuple has no record id"))?;
        let pid = rid.page_id();
        let page_lock = buffer_pool.get_page(tid, pid, Permission::ReadWrite)?;
        let mut page = page_lock.lock().unwrap();
        page.delete_tuple(tuple)?;
        drop(page);
        Ok((pid, page_lock))
    }

    /// A forward, single-pass tuple iterator cooperating with `buffer_pool`
    /// for page acquisition.
    pub fn iterator<'a>(
        &'a self,
        tid: TransactionId,
        buffer_pool: &'a BufferPool,
    ) -> HeapFileIterator<'a> {
        HeapFileIterator::new(self, tid, buffer_pool)
    }
}

pub struct HeapFileIterator<'a> {
    file: &'a HeapFile,
    tid: TransactionId,
    buffer_pool: &'a BufferPool,
    num_pages: usize,
    next_page: usize,
    buffer: std::vec::IntoIter<Tuple>,
    opened: bool,
}

impl<'a> HeapFileIterator<'a> {
    fn new(file: &'a HeapFile, tid: TransactionId, buffer_pool: &'a BufferPool) -> Self {
        HeapFileIterator {
            file,
            tid,
            buffer_pool,
            num_pages: 0,
            next_page: 0,
            buffer: Vec::new().into_iter(),
            opened: false,
        }
    }

    pub fn open(&mut self) -> DbResult<()> {
        self.num_pages = self.file.num_pages()?;
        self.next_page = 0;
        self.buffer = Vec::new().into_iter();
        self.opened = true;
        Ok(())
    }

    pub fn rewind(&mut self) -> DbResult<()> {
        self.open()
    }

    fn load_next_page(&mut self) -> DbResult<bool> {
        while self.next_page < self.num_pages {
            let pid = PageId::new(self.file.table_id(), self.next_page);
            self.next_page += 1;
            let page_lock = self
                .buffer_pool
                .get_page(self.tid, pid, Permission::ReadOnly)?;
            let tuples: Vec<Tuple> = {
                let page = page_lock.lock().unwrap();
                page.iter_tuples().cloned().collect()
            };
            if !tuples.is_empty() {
                self.buffer = tuples.into_iter();
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn has_next(&mut self) -> DbResult<bool> {
        if !self.opened {
            return Err(DbError::iterator_not_open("heap file iterator not open"));
        }
        loop {
            if self.buffer.as_slice().first().is_some() {
                return Ok(true);
            }
            if !self.load_next_page()? {
                return Ok(false);
            }
        }
    }

    pub fn next(&mut self) -> DbResult<Tuple> {
        if !self.has_next()? {
            return Err(DbError::no_such_element("heap file iterator exhausted"));
        }
        Ok(self.buffer.next().unwrap())
    }

    pub fn close(&mut self) {
        self.opened = false;
    }
}
