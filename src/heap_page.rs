//! Heap page: a fixed-size page with a header occupancy bitmap followed by
//! fixed-width tuple slots. Grounded on the slot/header bitmap math of the
//! legacy `table.rs`/`page.rs` pair (`BitVec`-backed header, row-count
//! derived from page size and tuple width), generalized to a concrete
//! `Page` capability with insert/delete/dirty-tracking.

use bit_vec::BitVec;

use crate::error::{DbError, DbResult};
use crate::page_id::{PageId, RecordId};
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};
use crate::types::page_size;

/// Capability shared by every page variant cached by the buffer pool. Only
/// `HeapPage` exists in this crate, but operators are written against this
/// trait so a future page variant (e.g. an index page) could be added
/// without touching the buffer pool.
pub trait Page {
    fn id(&self) -> PageId;
    /// Serializes this page to exactly `page_size()` bytes.
    fn page_data(&self) -> Vec<u8>;
    fn is_dirty(&self) -> Option<TransactionId>;
    fn mark_dirty(&mut self, dirty: bool, tid: Option<TransactionId>);
}

/// How many tuple slots fit in one page of `desc`-shaped tuples, including
/// the header bitmap: `page_size*8 = slot_count*(tuple_size*8 + 1)`.
pub fn slots_per_page(desc: &TupleDesc) -> usize {
    let tuple_bits = desc.tuple_size() * 8;
    (page_size() * 8) / (tuple_bits + 1)
}

/// Header bitmap size in bytes for `desc`-shaped tuples.
pub fn header_size(desc: &TupleDesc) -> usize {
    (slots_per_page(desc) + 7) / 8
}

pub struct HeapPage {
    id: PageId,
    desc: TupleDesc,
    header: BitVec,
    slots: Vec<Option<Tuple>>,
    dirty: Option<TransactionId>,
}

impl HeapPage {
    /// Parses a page from exactly `page_size()` raw bytes, as produced by
    /// `HeapFile::read_page`.
    pub fn new(id: PageId, desc: TupleDesc, bytes: &[u8]) -> DbResult<HeapPage> {
        if bytes.len() != page_size() {
            let preview_len = bytes.len().min(16);
            return Err(DbError::invalid_page(format!(
                "page data must be {} bytes, got {} (starts: {})",
                page_size(),
                bytes.len(),
                hex::encode(&bytes[..preview_len])
            )));
        }

        let num_slots = slots_per_page(&desc);
        let hsize = header_size(&desc);
        let header = BitVec::from_bytes(&bytes[..hsize]);

        let tuple_size = desc.tuple_size();
        let mut slots: Vec<Option<Tuple>> = Vec::with_capacity(num_slots);
        let mut offset = hsize;
        for slot in 0..num_slots {
            let slot_bytes = &bytes[offset..offset + tuple_size];
            if header.get(slot).unwrap_or(false) {
                let mut tuple = Tuple::deserialize(&desc, slot_bytes);
                tuple.set_record_id(RecordId::new(id, slot));
                slots.push(Some(tuple));
            } else {
                slots.push(None);
            }
            offset += tuple_size;
        }

        Ok(HeapPage {
            id,
            desc,
            header,
            slots,
            dirty: None,
        })
    }

    /// Produces a `page_size()`-byte buffer representing an all-empty page
    /// of this shape (external heap-file format contract, spec §6).
    pub fn create_empty_page_data() -> Vec<u8> {
        vec![0u8; page_size()]
    }

    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn num_empty_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    fn is_slot_used(&self, slot: usize) -> bool {
        self.slots[slot].is_some()
    }

    /// Inserts `tuple` into the first empty slot, assigning it a `RecordId`.
    /// Fails if the page has no empty slot or the tuple's schema doesn't
    /// match this page's.
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> DbResult<()> {
        if tuple.tuple_desc() != &self.desc {
            return Err(DbError::illegal_argument("tuple schema mismatch"));
        }
        for i in 0..self.desc.num_fields() {
            tuple.get_field(i).validate()?;
        }
        let slot = (0..self.slots.len())
            .find(|&s| !self.is_slot_used(s))
            .ok_or_else(|| DbError::invalid_page("no empty slots on page"))?;

        tuple.set_record_id(RecordId::new(self.id, slot));
        self.header.set(slot, true);
        self.slots[slot] = Some(tuple);
        Ok(())
    }

    /// Removes the tuple identified by `tuple.get_record_id()` from its
    /// slot.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> DbResult<()> {
        let rid = tuple
            .get_record_id()
            .ok_or_else(|| DbError::illegal_argument("tuple has no record id"))?;
        if rid.page_id != self.id {
            return Err(DbError::illegal_argument(
                "tuple does not belong to this page",
            ));
        }
        if !self.is_slot_used(rid.slot_number) {
            return Err(DbError::illegal_argument("slot is already empty"));
        }
        self.header.set(rid.slot_number, false);
        self.slots[rid.slot_number] = None;
        Ok(())
    }

    /// Iterates over the tuples currently occupying this page, in slot
    /// order.
    pub fn iter_tuples(&self) -> impl Iterator<Item = &Tuple> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }
}

impl Page for HeapPage {
    fn id(&self) -> PageId {
        self.id
    }

    fn page_data(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(page_size());
        buf.extend(self.header.to_bytes());
        let tuple_size = self.desc.tuple_size();
        for slot in &self.slots {
            match slot {
                Some(t) => buf.extend(t.serialize()),
                None => buf.extend(vec![0u8; tuple_size]),
            }
        }
        buf.resize(page_size(), 0);
        buf
    }

    fn is_dirty(&self) -> Option<TransactionId> {
        self.dirty
    }

    fn mark_dirty(&mut self, dirty: bool, tid: Option<TransactionId>) {
        self.dirty = if dirty { tid } else { None };
    }
}
