//! Page and record identity.

use std::fmt;

/// Identifies a table uniquely within a running process: the deterministic
/// hash of the absolute path of its backing heap file (spec §3/§4.1).
pub type TableId = i64;

#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub struct PageId {
    pub table_id: TableId,
    pub page_number: usize,
}

impl PageId {
    pub fn new(table_id: TableId, page_number: usize) -> PageId {
        PageId {
            table_id,
            page_number,
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "page({}, {})", self.table_id, self.page_number)
    }
}

/// (PageId, slot_number) pair identifying a tuple's storage location.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot_number: usize,
}

impl RecordId {
    pub fn new(page_id: PageId, slot_number: usize) -> RecordId {
        RecordId {
            page_id,
            slot_number,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "record({}, slot {})", self.page_id, self.slot_number)
    }
}
