//! Transaction identity.
//!
//! An opaque, unique, value-equality token. Monotonic atomic counter rather
//! than the small `rand::gen_range(1, 100)` pool earlier revisions of this
//! codebase used for ids — a counter can't collide, which matters once the
//! lock manager and buffer pool key maps off this value.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Eq, Hash, PartialEq, Clone, Copy)]
pub struct TransactionId {
    id: u64,
}

impl TransactionId {
    pub fn new() -> TransactionId {
        TransactionId {
            id: NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        TransactionId::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "tx_{}", self.id)
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
