//! Process-wide configuration cells.
//!
//! `PAGE_SIZE` is a process constant in production use but must be
//! test-mutable (spec requirement: heap-file/histogram tests exercise more
//! than one page size within the same test binary), so it lives behind an
//! `AtomicUsize` rather than a plain `const`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const DEFAULT_PAGE_SIZE: usize = 4096;

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// Returns the current page size in bytes.
pub fn page_size() -> usize {
    PAGE_SIZE.load(Ordering::SeqCst)
}

/// Test-only mutator. Changing this mid-test-suite-run only affects heap
/// files/pages constructed afterward; existing on-disk files written at a
/// different page size will not parse correctly if mixed.
pub fn set_page_size_for_test(size: usize) {
    PAGE_SIZE.store(size, Ordering::SeqCst);
}

pub fn reset_page_size_for_test() {
    PAGE_SIZE.store(DEFAULT_PAGE_SIZE, Ordering::SeqCst);
}

/// Default time a transaction will wait for a page lock before the buffer
/// pool gives up and raises `TransactionAbort`.
pub const DEFAULT_LOCK_WAIT_TIMEOUT: Duration = Duration::from_millis(2000);

/// How often `get_page`'s retry loop sleeps between lock attempts.
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(5);
