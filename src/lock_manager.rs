//! Per-page multi-granularity lock manager.
//!
//! Single `Mutex`-guarded table, grounded on `concurrent_status.rs`'s
//! `s_lock_map`/`x_lock_map`/`hold_pages` split — collapsed here into one
//! `HashMap<PageId, HashMap<TransactionId, LockMode>>` since spec's lock
//! table is defined that way directly (§3 "PageLock entry").

use std::collections::HashMap;
use std::sync::Mutex;

use log::debug;

use crate::page_id::PageId;
use crate::transaction::TransactionId;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Outcome of a single `acquire` attempt. `Abort` is distinct from `Denied`:
/// a denied request may be retried by the caller's wait loop, but an abort
/// (illegal upgrade) must propagate immediately — retrying it can never
/// succeed.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AcquireResult {
    Granted,
    Denied,
    Abort,
}

#[derive(Default)]
struct LockTable {
    locks: HashMap<PageId, HashMap<TransactionId, LockMode>>,
}

pub struct LockManager {
    table: Mutex<LockTable>,
}

impl LockManager {
    pub fn new() -> LockManager {
        LockManager {
            table: Mutex::new(LockTable::default()),
        }
    }

    /// Single critical section covering the whole lock table (spec §5).
    pub fn acquire(&self, tid: TransactionId, pid: PageId, mode: LockMode) -> AcquireResult {
        let mut table = self.table.lock().unwrap();
        let holders = table.locks.entry(pid).or_default();

        if let Some(&held) = holders.get(&tid) {
            return match (held, mode) {
                (LockMode::Shared, LockMode::Shared) => AcquireResult::Granted,
                (LockMode::Exclusive, _) => AcquireResult::Granted,
                (LockMode::Shared, LockMode::Exclusive) => {
                    if holders.len() == 1 {
                        holders.insert(tid, LockMode::Exclusive);
                        debug!("upgrade granted, tid: {}, pid: {}", tid, pid);
                        AcquireResult::Granted
                    } else {
                        debug!("upgrade would deadlock, tid: {}, pid: {}", tid, pid);
                        AcquireResult::Abort
                    }
                }
            };
        }

        // `tid` does not currently hold anything on `pid`.
        if holders.is_empty() {
            holders.insert(tid, mode);
            debug!("lock granted, tid: {}, pid: {}, mode: {:?}", tid, pid, mode);
            return AcquireResult::Granted;
        }

        let all_shared = holders.values().all(|&m| m == LockMode::Shared);
        if mode == LockMode::Shared && all_shared {
            holders.insert(tid, mode);
            debug!("lock granted (shared), tid: {}, pid: {}", tid, pid);
            return AcquireResult::Granted;
        }

        debug!("lock denied, tid: {}, pid: {}, mode: {:?}", tid, pid, mode);
        AcquireResult::Denied
    }

    pub fn is_holding(&self, tid: TransactionId, pid: PageId) -> bool {
        let table = self.table.lock().unwrap();
        table
            .locks
            .get(&pid)
            .map(|h| h.contains_key(&tid))
            .unwrap_or(false)
    }

    pub fn release(&self, tid: TransactionId, pid: PageId) -> bool {
        let mut table = self.table.lock().unwrap();
        let Some(holders) = table.locks.get_mut(&pid) else {
            return false;
        };
        let removed = holders.remove(&tid).is_some();
        if holders.is_empty() {
            table.locks.remove(&pid);
        }
        if removed {
            debug!("lock released, tid: {}, pid: {}", tid, pid);
        }
        removed
    }

    pub fn release_all(&self, tid: TransactionId) {
        let mut table = self.table.lock().unwrap();
        table.locks.retain(|_, holders| {
            holders.remove(&tid);
            !holders.is_empty()
        });
        debug!("all locks released, tid: {}", tid);
    }
}

impl Default for LockManager {
    fn default() -> Self {
        LockManager::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid() -> PageId {
        PageId::new(1, 0)
    }

    #[test]
    fn shared_locks_coexist() {
        let lm = LockManager::new();
        let t1 = TransactionId::new();
        let t2 = TransactionId::new();
        assert_eq!(lm.acquire(t1, pid(), LockMode::Shared), AcquireResult::Granted);
        assert_eq!(lm.acquire(t2, pid(), LockMode::Shared), AcquireResult::Granted);
    }

    #[test]
    fn exclusive_excludes_others() {
        let lm = LockManager::new();
        let t1 = TransactionId::new();
        let t2 = TransactionId::new();
        assert_eq!(
            lm.acquire(t1, pid(), LockMode::Exclusive),
            AcquireResult::Granted
        );
        assert_eq!(lm.acquire(t2, pid(), LockMode::Shared), AcquireResult::Denied);
        assert_eq!(
            lm.acquire(t2, pid(), LockMode::Exclusive),
            AcquireResult::Denied
        );
    }

    #[test]
    fn idempotent_reacquire() {
        let lm = LockManager::new();
        let t1 = TransactionId::new();
        assert_eq!(lm.acquire(t1, pid(), LockMode::Shared), AcquireResult::Granted);
        assert_eq!(lm.acquire(t1, pid(), LockMode::Shared), AcquireResult::Granted);
    }

    #[test]
    fn sole_holder_upgrades() {
        let lm = LockManager::new();
        let t1 = TransactionId::new();
        assert_eq!(lm.acquire(t1, pid(), LockMode::Shared), AcquireResult::Granted);
        assert_eq!(
            lm.acquire(t1, pid(), LockMode::Exclusive),
            AcquireResult::Granted
        );
        assert!(lm.is_holding(t1, pid()));
    }

    #[test]
    fn shared_upgrade_with_other_holders_aborts() {
        let lm = LockManager::new();
        let t1 = TransactionId::new();
        let t2 = TransactionId::new();
        assert_eq!(lm.acquire(t1, pid(), LockMode::Shared), AcquireResult::Granted);
        assert_eq!(lm.acquire(t2, pid(), LockMode::Shared), AcquireResult::Granted);
        assert_eq!(
            lm.acquire(t1, pid(), LockMode::Exclusive),
            AcquireResult::Abort
        );
    }

    #[test]
    fn release_all_clears_every_page() {
        let lm = LockManager::new();
        let t1 = TransactionId::new();
        let pid2 = PageId::new(1, 1);
        lm.acquire(t1, pid(), LockMode::Exclusive);
        lm.acquire(t1, pid2, LockMode::Shared);
        lm.release_all(t1);
        assert!(!lm.is_holding(t1, pid()));
        assert!(!lm.is_holding(t1, pid2));
    }
}
