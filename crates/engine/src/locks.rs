//! Per-account exclusive update scopes.
//!
//! Every mutating operation holds the lock of each account it touches for the
//! whole atomic unit, so concurrent writers on one account are serialized
//! while unrelated accounts proceed in parallel.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, PoisonError, Weak},
};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Number of slots above which dead entries are pruned on insert.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Default)]
pub(crate) struct AccountLocks {
    slots: StdMutex<HashMap<i64, Weak<Mutex<()>>>>,
}

/// Held locks; released on drop.
#[derive(Debug)]
pub(crate) struct AccountGuards {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl AccountLocks {
    fn slot(&self, account_id: i64) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get(&account_id).and_then(Weak::upgrade) {
            return slot;
        }
        if slots.len() >= PRUNE_THRESHOLD {
            slots.retain(|_, slot| slot.strong_count() > 0);
        }
        let slot = Arc::new(Mutex::new(()));
        slots.insert(account_id, Arc::downgrade(&slot));
        slot
    }

    /// Locks every account in `account_ids`.
    ///
    /// Ids are taken in ascending order, duplicates once, so two transfers over
    /// the same pair of accounts can never wait on each other in a cycle.
    pub(crate) async fn acquire(&self, account_ids: &[i64]) -> AccountGuards {
        let mut ids = account_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.slot(id).lock_owned().await);
        }
        AccountGuards { _guards: guards }
    }

    #[cfg(test)]
    fn live_slots(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.strong_count() > 0).count()
    }
}
