/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Single-slot cache of the most recent optimistic (speculative) block execution.
//!
//! When this replica [builds](crate::app_manager::AppManager::build_block) a block, it executes the
//! block's transactions right away and stores the result here. If the block that consensus then
//! [delivers](crate::app_manager::AppManager::deliver_block) is exactly the block that was built, the
//! cached change set is committed directly instead of executing the same transactions a second time.
//!
//! ## When a cached block may be reused
//!
//! A [`CachedBlock`] is reused for a [`BlockRequest`] only if **both**:
//! 1. It was built for the same height as the request, and
//! 2. Its transactions are byte-for-byte equal to the request's transactions, in the same order, with
//!    none missing and none extra.
//!
//! There is no partial reuse. A single differing transaction disqualifies the whole cached block.
//!
//! ## Consumption
//!
//! The slot is emptied by every delivery, whether or not the cached block was reused, with a single
//! [`take`](OptimisticCache::take). This way a cached block can never be reused for any delivery other
//! than the one that immediately follows the build that produced it, and a concurrent build can never
//! interleave between reading the slot and clearing it.

use std::sync::{Mutex, MutexGuard};

use crate::types::{
    block::{BlockRequest, BlockResponse},
    change_set::ChangeSet,
    data_types::BlockHeight,
    transaction::Transaction,
};

/// The result of speculatively executing a built block.
#[derive(Clone, Debug)]
pub(crate) struct CachedBlock<T: Transaction> {
    pub(crate) height: BlockHeight,
    pub(crate) txs: Vec<T>,
    pub(crate) change_set: ChangeSet,
    pub(crate) response: BlockResponse,
}

impl<T: Transaction> CachedBlock<T> {
    /// Check whether this cached block can stand in for executing `block`.
    pub(crate) fn matches(&self, block: &BlockRequest) -> bool {
        self.height == block.height
            && self.txs.len() == block.txs.len()
            && self
                .txs
                .iter()
                .zip(block.txs.iter())
                .all(|(cached, requested)| cached.bytes_eq(requested))
    }
}

/// Holds at most one [`CachedBlock`].
pub(crate) struct OptimisticCache<T: Transaction> {
    slot: Mutex<Option<CachedBlock<T>>>,
}

impl<T: Transaction> OptimisticCache<T> {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Store `cached_block`, replacing whatever was in the slot.
    pub(crate) fn put(&self, cached_block: CachedBlock<T>) {
        *self.lock() = Some(cached_block);
    }

    /// Empty the slot, returning what was in it.
    pub(crate) fn take(&self) -> Option<CachedBlock<T>> {
        self.lock().take()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    // The slot only ever holds a complete entry, so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Option<CachedBlock<T>>> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
