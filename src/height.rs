//! The height of the most recently committed block.
//!
//! ## Lifecycle
//!
//! 1. **Initialized** once, when the [`AppManager`](crate::app_manager::AppManager) is started, from
//!    the store's own last committed height (or [`BlockHeight::GENESIS`] if the store is empty).
//! 2. **Advanced** only by a successful genesis or block delivery, strictly *after* the store has
//!    returned from committing the corresponding change set, and never on a failed one.
//! 3. **Read** by queries, simulations, transaction validation, and block building to pick the state
//!    view they run against.
//!
//! The advance is a `Release` store and reads are `Acquire` loads. Any reader that observes a new
//! height therefore also observes everything the committing thread did before advancing it, including
//! the return of the commit itself.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::data_types::BlockHeight;

pub(crate) struct LastCommittedHeight(AtomicU64);

impl LastCommittedHeight {
    pub(crate) fn new(height: BlockHeight) -> Self {
        Self(AtomicU64::new(height.int()))
    }

    pub(crate) fn load(&self) -> BlockHeight {
        BlockHeight::new(self.0.load(Ordering::Acquire))
    }

    /// Record that the block at `height` has been committed.
    pub(crate) fn advance_to(&self, height: BlockHeight) {
        self.0.store(height.int(), Ordering::Release)
    }
}
