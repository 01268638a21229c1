/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Traits for the pluggable versioned store.

use crate::types::{
    change_set::ChangeSet,
    data_types::{BlockHeight, StateRoot},
};

/// A versioned key-value store that persists change sets and serves point-in-time state views.
///
/// # Heights
///
/// Every successful [`commit_state`](Self::commit_state) creates one new version of the state. The
/// first commit creates the version at [`BlockHeight::GENESIS`], and each following commit creates the
/// version at the next height.
///
/// # Concurrency
///
/// `readonly_state_at` may be called from many threads at once, including while a commit is in
/// flight. The coordinator never has more than one `commit_state` call in flight, so implementations
/// need not support concurrent commits.
///
/// # Visibility
///
/// Once `commit_state` returns `Ok`, every following call to `readonly_state_at` with the committed
/// height must observe the committed change set.
pub trait Store: Send + Sync + 'static {
    type ReadonlyState: ReadonlyState + Send;
    type WritableState: WritableState + Send;

    /// Open a fresh, writable view in which executing the block at `height` will see all state committed
    /// at or before `height - 1` (or empty state, if `height` is the genesis height).
    ///
    /// Implementations should fail if `height` is not the next height to be committed.
    fn new_state_at(&self, height: BlockHeight) -> Result<Self::WritableState, StoreError>;

    /// Open a read-only view of the state as it was right after the block at `height` was committed.
    ///
    /// Fails if `height` was never committed.
    fn readonly_state_at(&self, height: BlockHeight) -> Result<Self::ReadonlyState, StoreError>;

    /// Durably and atomically apply `change_set` as the next version, returning its root.
    ///
    /// Either every mutation in `change_set` is applied and a root is returned, or none are applied
    /// and an error is returned.
    fn commit_state(&self, change_set: &ChangeSet) -> Result<StateRoot, StoreError>;

    /// Get the height of the most recent version, or `None` if nothing has ever been committed.
    fn last_committed_height(&self) -> Result<Option<BlockHeight>, StoreError>;
}

/// Read access into a state view.
pub trait ReadonlyState {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    fn contains(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }
}

/// Read and write access into a state view. Writes are visible to later reads on the same view, but
/// never reach the store until the view's [`change_set`](Self::change_set) is committed.
pub trait WritableState: ReadonlyState {
    fn set(&mut self, key: &[u8], value: &[u8]);

    fn delete(&mut self, key: &[u8]);

    /// Get every write made into this view so far.
    fn change_set(&self) -> Result<ChangeSet, StoreError>;
}

/// The different ways a [`Store`] can fail.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No version was ever committed at `height`.
    #[error("no state was committed at height {height}")]
    UnknownHeight { height: BlockHeight },

    /// A new state was requested at a height that is not the next height to be committed.
    #[error("cannot open a new state at height {requested}, expected height {expected}")]
    InvalidAnchor {
        requested: BlockHeight,
        expected: BlockHeight,
    },

    /// The store cannot be reached right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other failure inside the store implementation.
    #[error("store backend error: {0}")]
    Backend(String),
}
