/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A writable overlay over a read-only state view.

use crate::types::change_set::ChangeSet;

use super::pluggables::{ReadonlyState, StoreError, WritableState};

/// A read-and-writable view of the state on top of some `base` view. The writes applied into a
/// `BranchState` are recorded in a [`ChangeSet`] and never reach `base`.
///
/// # Reads
///
/// [`get`](ReadonlyState::get) first checks whether the key was touched in this branch. A key deleted
/// in this branch reads as `None`, a key inserted in this branch reads as the inserted value, and any
/// other key is read from `base`.
pub struct BranchState<R: ReadonlyState> {
    base: R,
    writes: ChangeSet,
}

impl<R: ReadonlyState> BranchState<R> {
    /// Create a `BranchState` with no writes on top of `base`.
    pub fn new(base: R) -> Self {
        Self {
            base,
            writes: ChangeSet::new(),
        }
    }
}

impl<R: ReadonlyState> ReadonlyState for BranchState<R> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(mutation) => mutation.map(|value| value.to_vec()),
            None => self.base.get(key),
        }
    }
}

impl<R: ReadonlyState> WritableState for BranchState<R> {
    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.writes.insert(key.to_vec(), value.to_vec())
    }

    fn delete(&mut self, key: &[u8]) {
        self.writes.delete(key.to_vec())
    }

    fn change_set(&self) -> Result<ChangeSet, StoreError> {
        Ok(self.writes.clone())
    }
}
