//! A simple, volatile, in-memory implementation of [`Store`].

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use app_manager::{
    store::{
        branch::BranchState,
        pluggables::{ReadonlyState, Store, StoreError, WritableState},
    },
    types::{
        change_set::ChangeSet,
        data_types::{BlockHeight, StateRoot},
    },
};

type Snapshot = Arc<BTreeMap<Vec<u8>, Vec<u8>>>;

/// An in-memory implementation of [`Store`] that keeps a full copy of the state at every committed
/// height.
///
/// Clones share the same underlying versions, so a test can keep a clone to inspect the store after
/// moving the original into an `AppManager`.
///
/// ## Fault injection
///
/// [`fail_next_anchor`](MemStore::fail_next_anchor) and [`fail_next_commit`](MemStore::fail_next_commit)
/// make the next call to `new_state_at` or `commit_state` (respectively) fail without side effects.
/// [`fail_next_change_set`](MemStore::fail_next_change_set) makes the next state opened with
/// `new_state_at` fail to produce its change set.
#[derive(Clone)]
pub(crate) struct MemStore(Arc<Mutex<MemStoreInner>>);

struct MemStoreInner {
    // `versions[h]` is the state right after the block at height `h` was committed.
    versions: Vec<(Snapshot, StateRoot)>,
    fail_next_anchor: bool,
    fail_next_commit: bool,
    fail_next_change_set: bool,
    commits: usize,
}

impl MemStore {
    /// Create a new, empty `MemStore`.
    pub(crate) fn new() -> MemStore {
        MemStore(Arc::new(Mutex::new(MemStoreInner {
            versions: Vec::new(),
            fail_next_anchor: false,
            fail_next_commit: false,
            fail_next_change_set: false,
            commits: 0,
        })))
    }

    pub(crate) fn fail_next_anchor(&self) {
        self.lock().fail_next_anchor = true;
    }

    pub(crate) fn fail_next_commit(&self) {
        self.lock().fail_next_commit = true;
    }

    pub(crate) fn fail_next_change_set(&self) {
        self.lock().fail_next_change_set = true;
    }

    /// Number of successful commits so far.
    pub(crate) fn commits(&self) -> usize {
        self.lock().commits
    }

    /// Get the value of `key` in the state at the latest committed height.
    pub(crate) fn committed(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.lock()
            .versions
            .last()
            .and_then(|(snapshot, _)| snapshot.get(key).cloned())
    }

    /// Get the root of the state at `height`.
    pub(crate) fn root_at(&self, height: BlockHeight) -> Option<StateRoot> {
        self.lock()
            .versions
            .get(height.int() as usize)
            .map(|(_, root)| *root)
    }

    fn lock(&self) -> MutexGuard<'_, MemStoreInner> {
        self.0.lock().unwrap()
    }
}

impl MemStoreInner {
    fn next_height(&self) -> BlockHeight {
        BlockHeight::new(self.versions.len() as u64)
    }

    fn latest(&self) -> (Snapshot, StateRoot) {
        self.versions
            .last()
            .cloned()
            .unwrap_or_else(|| (Arc::new(BTreeMap::new()), StateRoot::default()))
    }
}

impl Store for MemStore {
    type ReadonlyState = MemSnapshot;
    type WritableState = MemState;

    fn new_state_at(&self, height: BlockHeight) -> Result<Self::WritableState, StoreError> {
        let mut inner = self.lock();
        if inner.fail_next_anchor {
            inner.fail_next_anchor = false;
            return Err(StoreError::Unavailable(String::from("injected anchor fault")));
        }

        let expected = inner.next_height();
        if height != expected {
            return Err(StoreError::InvalidAnchor {
                requested: height,
                expected,
            });
        }

        let fail_change_set = inner.fail_next_change_set;
        inner.fail_next_change_set = false;
        Ok(MemState {
            branch: BranchState::new(MemSnapshot(inner.latest().0)),
            fail_change_set,
        })
    }

    fn readonly_state_at(&self, height: BlockHeight) -> Result<Self::ReadonlyState, StoreError> {
        self.lock()
            .versions
            .get(height.int() as usize)
            .map(|(snapshot, _)| MemSnapshot(snapshot.clone()))
            .ok_or(StoreError::UnknownHeight { height })
    }

    fn commit_state(&self, change_set: &ChangeSet) -> Result<StateRoot, StoreError> {
        let mut inner = self.lock();
        if inner.fail_next_commit {
            inner.fail_next_commit = false;
            return Err(StoreError::Backend(String::from("injected commit fault")));
        }

        let (previous, previous_root) = inner.latest();
        let mut next = (*previous).clone();
        for (key, mutation) in change_set.iter() {
            match mutation {
                Some(value) => next.insert(key.clone(), value.clone()),
                None => next.remove(key),
            };
        }

        let root = StateRoot::chain(&previous_root, change_set);
        inner.versions.push((Arc::new(next), root));
        inner.commits += 1;
        Ok(root)
    }

    fn last_committed_height(&self) -> Result<Option<BlockHeight>, StoreError> {
        Ok(self.lock().next_height().prev())
    }
}

/// An immutable view of the state at one committed height.
pub(crate) struct MemSnapshot(Snapshot);

impl ReadonlyState for MemSnapshot {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.0.get(key).cloned()
    }
}

/// The writable view returned by [`MemStore::new_state_at`]: a [`BranchState`] over the latest
/// committed snapshot that can be made to fail when its change set is requested.
pub(crate) struct MemState {
    branch: BranchState<MemSnapshot>,
    fail_change_set: bool,
}

impl ReadonlyState for MemState {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.branch.get(key)
    }
}

impl WritableState for MemState {
    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.branch.set(key, value)
    }

    fn delete(&mut self, key: &[u8]) {
        self.branch.delete(key)
    }

    fn change_set(&self) -> Result<ChangeSet, StoreError> {
        if self.fail_change_set {
            return Err(StoreError::Backend(String::from("injected change set fault")));
        }
        self.branch.change_set()
    }
}
