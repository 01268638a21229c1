//! Ordered collection of key-value mutations produced by executing transactions against a
//! [writable state view](crate::store::pluggables::WritableState).

use std::collections::{btree_map, BTreeMap};

use borsh::{BorshDeserialize, BorshSerialize};

/// Set of key-value mutations that are committed atomically when the block that produced them is
/// committed.
///
/// # Ordering
///
/// Mutations are kept sorted by key. Iteration order, the Borsh encoding, and therefore
/// [`StateRoot::chain`](super::data_types::StateRoot::chain) depend only on the final mutation of
/// each key, not on the order in which mutations were recorded.
///
/// # Uniqueness of keys between inserts and deletes
///
/// Each key holds at most one mutation: a later [`insert`](Self::insert) cancels an earlier
/// [`delete`](Self::delete) of the same key and vice versa.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ChangeSet {
    // `Some(value)` is an insert, `None` is a delete.
    mutations: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl ChangeSet {
    /// Create a new, empty `ChangeSet`.
    pub fn new() -> Self {
        Self {
            mutations: BTreeMap::new(),
        }
    }

    /// Schedule the insertion of a `key`-`value` pair.
    ///
    /// This cancels the deletion of `key`, if it has been scheduled using [`delete`](Self::delete).
    pub fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.mutations.insert(key, Some(value));
    }

    /// Schedule the deletion of `key`.
    ///
    /// This cancels the insertion of `key`, if it has been scheduled using [`insert`](Self::insert).
    pub fn delete(&mut self, key: Vec<u8>) {
        self.mutations.insert(key, None);
    }

    /// Get the mutation scheduled for `key`, if any.
    ///
    /// Returns `Some(Some(value))` for an insert, `Some(None)` for a delete, and `None` if this
    /// `ChangeSet` does not touch `key`.
    pub fn get(&self, key: &[u8]) -> Option<Option<&[u8]>> {
        self.mutations
            .get(key)
            .map(|mutation| mutation.as_deref())
    }

    /// Get whether the `ChangeSet` is scheduled to insert a value to `key`, and if so, returns a
    /// reference to that value.
    pub fn get_insert(&self, key: &[u8]) -> Option<&[u8]> {
        self.get(key).flatten()
    }

    /// Check whether the `ChangeSet` is scheduled to delete `key`.
    pub fn contains_delete(&self, key: &[u8]) -> bool {
        matches!(self.get(key), Some(None))
    }

    /// Iterate through every mutation in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, Vec<u8>, Option<Vec<u8>>> {
        self.mutations.iter()
    }

    /// Number of keys touched by this `ChangeSet`.
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}
