/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that exist only to store bytes or numbers, and do not have any major "active" behavior.

use std::fmt::{self, Debug, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};

use super::change_set::ChangeSet;

/// Height of a block in the chain.
///
/// Height 0 is reserved for the state written by [genesis](crate::genesis). Every block delivered
/// afterwards has a height exactly one greater than the block committed before it.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct BlockHeight(u64);

impl BlockHeight {
    /// Height at which genesis state is committed.
    pub const GENESIS: BlockHeight = BlockHeight(0);

    /// Create a new `BlockHeight` with an `int` inner value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` value of this `BlockHeight`.
    pub const fn int(&self) -> u64 {
        self.0
    }

    /// Get the height that directly follows this one.
    pub const fn next(&self) -> BlockHeight {
        BlockHeight(self.0 + 1)
    }

    /// Get the height that directly precedes this one, or `None` for the genesis height.
    pub fn prev(&self) -> Option<BlockHeight> {
        self.0.checked_sub(1).map(BlockHeight)
    }
}

impl Display for BlockHeight {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// 32-byte cryptographic hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, BorshDeserialize, BorshSerialize)]
pub struct CryptoHash([u8; 32]);

impl CryptoHash {
    /// Create a new `CryptoHash` wrapping `bytes`.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the inner `[u8; 32]` value of this `CryptoHash`.
    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl Display for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Debug for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

/// Content-derived fingerprint of committed state, returned by [`Store::commit_state`].
///
/// [`Store::commit_state`]: crate::store::pluggables::Store::commit_state
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, BorshDeserialize, BorshSerialize)]
pub struct StateRoot(CryptoHash);

impl StateRoot {
    /// Create a new `StateRoot` wrapping `hash`.
    pub const fn new(hash: CryptoHash) -> Self {
        Self(hash)
    }

    /// Get the raw bytes of this `StateRoot`.
    pub const fn bytes(&self) -> [u8; 32] {
        self.0.bytes()
    }

    /// Compute the root that results from applying `change_set` on top of state whose root is
    /// `previous`.
    ///
    /// The result is `SHA256(previous || borsh(change_set))`. Because [`ChangeSet`] iterates its
    /// mutations in key order, two change sets that contain the same mutations always chain to the
    /// same root, no matter the order in which the mutations were recorded.
    ///
    /// Stores are free to derive their roots differently (e.g., from a Merkle tree); this function
    /// is provided for stores that do not maintain an authenticated data structure.
    pub fn chain(previous: &StateRoot, change_set: &ChangeSet) -> StateRoot {
        let mut hasher = Sha256::new();
        hasher.update(previous.bytes());
        // Serializing into a Vec never fails.
        hasher.update(change_set.try_to_vec().unwrap_or_default());
        StateRoot(CryptoHash::new(hasher.finalize().into()))
    }
}

impl Display for StateRoot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Debug for StateRoot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

/// Upper bound on the units of gas that a single query, simulation, or transaction validation may
/// consume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, BorshDeserialize, BorshSerialize)]
pub struct GasLimit(u64);

impl GasLimit {
    /// Create a new `GasLimit` with an `int` inner value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` value of this `GasLimit`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}

impl Display for GasLimit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}
